// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Secure bring-up core: the dependency-ordered hardware initialisation of a
//! trusted execution environment.
//!
//! The crate owns the boot-time state machine of the secure world: the
//! early-to-device-tree console handover, interrupt controller bring-up on
//! every core, the multi-core system reset sequence, the device probe policy
//! for non-secure callers, and GPIO flat-pin resolution. Hardware drivers
//! and the device-tree parser are collaborators behind traits; a platform
//! binds them through [`platform::Platform`].

#![cfg_attr(not(test), no_std)]

pub mod abort;
pub mod bringup;
pub mod console;
pub mod coordinator;
mod debug;
pub mod dt;
pub mod error;
pub mod gate;
pub mod gpio;
pub mod logger;
pub mod memmap;
pub mod pl011;
pub mod platform;

pub use error::{Error, Result};
