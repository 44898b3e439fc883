// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The hooks and compile-time configuration implemented by all platforms.

pub mod virt;

use crate::{
    console::UartDriver,
    coordinator::ResetLine,
    gpio::BankTable,
    memmap::{IoRegion, PhysAddr},
};

/// Compile-time configuration and hardware bindings of a platform.
pub trait Platform {
    /// The number of CPU cores.
    const CORE_COUNT: usize;

    /// Identifier of the UART used for the early trace console. 0 disables
    /// the early console.
    const EARLY_CONSOLE_UART: usize;

    /// Fixed physical UART base addresses indexed by UART identifier.
    /// Entry 0 is unused; a zero entry means the identifier is not wired.
    const UART_BASES: &'static [PhysAddr];

    /// SGI number used to ask peer cores to halt ahead of a system reset.
    const HALT_CORES_SGI: u32;

    /// Reset line wired to whole-system reset.
    const SYSTEM_RESET_LINE: ResetLine;

    /// Physical I/O regions to declare to the memory mapper before any
    /// driver dereferences a device address.
    const IO_REGIONS: &'static [IoRegion];

    /// Platform name for the boot banner.
    const NAME: &'static str;

    /// Build flavor for the boot banner.
    const FLAVOR: &'static str;

    /// UART hardware driver binding.
    type Uart: UartDriver;

    /// Bank layout of the platform's GPIO device family, built once from
    /// firmware constants.
    fn gpio_banks() -> &'static BankTable;

    /// Busy-waits at least `us` microseconds. This core has no scheduler;
    /// waiting never yields.
    fn udelay(us: u32);
}

/// Chip type of a platform's UART driver.
pub type UartChip<P> = <<P as Platform>::Uart as UartDriver>::Chip;
