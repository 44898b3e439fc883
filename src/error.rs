// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The crate-wide error taxonomy.

use core::fmt::{self, Display, Formatter};

/// Error type shared by the platform bring-up components.
///
/// The taxonomy is deliberately small: configuration problems are recoverable
/// and reported to the immediate caller, absence of an optional item is its
/// own variant so callers can treat it as a valid terminal outcome, and
/// internal-consistency violations are [`Error::Fatal`] values from which no
/// safe continuation exists.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The requested item does not exist.
    ///
    /// At designated lookup sites (console node in a device tree, clock
    /// property of a console node) this is not a failure; callers there must
    /// distinguish it from every other variant.
    NotFound,
    /// Malformed configuration: a bad device-tree node or an out-of-range
    /// request. Recovered locally, never crashes the process.
    Misconfigured,
    /// An invariant that can only break through a corrupted static table or
    /// non-functional hardware. Callers on hardware paths turn this into a
    /// panic; tests assert on the variant instead.
    Fatal(&'static str),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "item not found"),
            Self::Misconfigured => write!(f, "misconfigured"),
            Self::Fatal(reason) => write!(f, "fatal: {}", reason),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
