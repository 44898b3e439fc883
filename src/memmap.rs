// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Address range registry: physical I/O regions that must be mapped, tagged
//! secure or non-secure, before any driver touches them.
//!
//! The list itself is static platform configuration; the only logic is a
//! one-time validity check before the regions are handed to the
//! memory-mapping collaborator.

use crate::{Error, Result, platform::Platform};
use aarch64_paging::paging::MemoryRegion;
use log::trace;

/// A physical address.
pub type PhysAddr = usize;

/// Page size the mapping collaborator works in.
pub const GRANULE_SIZE: usize = 4096;

/// Security attribute of a declared I/O region. Static for the lifetime of
/// the mapping, not runtime-selectable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Security {
    /// Mapped into the secure address space.
    Secure,
    /// Mapped into the non-secure address space.
    NonSecure,
}

/// One peripheral aperture to declare to the memory mapper.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IoRegion {
    /// Physical base address.
    pub base: PhysAddr,
    /// Size in bytes.
    pub size: usize,
    /// Security state of the mapping.
    pub security: Security,
}

impl IoRegion {
    /// Declares a secure I/O region.
    pub const fn secure(base: PhysAddr, size: usize) -> Self {
        Self {
            base,
            size,
            security: Security::Secure,
        }
    }

    /// Declares a non-secure I/O region.
    pub const fn non_secure(base: PhysAddr, size: usize) -> Self {
        Self {
            base,
            size,
            security: Security::NonSecure,
        }
    }

    /// The region as a physical memory range.
    pub fn region(&self) -> MemoryRegion {
        MemoryRegion::new(self.base, self.base + self.size)
    }
}

/// The memory-mapping collaborator: resolves and installs device mappings
/// for the declared physical ranges.
pub trait IoMapper {
    /// Maps the given physical range as device memory with the given
    /// security attribute.
    fn map_io(&mut self, region: &MemoryRegion, security: Security) -> Result<()>;
}

/// Feeds the platform's I/O region declarations to the mapper.
///
/// Called once during primary boot, before any driver dereferences a device
/// address. A malformed declaration table is a build defect, reported as
/// [`Error::Fatal`].
pub fn declare_io_regions<P: Platform>(mapper: &mut dyn IoMapper) -> Result<()> {
    validate(P::IO_REGIONS)?;
    for io in P::IO_REGIONS {
        trace!(
            "I/O region {:#x}..{:#x} {:?}",
            io.base,
            io.base + io.size,
            io.security
        );
        mapper.map_io(&io.region(), io.security)?;
    }
    Ok(())
}

fn validate(regions: &[IoRegion]) -> Result<()> {
    for io in regions {
        if io.size == 0 || io.base % GRANULE_SIZE != 0 || io.size % GRANULE_SIZE != 0 {
            return Err(Error::Fatal("malformed I/O region declaration"));
        }
        if io.base.checked_add(io.size).is_none() {
            return Err(Error::Fatal("I/O region wraps the address space"));
        }
    }
    Ok(())
}
