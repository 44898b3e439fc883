// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! GPIO bank resolution and pin allocation.
//!
//! A device exposes its pins as one flat index space split across hardware
//! banks. The bank table is built once from firmware constants and validated
//! at construction; resolution is then a plain range scan. Pin descriptors
//! come from the generic GPIO framework collaborator and are only handed to
//! callers after the index has been checked against the device.

use crate::{Error, Result, dt::DtPinArgs};
use arrayvec::ArrayVec;
use log::debug;

/// Largest number of banks a single device exposes.
pub const GPIO_MAX_BANKS: usize = 6;

/// Inclusive flat-pin range covered by one bank.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BankRange {
    /// First flat pin index of the bank.
    pub min: u32,
    /// Last flat pin index of the bank.
    pub max: u32,
}

/// Bank layout of one GPIO device family.
///
/// Invariant, checked at construction: the ranges are contiguous,
/// non-overlapping and cover exactly `[0, pin_count)` in ascending order.
pub struct BankTable {
    label: &'static str,
    ngpio: u32,
    banks: ArrayVec<BankRange, GPIO_MAX_BANKS>,
}

impl BankTable {
    /// Builds a table from firmware constants, validating the invariant once
    /// so it never has to be re-checked per resolution.
    pub fn new(label: &'static str, ngpio: u32, ranges: &[BankRange]) -> Result<Self> {
        if ranges.is_empty() || ranges.len() > GPIO_MAX_BANKS {
            return Err(Error::Fatal("gpio bank table has a bad bank count"));
        }
        let mut next = 0u32;
        let mut banks = ArrayVec::new();
        for range in ranges {
            if range.min != next || range.max < range.min {
                return Err(Error::Fatal("gpio bank ranges are not contiguous"));
            }
            // A range ending at u32::MAX cannot be followed or summed up.
            let Some(end) = range.max.checked_add(1) else {
                return Err(Error::Fatal("gpio bank ranges are not contiguous"));
            };
            next = end;
            banks.push(*range);
        }
        if next != ngpio {
            return Err(Error::Fatal("gpio bank ranges do not cover the device"));
        }
        Ok(Self {
            label,
            ngpio,
            banks,
        })
    }

    /// Device family label, as printed in diagnostics.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Total number of pins exposed by the device.
    pub fn pin_count(&self) -> u32 {
        self.ngpio
    }

    /// Resolves a flat pin index into its (bank, pin-in-bank) pair.
    ///
    /// `pin` must be below [`pin_count`](Self::pin_count); violating that is
    /// a programmer error caught by an assertion before the search. A table
    /// that passes the precondition but covers no matching bank is corrupted
    /// and reported as [`Error::Fatal`].
    pub fn bank_and_pin(&self, pin: u32) -> Result<(u32, u32)> {
        assert!(
            pin < self.ngpio,
            "pin {} out of range for {}",
            pin,
            self.label
        );

        for (bank, range) in self.banks.iter().enumerate() {
            if pin >= range.min && pin <= range.max {
                return Ok((bank as u32, pin - range.min));
            }
        }

        // Ideally, never reached: construction validates full coverage.
        Err(Error::Fatal("gpio bank table does not cover pin"))
    }
}

/// A pin descriptor as produced by the generic GPIO framework.
///
/// Dropping the descriptor releases whatever resources the framework
/// allocated for it.
pub trait RawPin {
    /// Flat pin index within the owning device.
    fn pin(&self) -> u32;
}

/// The generic GPIO framework collaborator: parses device-tree specifier
/// cells into raw pin descriptors.
pub trait PinFramework {
    /// Descriptor type produced by this framework.
    type Pin: RawPin;

    /// Allocates a descriptor from device-tree arguments. The framework owns
    /// the cell format; errors are propagated to the caller unchanged.
    fn alloc_from_dt(&self, args: &DtPinArgs) -> Result<Self::Pin>;
}

/// Chip-register operations of a GPIO device (driver collaborator).
pub trait GpioChip: Sync {
    /// Drives the line at (bank, offset) high or low.
    fn set_level(&self, bank: u32, offset: u32, high: bool);

    /// Reads the line at (bank, offset).
    fn level(&self, bank: u32, offset: u32) -> bool;

    /// Configures the line at (bank, offset) as output or input.
    fn set_output(&self, bank: u32, offset: u32, enable: bool);
}

/// One GPIO device instance: its bank layout plus its chip operations.
pub struct GpioDevice<'a> {
    /// Bank layout of the device family.
    pub banks: &'a BankTable,
    /// Chip-register operations.
    pub chip: &'a dyn GpioChip,
}

/// A validated pin bound to its owning chip.
///
/// Only [`allocate_pin_descriptor`] creates these, so a descriptor in caller
/// hands always carries an in-range pin index.
pub struct PinDescriptor<'a, R: RawPin> {
    device: &'a GpioDevice<'a>,
    raw: R,
}

impl<R: RawPin> PinDescriptor<'_, R> {
    /// Flat pin index within the owning device.
    pub fn pin(&self) -> u32 {
        self.raw.pin()
    }

    /// Drives the line high or low.
    pub fn set_level(&self, high: bool) -> Result<()> {
        let (bank, offset) = self.device.banks.bank_and_pin(self.pin())?;
        self.device.chip.set_level(bank, offset, high);
        Ok(())
    }

    /// Reads the line.
    pub fn level(&self) -> Result<bool> {
        let (bank, offset) = self.device.banks.bank_and_pin(self.pin())?;
        Ok(self.device.chip.level(bank, offset))
    }

    /// Configures the line as output or input.
    pub fn set_output(&self, enable: bool) -> Result<()> {
        let (bank, offset) = self.device.banks.bank_and_pin(self.pin())?;
        self.device.chip.set_output(bank, offset, enable);
        Ok(())
    }
}

/// Allocates a pin descriptor for a device-tree pin request.
///
/// The framework parses the request; its errors pass through unchanged. A
/// descriptor whose pin index falls outside the device is released before
/// this returns, so a half-valid descriptor is never visible to the caller.
/// An out-of-range index means a misconfigured device tree, logged at debug
/// level only.
pub fn allocate_pin_descriptor<'a, F: PinFramework>(
    framework: &F,
    args: &DtPinArgs,
    device: &'a GpioDevice<'a>,
) -> Result<PinDescriptor<'a, F::Pin>> {
    let raw = framework.alloc_from_dt(args)?;

    if raw.pin() >= device.banks.pin_count() {
        debug!(
            "Pin {} is outside of the {} pin range",
            raw.pin(),
            device.banks.label()
        );
        return Err(Error::Misconfigured);
    }

    Ok(PinDescriptor { device, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dt::{DtNode, DtPinArgs};
    use crate::platform::test::{FakeGpioChip, FakePinFramework};
    use arrayvec::ArrayVec;

    fn table() -> BankTable {
        BankTable::new(
            "test-gpio",
            58,
            &[
                BankRange { min: 0, max: 25 },
                BankRange { min: 26, max: 41 },
                BankRange { min: 42, max: 57 },
            ],
        )
        .unwrap()
    }

    fn pin_args() -> DtPinArgs {
        DtPinArgs::new(DtNode(3), &[0, 0]).unwrap()
    }

    #[test]
    fn every_pin_resolves_to_its_bank() {
        let table = table();
        for pin in 0..table.pin_count() {
            let (bank, offset) = table.bank_and_pin(pin).unwrap();
            let expected_bank = match pin {
                0..=25 => 0,
                26..=41 => 1,
                _ => 2,
            };
            assert_eq!(bank, expected_bank, "pin {}", pin);
            let min = [0, 26, 42][bank as usize];
            assert_eq!(offset, pin - min, "pin {}", pin);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_pin_is_a_precondition_violation() {
        let _ = table().bank_and_pin(58);
    }

    #[test]
    fn malformed_tables_are_rejected_at_construction() {
        // Gap between banks.
        assert!(matches!(
            BankTable::new(
                "bad",
                16,
                &[BankRange { min: 0, max: 5 }, BankRange { min: 8, max: 15 }],
            ),
            Err(Error::Fatal(_))
        ));
        // Ranges fall short of the pin count.
        assert!(matches!(
            BankTable::new("bad", 16, &[BankRange { min: 0, max: 7 }]),
            Err(Error::Fatal(_))
        ));
        // No banks at all.
        assert!(matches!(BankTable::new("bad", 0, &[]), Err(Error::Fatal(_))));
    }

    #[test]
    fn table_ending_at_the_index_limit_is_rejected() {
        // max + 1 would overflow; must be an error, not an arithmetic panic.
        let result = BankTable::new(
            "bad",
            u32::MAX,
            &[BankRange {
                min: 0,
                max: u32::MAX,
            }],
        );
        assert!(matches!(result, Err(Error::Fatal(_))));
    }

    #[test]
    fn corrupted_table_is_fatal_not_a_panic() {
        // Bypass the constructor to model in-memory corruption: a hole the
        // validated invariant rules out.
        let mut banks = ArrayVec::new();
        banks.push(BankRange { min: 10, max: 20 });
        let table = BankTable {
            label: "corrupt",
            ngpio: 30,
            banks,
        };
        assert_eq!(
            table.bank_and_pin(5),
            Err(Error::Fatal("gpio bank table does not cover pin"))
        );
    }

    #[test]
    fn allocation_binds_descriptor_to_chip() {
        let table = table();
        let chip = FakeGpioChip::default();
        let device = GpioDevice {
            banks: &table,
            chip: &chip,
        };
        let framework = FakePinFramework::returning(30);

        let descriptor = allocate_pin_descriptor(&framework, &pin_args(), &device).unwrap();
        assert_eq!(descriptor.pin(), 30);

        // Pin 30 lives in bank 1 at offset 4; chip operations route there.
        descriptor.set_level(true).unwrap();
        assert_eq!(*chip.writes.lock().unwrap(), vec![(1, 4, true)]);
    }

    #[test]
    fn out_of_range_pin_is_released_and_rejected() {
        let table = table();
        let chip = FakeGpioChip::default();
        let device = GpioDevice {
            banks: &table,
            chip: &chip,
        };
        let framework = FakePinFramework::returning(58);

        let result = allocate_pin_descriptor(&framework, &pin_args(), &device);
        assert!(matches!(result, Err(Error::Misconfigured)));
        // The framework's descriptor was dropped, not leaked.
        assert_eq!(framework.live_descriptors(), 0);
    }

    #[test]
    fn framework_errors_pass_through_unchanged() {
        let table = table();
        let chip = FakeGpioChip::default();
        let device = GpioDevice {
            banks: &table,
            chip: &chip,
        };
        let framework = FakePinFramework::failing(Error::NotFound);

        let result = allocate_pin_descriptor(&framework, &pin_args(), &device);
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[test]
    fn successful_allocation_keeps_descriptor_resources() {
        let table = table();
        let chip = FakeGpioChip::default();
        let device = GpioDevice {
            banks: &table,
            chip: &chip,
        };
        let framework = FakePinFramework::returning(0);

        let descriptor = allocate_pin_descriptor(&framework, &pin_args(), &device).unwrap();
        assert_eq!(framework.live_descriptors(), 1);
        drop(descriptor);
        assert_eq!(framework.live_descriptors(), 0);
    }
}
