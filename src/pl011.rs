// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Transmit-only PL011 UART driver used as the console chip on the virt
//! platform.
//!
//! Registers are addressed by byte offset from the device base. Only the
//! transmit path is driven: the baud divisor and receive side are left as
//! the previous boot stage programmed them, because the early console runs
//! before clock services exist.

use crate::console::SerialChip;
use core::fmt::{self, Write};
use core::hint::spin_loop;

// Register byte offsets.
const UARTDR: usize = 0x000;
const UARTFR: usize = 0x018;
const UARTLCR_H: usize = 0x02c;
const UARTCR: usize = 0x030;

/// Flag register: UART busy transmitting.
const FR_BUSY: u32 = 1 << 3;
/// Flag register: transmit FIFO full.
const FR_TXFF: u32 = 1 << 5;
/// Flag register: transmit FIFO empty.
const FR_TXFE: u32 = 1 << 7;

/// Control register: UART enable.
const CR_UARTEN: u32 = 1 << 0;
/// Control register: transmit enable.
const CR_TXE: u32 = 1 << 8;

/// Line control: enable FIFOs.
const LCR_H_FEN: u32 = 1 << 4;
/// Line control: 8 bit word length.
const LCR_H_WLEN_8: u32 = 0b11 << 5;

/// Transmit-only driver for a PL011 UART.
#[derive(Debug)]
pub struct Uart {
    base: *mut u32,
}

impl Uart {
    /// Constructs a new instance of the UART driver for a PL011 device at the
    /// given base address.
    ///
    /// # Safety
    ///
    /// The given base address must point to the MMIO control registers of a
    /// PL011 device, which must be mapped into the address space of the
    /// process as device memory and not have any other aliases.
    pub unsafe fn new(base: *mut u32) -> Self {
        Self { base }
    }

    fn read_reg(&self, offset: usize) -> u32 {
        // SAFETY: `self.base` points to the register block of a PL011 device
        // without aliases, as promised by the caller of `Uart::new`, and
        // `offset` is one of the register offsets above.
        unsafe { self.base.wrapping_byte_add(offset).read_volatile() }
    }

    fn write_reg(&self, offset: usize, value: u32) {
        // SAFETY: `self.base` points to the register block of a PL011 device
        // without aliases, as promised by the caller of `Uart::new`, and
        // `offset` is one of the register offsets above.
        unsafe { self.base.wrapping_byte_add(offset).write_volatile(value) }
    }

    /// Enables the transmitter with an 8-bit frame and FIFOs on. The baud
    /// divisor is not touched.
    pub fn enable(&self) {
        self.write_reg(UARTLCR_H, LCR_H_FEN | LCR_H_WLEN_8);
        self.write_reg(UARTCR, CR_UARTEN | CR_TXE);
    }

    /// Queues a single byte for transmission, waiting for FIFO room first.
    pub fn write_byte(&self, byte: u8) {
        while self.read_reg(UARTFR) & FR_TXFF != 0 {
            spin_loop();
        }
        self.write_reg(UARTDR, u32::from(byte));
    }
}

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

impl SerialChip for Uart {
    fn flush(&mut self) {
        loop {
            let flags = self.read_reg(UARTFR);
            if flags & FR_BUSY == 0 && flags & FR_TXFE != 0 {
                break;
            }
            spin_loop();
        }
    }
}

// SAFETY: `Uart` holds a pointer to device memory, which can be accessed from
// any context.
unsafe impl Send for Uart {}
