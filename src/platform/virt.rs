// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The aarch64 "virt" reference machine.

use super::Platform;
use crate::{
    Error, Result,
    console::{ConsoleDescriptor, UartDriver},
    coordinator::ResetLine,
    dt::{DeviceTree, DtNode},
    gpio::{BankRange, BankTable},
    memmap::{IoRegion, PhysAddr},
    pl011::Uart,
};
use core::hint::spin_loop;
use log::warn;
use spin::Once;

/// Peripheral aperture holding the interrupt controller.
const DEVICE0_BASE: PhysAddr = 0x0800_0000;
const DEVICE0_SIZE: usize = 0x0100_0000;
/// Peripheral aperture holding the UARTs and other low-speed devices.
const DEVICE1_BASE: PhysAddr = 0x0900_0000;
const DEVICE1_SIZE: usize = 0x00c0_0000;

/// Base address of the non-secure PL011 UART, aka. UART1.
const UART1_BASE: PhysAddr = 0x0900_0000;
/// Base address of the secure world PL011 UART, aka. UART2.
const UART2_BASE: PhysAddr = 0x0904_0000;
/// Non-secure aperture around UART1, shared with the normal world console.
const UART1_APERTURE_SIZE: usize = 0x1000;

/// Spin iterations per microsecond of requested delay. Coarse on purpose:
/// the delays here are best-effort rendezvous windows, never precise timers.
const SPINS_PER_US: u64 = 128;

// GPIO bank register layout: each register is a fixed stride from the base,
// as a function of bank index only. Part of the device's hardware contract.
const GPIO_DATA_OFFSET: usize = 0x000;
const GPIO_DATA_STRIDE: usize = 0x08;
const GPIO_DIR_OFFSET: usize = 0x204;
const GPIO_OUTEN_OFFSET: usize = 0x208;
const GPIO_INT_MASK_OFFSET: usize = 0x20c;
const GPIO_BANK_STRIDE: usize = 0x40;

/// Data register offset of the given bank.
pub const fn gpio_data_offset(bank: u32) -> usize {
    GPIO_DATA_OFFSET + GPIO_DATA_STRIDE * bank as usize
}

/// Direction register offset of the given bank.
pub const fn gpio_dir_offset(bank: u32) -> usize {
    GPIO_DIR_OFFSET + GPIO_BANK_STRIDE * bank as usize
}

/// Output-enable register offset of the given bank.
pub const fn gpio_outen_offset(bank: u32) -> usize {
    GPIO_OUTEN_OFFSET + GPIO_BANK_STRIDE * bank as usize
}

/// Interrupt-mask register offset of the given bank.
pub const fn gpio_int_mask_offset(bank: u32) -> usize {
    GPIO_INT_MASK_OFFSET + GPIO_BANK_STRIDE * bank as usize
}

static GPIO_BANKS: Once<BankTable> = Once::new();

/// The virt platform.
pub struct Virt;

const _: () = assert!(Virt::EARLY_CONSOLE_UART < Virt::UART_BASES.len());
const _: () = assert!(Virt::HALT_CORES_SGI < 16);

impl Platform for Virt {
    const CORE_COUNT: usize = 4;

    const EARLY_CONSOLE_UART: usize = 2;

    const UART_BASES: &'static [PhysAddr] = &[0, UART1_BASE, UART2_BASE];

    const HALT_CORES_SGI: u32 = 8;

    const SYSTEM_RESET_LINE: ResetLine = ResetLine::System;

    const IO_REGIONS: &'static [IoRegion] = &[
        IoRegion::non_secure(UART1_BASE, UART1_APERTURE_SIZE),
        IoRegion::secure(DEVICE0_BASE, DEVICE0_SIZE),
        IoRegion::secure(DEVICE1_BASE, DEVICE1_SIZE),
    ];

    const NAME: &'static str = "virt";

    const FLAVOR: &'static str = "aarch64";

    type Uart = Pl011Driver;

    fn gpio_banks() -> &'static BankTable {
        GPIO_BANKS.call_once(|| {
            BankTable::new(
                "virt-gpio",
                58,
                &[
                    BankRange { min: 0, max: 25 },
                    BankRange { min: 26, max: 41 },
                    BankRange { min: 42, max: 57 },
                ],
            )
            .unwrap_or_else(|e| panic!("Bad GPIO bank constants: {}", e))
        })
    }

    fn udelay(us: u32) {
        for _ in 0..u64::from(us) * SPINS_PER_US {
            spin_loop();
        }
    }
}

/// PL011 binding of the UART driver interface.
pub struct Pl011Driver;

impl UartDriver for Pl011Driver {
    type Chip = Uart;

    fn init_early(base: PhysAddr) -> Uart {
        // SAFETY: `base` comes from the platform's fixed UART table or from
        // a console node's `reg` property, both of which name the MMIO
        // registers of a PL011 device that nothing else in this process
        // aliases.
        let uart = unsafe { Uart::new(base as *mut u32) };
        uart.enable();
        uart
    }

    fn probe_dt_node(dt: &dyn DeviceTree, node: DtNode) -> Result<Option<ConsoleDescriptor<Uart>>> {
        if !dt.node_enabled(node) {
            return Ok(None);
        }

        let base = match dt.reg_base(node) {
            Ok(base) => base,
            // A console node without registers is malformed.
            Err(Error::NotFound) => return Err(Error::Misconfigured),
            Err(e) => return Err(e),
        };

        let clock = match dt.clock(node) {
            Ok(id) => Some(id),
            Err(Error::NotFound) => {
                // Intentional: the console keeps working without power
                // management, exactly like the early console does.
                warn!("Console node has no clock; running unclocked");
                None
            }
            Err(e) => return Err(e),
        };

        let chip = Self::init_early(base);
        Ok(Some(ConsoleDescriptor { clock, base, chip }))
    }
}
