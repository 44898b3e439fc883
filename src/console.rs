// Copyright The Rusted TEE Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Console handover controller.
//!
//! The console goes through two phases on the boot core. The early phase runs
//! before clock or memory-management services exist and activates a UART at a
//! fixed physical address from a compile-time table. The final phase runs
//! once clocks are confirmed ready and replaces the early console with the
//! one the device tree designates, flushing buffered output before the swap.
//! "No console" is a valid terminal sub-state of either phase.

use crate::{
    Error, Result,
    dt::{ClockId, DeviceTree, DtNode},
    logger::LogSink,
    memmap::PhysAddr,
};
use core::fmt::{Arguments, Write};
use log::info;
use spin::mutex::SpinMutex;

/// Chip-register operations of a console UART.
pub trait SerialChip: Write + Send {
    /// Blocks until everything written so far has left the transmitter.
    fn flush(&mut self);
}

/// The UART hardware driver collaborator.
pub trait UartDriver {
    /// Chip-register operations handle produced by this driver.
    type Chip: SerialChip;

    /// Initialises the UART at a fixed physical address.
    ///
    /// Runs before clock and memory-management services exist and must not
    /// depend on either.
    fn init_early(base: PhysAddr) -> Self::Chip;

    /// Parses a console device-tree node into a descriptor.
    ///
    /// `Ok(None)` means the node disables the console; an error means the
    /// node is malformed.
    fn probe_dt_node(
        dt: &dyn DeviceTree,
        node: DtNode,
    ) -> Result<Option<ConsoleDescriptor<Self::Chip>>>;
}

/// The active console device.
pub struct ConsoleDescriptor<C> {
    /// Clock feeding the UART. The early console is explicitly allowed to
    /// run unclocked; a device-tree console normally binds one here.
    pub clock: Option<ClockId>,
    /// Physical base address of the UART.
    pub base: PhysAddr,
    /// Chip-register operations handle.
    pub chip: C,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Early,
    Final,
}

struct Slot<C> {
    active: Option<ConsoleDescriptor<C>>,
    phase: Phase,
}

/// Owner of the single active console descriptor.
///
/// Shared across cores; every mutation happens under the slot lock. Both
/// phase transitions run on the boot core, but secondary cores may already be
/// logging through [`LogSink`] during the handover window, which the same
/// lock serialises.
pub struct ConsoleState<C> {
    slot: SpinMutex<Slot<C>>,
}

impl<C: SerialChip> ConsoleState<C> {
    /// Creates the state with no console active, in the early phase.
    pub const fn new() -> Self {
        Self {
            slot: SpinMutex::new(Slot {
                active: None,
                phase: Phase::Early,
            }),
        }
    }

    /// Boot transition: activates the early console from the fixed-address
    /// table, if the build enables one.
    ///
    /// `id` indexes `table`; 0 disables the early console, as does a zero
    /// table entry. No clock is bound to the chip at this point.
    pub fn init_early<U>(&self, table: &[PhysAddr], id: usize)
    where
        U: UartDriver<Chip = C>,
    {
        let Some(&base) = table.get(id) else {
            return;
        };
        if id == 0 || base == 0 {
            return;
        }

        let chip = U::init_early(base);
        let mut slot = self.slot.lock();
        slot.active = Some(ConsoleDescriptor {
            clock: None,
            base,
            chip,
        });
        drop(slot);
        info!("Early console on UART#{}", id);
    }

    /// Final transition: replaces the early console with the device-tree one.
    ///
    /// The console node is looked up in the embedded tree first, then in the
    /// external tree when the first lookup reports [`Error::NotFound`]. A
    /// second `NotFound` is success with the console left as it was; any
    /// other lookup error is propagated. A node that parses to "disabled"
    /// clears the active console. Otherwise buffered output is flushed
    /// exactly once before the new descriptor takes over.
    ///
    /// Runs exactly once, after clock services are ready; a second call is
    /// rejected rather than relying on the init-level ordering contract.
    pub fn init_from_dt<U>(
        &self,
        embedded: &dyn DeviceTree,
        external: Option<&dyn DeviceTree>,
    ) -> Result<()>
    where
        U: UartDriver<Chip = C>,
    {
        {
            let mut slot = self.slot.lock();
            if slot.phase == Phase::Final {
                return Err(Error::Misconfigured);
            }
            slot.phase = Phase::Final;
        }

        let (dt, node) = match embedded.console_node() {
            Ok(node) => (embedded, node),
            Err(Error::NotFound) => {
                let Some(external) = external else {
                    return Ok(());
                };
                match external.console_node() {
                    Ok(node) => (external, node),
                    Err(Error::NotFound) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        let Some(descriptor) = U::probe_dt_node(dt, node)? else {
            let mut slot = self.slot.lock();
            slot.active = None;
            drop(slot);
            info!("DTB disables console");
            return Ok(());
        };

        // Replace the early console with the new one. The outgoing chip is
        // flushed so no buffered trace output is lost or interleaved.
        let mut slot = self.slot.lock();
        if let Some(active) = slot.active.as_mut() {
            active.chip.flush();
        }
        slot.active = Some(descriptor);
        drop(slot);
        info!("DTB enables console");
        Ok(())
    }

    /// Blocks until the active console has drained, if there is one.
    pub fn flush(&self) {
        if let Some(active) = self.slot.lock().active.as_mut() {
            active.chip.flush();
        }
    }

    /// Whether a console is currently active.
    pub fn is_active(&self) -> bool {
        self.slot.lock().active.is_some()
    }

    /// Base address of the active console, if any.
    pub fn active_base(&self) -> Option<PhysAddr> {
        self.slot.lock().active.as_ref().map(|d| d.base)
    }

    /// Clock bound to the active console, if any.
    pub fn active_clock(&self) -> Option<ClockId> {
        self.slot.lock().active.as_ref().and_then(|d| d.clock)
    }
}

impl<C: SerialChip> Default for ConsoleState<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SerialChip> LogSink for ConsoleState<C> {
    fn write_fmt(&self, args: Arguments) {
        if let Some(active) = self.slot.lock().active.as_mut() {
            // Ignore errors.
            let _ = active.chip.write_fmt(args);
        }
    }

    fn flush(&self) {
        ConsoleState::flush(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{
        FakeDt, FakeUartDriver, TestPlatform, UartEvent, start_uart_event_log,
    };
    use crate::platform::Platform;

    const DT_UART_BASE: PhysAddr = 0x4000_0000;

    fn state() -> ConsoleState<<FakeUartDriver as UartDriver>::Chip> {
        ConsoleState::new()
    }

    #[test]
    fn early_console_disabled_by_id_zero() {
        let console = state();
        console.init_early::<FakeUartDriver>(TestPlatform::UART_BASES, 0);
        assert!(!console.is_active());
    }

    #[test]
    fn early_console_activates_configured_uart() {
        let console = state();
        console.init_early::<FakeUartDriver>(
            TestPlatform::UART_BASES,
            TestPlatform::EARLY_CONSOLE_UART,
        );
        assert_eq!(
            console.active_base(),
            Some(TestPlatform::UART_BASES[TestPlatform::EARLY_CONSOLE_UART])
        );
        // No clock exists yet at this point of boot.
        assert_eq!(console.active_clock(), None);
    }

    #[test]
    fn dt_handover_replaces_early_console_and_flushes_once() {
        let events = start_uart_event_log();
        let console = state();
        console.init_early::<FakeUartDriver>(
            TestPlatform::UART_BASES,
            TestPlatform::EARLY_CONSOLE_UART,
        );
        let early_base = console.active_base().unwrap();

        let dt = FakeDt {
            console: Some(DtNode(42)),
            reg: Some(DT_UART_BASE),
            clock: Some(ClockId(3)),
            ..FakeDt::default()
        };
        console.init_from_dt::<FakeUartDriver>(&dt, None).unwrap();

        assert_eq!(console.active_base(), Some(DT_UART_BASE));
        assert_eq!(console.active_clock(), Some(ClockId(3)));

        let flushes = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == UartEvent::Flush(early_base))
            .count();
        assert_eq!(flushes, 1);
    }

    #[test]
    fn missing_console_node_everywhere_is_success() {
        let console = state();
        console.init_early::<FakeUartDriver>(
            TestPlatform::UART_BASES,
            TestPlatform::EARLY_CONSOLE_UART,
        );
        let embedded = FakeDt::default();
        let external = FakeDt::default();
        console
            .init_from_dt::<FakeUartDriver>(&embedded, Some(&external))
            .unwrap();
        // The early console stays in place.
        assert!(console.is_active());
    }

    #[test]
    fn external_tree_is_used_as_fallback() {
        let console = state();
        let embedded = FakeDt::default();
        let external = FakeDt {
            console: Some(DtNode(7)),
            reg: Some(DT_UART_BASE),
            clock: Some(ClockId(1)),
            ..FakeDt::default()
        };
        console
            .init_from_dt::<FakeUartDriver>(&embedded, Some(&external))
            .unwrap();
        assert_eq!(console.active_base(), Some(DT_UART_BASE));
    }

    #[test]
    fn lookup_errors_propagate() {
        let console = state();
        let embedded = FakeDt {
            fail: Some(Error::Misconfigured),
            ..FakeDt::default()
        };
        assert_eq!(
            console.init_from_dt::<FakeUartDriver>(&embedded, None),
            Err(Error::Misconfigured)
        );
    }

    #[test]
    fn disabled_node_clears_active_console() {
        let console = state();
        console.init_early::<FakeUartDriver>(
            TestPlatform::UART_BASES,
            TestPlatform::EARLY_CONSOLE_UART,
        );
        let dt = FakeDt {
            console: Some(DtNode(42)),
            reg: Some(DT_UART_BASE),
            enabled: false,
            ..FakeDt::default()
        };
        console.init_from_dt::<FakeUartDriver>(&dt, None).unwrap();
        assert!(!console.is_active());
    }

    #[test]
    fn dt_console_without_clock_is_accepted_unclocked() {
        let console = state();
        let dt = FakeDt {
            console: Some(DtNode(42)),
            reg: Some(DT_UART_BASE),
            clock: None,
            ..FakeDt::default()
        };
        console.init_from_dt::<FakeUartDriver>(&dt, None).unwrap();
        assert_eq!(console.active_base(), Some(DT_UART_BASE));
        assert_eq!(console.active_clock(), None);
    }

    #[test]
    fn second_final_transition_is_rejected() {
        let console = state();
        let dt = FakeDt::default();
        console.init_from_dt::<FakeUartDriver>(&dt, None).unwrap();
        assert_eq!(
            console.init_from_dt::<FakeUartDriver>(&dt, None),
            Err(Error::Misconfigured)
        );
    }
}
