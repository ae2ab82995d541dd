// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::LinearMemory;
use crate::peripherals::console::{Console, ConsoleEvent};
use crate::signals::ClockLine;
use crate::{Peripheral, SimResult, SimulationError};
use bench65_config::{parse_size, MachineDescriptor};
use std::sync::{Arc, Mutex};

/// The 6502 address space is 64 KiB; RAM may not exceed it.
const ADDRESS_SPACE: usize = 0x1_0000;

pub struct PeripheralEntry {
    pub name: String,
    pub base: u16,
    pub size: u16,
    pub dev: Box<dyn Peripheral>,
}

pub struct SystemBus {
    pub ram: LinearMemory,
    /// Peripheral windows shadow the RAM underneath them.
    pub peripherals: Vec<PeripheralEntry>,
    pub clock: ClockLine,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// Default machine: a flat 64 KiB RAM with the host-console window at
    /// its usual base.
    pub fn new() -> Self {
        let clock = ClockLine::new();
        Self {
            ram: LinearMemory::new(ADDRESS_SPACE, 0x0000),
            peripherals: vec![PeripheralEntry {
                name: "console0".to_string(),
                base: crate::peripherals::console::CONSOLE_BASE,
                size: crate::peripherals::console::WINDOW_SIZE,
                dev: Box::new(Console::new(clock.clone())),
            }],
            clock,
        }
    }

    pub fn from_config(machine: &MachineDescriptor) -> anyhow::Result<Self> {
        let ram_size = parse_size(&machine.ram.size)? as usize;
        if machine.ram.base as usize + ram_size > ADDRESS_SPACE {
            anyhow::bail!(
                "RAM window ({} bytes at {:#06x}) exceeds the 64 KiB address space",
                ram_size,
                machine.ram.base
            );
        }

        let clock = ClockLine::new();
        let mut bus = Self {
            ram: LinearMemory::new(ram_size, machine.ram.base),
            peripherals: Vec::new(),
            clock,
        };

        for p_cfg in &machine.peripherals {
            let dev: Box<dyn Peripheral> = match p_cfg.r#type.as_str() {
                "console" => Box::new(Console::new(bus.clock.clone())),
                other => {
                    tracing::warn!(
                        "Unsupported peripheral type '{}' for id '{}'; skipping",
                        other,
                        p_cfg.id
                    );
                    continue;
                }
            };

            let size = if let Some(size) = &p_cfg.size {
                parse_size(size)? as u16
            } else {
                crate::peripherals::console::WINDOW_SIZE
            };

            bus.peripherals.push(PeripheralEntry {
                name: p_cfg.id.clone(),
                base: p_cfg.base_address,
                size,
                dev,
            });
        }

        Ok(bus)
    }

    /// Attach a capture sink to any console peripherals on this bus.
    ///
    /// When `echo_stdout` is false, console writes are no longer printed to
    /// stdout (still captured for assertions/artifacts).
    pub fn attach_console_sink(&mut self, sink: Arc<Mutex<Vec<ConsoleEvent>>>, echo_stdout: bool) {
        for p in &mut self.peripherals {
            let Some(any) = p.dev.as_any_mut() else {
                continue;
            };
            let Some(console) = any.downcast_mut::<Console>() else {
                continue;
            };
            console.set_sink(Some(sink.clone()), echo_stdout);
        }
    }
}

impl crate::Bus for SystemBus {
    fn read_u8(&self, addr: u16) -> SimResult<u8> {
        // Peripheral windows take precedence over the RAM below them
        for p in &self.peripherals {
            if addr >= p.base && (addr as usize) < p.base as usize + p.size as usize {
                return p.dev.read(addr - p.base);
            }
        }

        if let Some(byte) = self.ram.read_u8(addr) {
            return Ok(byte);
        }

        Err(SimulationError::MemoryViolation(addr))
    }

    fn write_u8(&mut self, addr: u16, value: u8) -> SimResult<()> {
        for p in &mut self.peripherals {
            if addr >= p.base && (addr as usize) < p.base as usize + p.size as usize {
                return p.dev.write(addr - p.base, value);
            }
        }

        if self.ram.write_u8(addr, value) {
            return Ok(());
        }

        Err(SimulationError::MemoryViolation(addr))
    }
}
