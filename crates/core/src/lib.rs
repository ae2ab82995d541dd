// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod cpu;
pub mod decoder;
pub mod memory;
pub mod metrics;
pub mod peripherals;
pub mod signals;

use std::any::Any;
use std::sync::Arc;


#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#06x}")]
    MemoryViolation(u16),
    #[error("Illegal opcode {opcode:#04x} at {pc:#06x}")]
    IllegalOpcode { opcode: u8, pc: u16 },
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    fn on_step_start(&self, _pc: u16, _opcode: u8) {}
}

/// Trait representing a CPU architecture
pub trait Cpu {
    fn reset(&mut self, bus: &mut dyn Bus) -> SimResult<()>;
    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> SimResult<()>;
    fn set_pc(&mut self, val: u16);
    fn get_pc(&self) -> u16;
}

/// Trait representing a memory-mapped peripheral
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u16) -> SimResult<u8>;
    fn write(&mut self, offset: u16, value: u8) -> SimResult<()>;
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

/// Trait representing the system bus
pub trait Bus {
    fn read_u8(&self, addr: u16) -> SimResult<u8>;
    fn write_u8(&mut self, addr: u16, value: u8) -> SimResult<()>;

    fn read_u16(&self, addr: u16) -> SimResult<u16> {
        let b0 = self.read_u8(addr)? as u16;
        let b1 = self.read_u8(addr.wrapping_add(1))? as u16;
        // Little Endian
        Ok(b0 | (b1 << 8))
    }
}

/// Why a `Machine::run` loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The clock line was paused via the clock-control register.
    Paused,
    MaxSteps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub stop_reason: StopReason,
    pub steps_executed: u64,
}

pub struct Machine<C: Cpu> {
    pub cpu: C,
    pub bus: bus::SystemBus,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
}

impl<C: Cpu> Machine<C> {
    pub fn new(cpu: C, bus: bus::SystemBus) -> Self {
        Self {
            cpu,
            bus,
            observers: Vec::new(),
        }
    }

    pub fn load_program(&mut self, image: &memory::ProgramImage) -> SimResult<()> {
        for segment in &image.segments {
            if !self.bus.ram.load_from_segment(segment) {
                tracing::warn!(
                    "Failed to load segment at {:#06x} - outside of memory map",
                    segment.start_addr
                );
            }
        }

        for observer in &self.observers {
            observer.on_simulation_start();
        }
        self.reset()?;

        // Fallback if the reset vector is missing/zero
        if self.cpu.get_pc() == 0 {
            self.cpu.set_pc(image.entry_point);
        }

        Ok(())
    }

    pub fn reset(&mut self) -> SimResult<()> {
        self.bus.clock.resume();
        self.cpu.reset(&mut self.bus)
    }

    pub fn step(&mut self) -> SimResult<()> {
        self.cpu.step(&mut self.bus, &self.observers)
    }

    /// Step until the clock line is paused or the step budget runs out.
    /// Simulation errors propagate to the caller untouched.
    pub fn run(&mut self, max_steps: u64) -> SimResult<RunOutcome> {
        let mut steps_executed = 0;
        let outcome = loop {
            if self.bus.clock.is_paused() {
                break RunOutcome {
                    stop_reason: StopReason::Paused,
                    steps_executed,
                };
            }
            if steps_executed >= max_steps {
                break RunOutcome {
                    stop_reason: StopReason::MaxSteps,
                    steps_executed,
                };
            }
            self.step()?;
            steps_executed += 1;
        };

        for observer in &self.observers {
            observer.on_simulation_stop();
        }
        Ok(outcome)
    }
}
