// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::decoder::{decode, AddrMode, Decoded, Mnemonic};
use crate::{Bus, Cpu, SimResult, SimulationError, SimulationObserver};
use std::sync::Arc;

/// Hardware stack lives in page one.
const STACK_BASE: u16 = 0x0100;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

bitflags::bitflags! {
    /// MOS 6502 processor status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const CARRY       = 0b0000_0001;
        const ZERO        = 0b0000_0010;
        const IRQ_DISABLE = 0b0000_0100;
        /// Decimal flag is tracked but BCD arithmetic is not implemented.
        const DECIMAL     = 0b0000_1000;
        const BREAK       = 0b0001_0000;
        const UNUSED      = 0b0010_0000;
        const OVERFLOW    = 0b0100_0000;
        const NEGATIVE    = 0b1000_0000;
    }
}

#[derive(Debug)]
pub struct Mos6502 {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// 8-bit stack pointer into page one, wraps around.
    pub sp: u8,
    pub pc: u16,
    pub status: Status,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0,
            pc: 0,
            status: Status::UNUSED,
        }
    }
}

impl Mos6502 {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_nz(&mut self, value: u8) -> u8 {
        self.status.set(Status::ZERO, value == 0);
        self.status.set(Status::NEGATIVE, value & 0x80 != 0);
        value
    }

    fn push_u8(&mut self, bus: &mut dyn Bus, value: u8) -> SimResult<()> {
        bus.write_u8(STACK_BASE + self.sp as u16, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    fn pull_u8(&mut self, bus: &mut dyn Bus) -> SimResult<u8> {
        self.sp = self.sp.wrapping_add(1);
        bus.read_u8(STACK_BASE + self.sp as u16)
    }

    fn push_u16(&mut self, bus: &mut dyn Bus, value: u16) -> SimResult<()> {
        // High byte first so the value reads back little-endian in memory
        self.push_u8(bus, (value >> 8) as u8)?;
        self.push_u8(bus, (value & 0xFF) as u8)
    }

    fn pull_u16(&mut self, bus: &mut dyn Bus) -> SimResult<u16> {
        let lo = self.pull_u8(bus)? as u16;
        let hi = self.pull_u8(bus)? as u16;
        Ok((hi << 8) | lo)
    }

    fn fetch_u8(&mut self, bus: &mut dyn Bus) -> SimResult<u8> {
        let value = bus.read_u8(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(value)
    }

    fn fetch_u16(&mut self, bus: &mut dyn Bus) -> SimResult<u16> {
        let value = bus.read_u16(self.pc)?;
        self.pc = self.pc.wrapping_add(2);
        Ok(value)
    }

    /// Consumes the operand bytes and resolves the effective address.
    /// Indexed zero-page addressing does not wrap at the page boundary.
    fn operand_address(&mut self, mode: AddrMode, bus: &mut dyn Bus) -> SimResult<u16> {
        match mode {
            AddrMode::ZeroPage => Ok(self.fetch_u8(bus)? as u16),
            AddrMode::ZeroPageX => {
                let base = self.fetch_u8(bus)? as u16;
                Ok(base.wrapping_add(self.x as u16))
            }
            AddrMode::ZeroPageY => {
                let base = self.fetch_u8(bus)? as u16;
                Ok(base.wrapping_add(self.y as u16))
            }
            AddrMode::Absolute => self.fetch_u16(bus),
            AddrMode::AbsoluteX => {
                let base = self.fetch_u16(bus)?;
                Ok(base.wrapping_add(self.x as u16))
            }
            AddrMode::AbsoluteY => {
                let base = self.fetch_u16(bus)?;
                Ok(base.wrapping_add(self.y as u16))
            }
            AddrMode::IndexedIndirect => {
                let ptr = (self.fetch_u8(bus)? as u16).wrapping_add(self.x as u16);
                bus.read_u16(ptr)
            }
            AddrMode::IndirectIndexed => {
                let ptr = self.fetch_u8(bus)? as u16;
                Ok(bus.read_u16(ptr)?.wrapping_add(self.y as u16))
            }
            AddrMode::Indirect => {
                let ptr = self.fetch_u16(bus)?;
                bus.read_u16(ptr)
            }
            AddrMode::Implied | AddrMode::Accumulator | AddrMode::Immediate | AddrMode::Relative => {
                unreachable!("addressing mode {:?} has no effective address", mode)
            }
        }
    }

    fn load_operand(&mut self, mode: AddrMode, bus: &mut dyn Bus) -> SimResult<u8> {
        match mode {
            AddrMode::Immediate => self.fetch_u8(bus),
            AddrMode::Accumulator => Ok(self.a),
            _ => {
                let addr = self.operand_address(mode, bus)?;
                bus.read_u8(addr)
            }
        }
    }

    /// Read-modify-write helper shared by the shift/rotate/inc/dec family.
    fn modify<F>(&mut self, mode: AddrMode, bus: &mut dyn Bus, f: F) -> SimResult<()>
    where
        F: FnOnce(&mut Self, u8) -> u8,
    {
        if mode == AddrMode::Accumulator {
            let value = self.a;
            self.a = f(self, value);
            return Ok(());
        }
        let addr = self.operand_address(mode, bus)?;
        let value = bus.read_u8(addr)?;
        let result = f(self, value);
        bus.write_u8(addr, result)
    }

    fn branch(&mut self, bus: &mut dyn Bus, taken: bool) -> SimResult<()> {
        let offset = self.fetch_u8(bus)? as i8;
        if taken {
            // Signed displacement relative to the next instruction
            self.pc = self.pc.wrapping_add(offset as u16);
        }
        Ok(())
    }

    fn adc(&mut self, value: u8) {
        let carry_in = if self.status.contains(Status::CARRY) { 1 } else { 0 };
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;
        self.status.set(Status::CARRY, sum > 0xFF);
        self.status.set(
            Status::OVERFLOW,
            (value ^ result) & (self.a ^ result) & 0x80 != 0,
        );
        self.set_nz(result);
        self.a = result;
    }

    fn sbc(&mut self, value: u8) {
        let borrow = if self.status.contains(Status::CARRY) { 0 } else { 1 };
        let diff = self.a as i16 - value as i16 - borrow;
        let result = diff as u8;
        self.status.set(Status::CARRY, diff >= 0);
        self.status.set(
            Status::OVERFLOW,
            (self.a ^ result) & (self.a ^ value) & 0x80 != 0,
        );
        self.set_nz(result);
        self.a = result;
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.set_nz(register.wrapping_sub(value));
        self.status.set(Status::CARRY, register >= value);
    }

    fn execute(&mut self, instr: Decoded, bus: &mut dyn Bus) -> SimResult<()> {
        use Mnemonic::*;

        match instr.mnemonic {
            Lda => {
                let value = self.load_operand(instr.mode, bus)?;
                self.a = self.set_nz(value);
            }
            Ldx => {
                let value = self.load_operand(instr.mode, bus)?;
                self.x = self.set_nz(value);
            }
            Ldy => {
                let value = self.load_operand(instr.mode, bus)?;
                self.y = self.set_nz(value);
            }
            Sta => {
                let addr = self.operand_address(instr.mode, bus)?;
                bus.write_u8(addr, self.a)?;
            }
            Stx => {
                let addr = self.operand_address(instr.mode, bus)?;
                bus.write_u8(addr, self.x)?;
            }
            Sty => {
                let addr = self.operand_address(instr.mode, bus)?;
                bus.write_u8(addr, self.y)?;
            }

            Tax => self.x = self.set_nz(self.a),
            Tay => self.y = self.set_nz(self.a),
            Txa => self.a = self.set_nz(self.x),
            Tya => self.a = self.set_nz(self.y),
            Tsx => self.x = self.set_nz(self.sp),
            Txs => self.sp = self.x, // no flags

            Pha => self.push_u8(bus, self.a)?,
            Pla => {
                let value = self.pull_u8(bus)?;
                self.a = self.set_nz(value);
            }
            Php => self.push_u8(bus, self.status.bits())?,
            Plp => {
                let value = self.pull_u8(bus)?;
                self.status = Status::from_bits_retain(value);
            }

            Adc => {
                let value = self.load_operand(instr.mode, bus)?;
                self.adc(value);
            }
            Sbc => {
                let value = self.load_operand(instr.mode, bus)?;
                self.sbc(value);
            }
            And => {
                let value = self.load_operand(instr.mode, bus)?;
                self.a = self.set_nz(self.a & value);
            }
            Ora => {
                let value = self.load_operand(instr.mode, bus)?;
                self.a = self.set_nz(self.a | value);
            }
            Eor => {
                let value = self.load_operand(instr.mode, bus)?;
                self.a = self.set_nz(self.a ^ value);
            }
            Cmp => {
                let value = self.load_operand(instr.mode, bus)?;
                self.compare(self.a, value);
            }
            Cpx => {
                let value = self.load_operand(instr.mode, bus)?;
                self.compare(self.x, value);
            }
            Cpy => {
                let value = self.load_operand(instr.mode, bus)?;
                self.compare(self.y, value);
            }
            Bit => {
                let value = self.load_operand(instr.mode, bus)?;
                self.status.set(Status::ZERO, self.a & value == 0);
                self.status.set(Status::NEGATIVE, value & 0x80 != 0);
                self.status.set(Status::OVERFLOW, value & 0x40 != 0);
            }

            Asl => self.modify(instr.mode, bus, |cpu, value| {
                cpu.status.set(Status::CARRY, value & 0x80 != 0);
                cpu.set_nz(value << 1)
            })?,
            Lsr => self.modify(instr.mode, bus, |cpu, value| {
                cpu.status.set(Status::CARRY, value & 0x01 != 0);
                cpu.set_nz(value >> 1)
            })?,
            Rol => self.modify(instr.mode, bus, |cpu, value| {
                let carry_in = if cpu.status.contains(Status::CARRY) { 1 } else { 0 };
                cpu.status.set(Status::CARRY, value & 0x80 != 0);
                cpu.set_nz((value << 1) | carry_in)
            })?,
            Ror => self.modify(instr.mode, bus, |cpu, value| {
                let carry_in = if cpu.status.contains(Status::CARRY) { 0x80 } else { 0 };
                cpu.status.set(Status::CARRY, value & 0x01 != 0);
                cpu.set_nz((value >> 1) | carry_in)
            })?,

            Inc => self.modify(instr.mode, bus, |cpu, value| {
                cpu.set_nz(value.wrapping_add(1))
            })?,
            Dec => self.modify(instr.mode, bus, |cpu, value| {
                cpu.set_nz(value.wrapping_sub(1))
            })?,
            Inx => self.x = self.set_nz(self.x.wrapping_add(1)),
            Iny => self.y = self.set_nz(self.y.wrapping_add(1)),
            Dex => self.x = self.set_nz(self.x.wrapping_sub(1)),
            Dey => self.y = self.set_nz(self.y.wrapping_sub(1)),

            Clc => self.status.remove(Status::CARRY),
            Sec => self.status.insert(Status::CARRY),
            Cli => self.status.remove(Status::IRQ_DISABLE),
            Sei => self.status.insert(Status::IRQ_DISABLE),
            Clv => self.status.remove(Status::OVERFLOW),
            Cld => self.status.remove(Status::DECIMAL),
            Sed => self.status.insert(Status::DECIMAL),

            Bpl => {
                let taken = !self.status.contains(Status::NEGATIVE);
                self.branch(bus, taken)?;
            }
            Bmi => {
                let taken = self.status.contains(Status::NEGATIVE);
                self.branch(bus, taken)?;
            }
            Bvc => {
                let taken = !self.status.contains(Status::OVERFLOW);
                self.branch(bus, taken)?;
            }
            Bvs => {
                let taken = self.status.contains(Status::OVERFLOW);
                self.branch(bus, taken)?;
            }
            Bcc => {
                let taken = !self.status.contains(Status::CARRY);
                self.branch(bus, taken)?;
            }
            Bcs => {
                let taken = self.status.contains(Status::CARRY);
                self.branch(bus, taken)?;
            }
            Bne => {
                let taken = !self.status.contains(Status::ZERO);
                self.branch(bus, taken)?;
            }
            Beq => {
                let taken = self.status.contains(Status::ZERO);
                self.branch(bus, taken)?;
            }

            Jmp => {
                self.pc = self.operand_address(instr.mode, bus)?;
            }
            Jsr => {
                let target = self.operand_address(instr.mode, bus)?;
                // Return address is the next instruction, pulled back verbatim by RTS
                self.push_u16(bus, self.pc)?;
                self.pc = target;
            }
            Rts => {
                self.pc = self.pull_u16(bus)?;
            }
            Rti => {
                let value = self.pull_u8(bus)?;
                self.status = Status::from_bits_retain(value);
                self.pc = self.pull_u16(bus)?;
            }
            Brk => {
                // BRK carries a padding byte the return address skips over
                self.pc = self.pc.wrapping_add(1);
                self.push_u16(bus, self.pc)?;
                self.push_u8(bus, (self.status | Status::BREAK).bits())?;
                self.status.insert(Status::IRQ_DISABLE);
                self.pc = bus.read_u16(IRQ_VECTOR)?;
            }
            Nop => {}
        }

        Ok(())
    }
}

impl Cpu for Mos6502 {
    fn reset(&mut self, bus: &mut dyn Bus) -> SimResult<()> {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0;
        self.status = Status::UNUSED;
        self.pc = bus.read_u16(RESET_VECTOR)?;
        Ok(())
    }

    fn step(
        &mut self,
        bus: &mut dyn Bus,
        observers: &[Arc<dyn SimulationObserver>],
    ) -> SimResult<()> {
        let pc = self.pc;
        let opcode = bus.read_u8(pc)?;
        self.pc = self.pc.wrapping_add(1);

        let instr = decode(opcode).ok_or(SimulationError::IllegalOpcode { opcode, pc })?;

        for observer in observers {
            observer.on_step_start(pc, opcode);
        }
        tracing::trace!("PC={:#06x} {:?} {:?} A={:#04x}", pc, instr.mnemonic, instr.mode, self.a);

        self.execute(instr, bus)
    }

    fn set_pc(&mut self, val: u16) {
        self.pc = val;
    }

    fn get_pc(&self) -> u16 {
        self.pc
    }
}
