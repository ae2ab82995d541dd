// Bench65 - 6502 Firmware Simulation Platform
// Copyright (C) 2026 The Bench65 Team
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    // Loads / stores
    Lda,
    Ldx,
    Ldy,
    Sta,
    Stx,
    Sty,
    // Register transfers
    Tax,
    Tay,
    Txa,
    Tya,
    Tsx,
    Txs,
    // Stack
    Pha,
    Pla,
    Php,
    Plp,
    // Arithmetic / logic
    Adc,
    Sbc,
    And,
    Ora,
    Eor,
    Cmp,
    Cpx,
    Cpy,
    Bit,
    // Shifts / rotates
    Asl,
    Lsr,
    Rol,
    Ror,
    // Increments / decrements
    Inc,
    Dec,
    Inx,
    Iny,
    Dex,
    Dey,
    // Flag operations
    Clc,
    Sec,
    Cli,
    Sei,
    Clv,
    Cld,
    Sed,
    // Branches
    Bpl,
    Bmi,
    Bvc,
    Bvs,
    Bcc,
    Bcs,
    Bne,
    Beq,
    // Jumps / subroutines / interrupts
    Jmp,
    Jsr,
    Rts,
    Rti,
    Brk,
    Nop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// ($zp,X)
    IndexedIndirect,
    /// ($zp),Y
    IndirectIndexed,
    /// ($abs) - JMP only
    Indirect,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub mnemonic: Mnemonic,
    pub mode: AddrMode,
}

const fn instr(mnemonic: Mnemonic, mode: AddrMode) -> Option<Decoded> {
    Some(Decoded { mnemonic, mode })
}

/// Decodes a single opcode byte. Returns `None` for opcodes outside the
/// documented instruction set.
pub fn decode(opcode: u8) -> Option<Decoded> {
    use AddrMode::*;
    use Mnemonic::*;

    match opcode {
        0x00 => instr(Brk, Implied),
        0xEA => instr(Nop, Implied),

        0xA9 => instr(Lda, Immediate),
        0xA5 => instr(Lda, ZeroPage),
        0xB5 => instr(Lda, ZeroPageX),
        0xAD => instr(Lda, Absolute),
        0xBD => instr(Lda, AbsoluteX),
        0xB9 => instr(Lda, AbsoluteY),
        0xA1 => instr(Lda, IndexedIndirect),
        0xB1 => instr(Lda, IndirectIndexed),

        0xA2 => instr(Ldx, Immediate),
        0xA6 => instr(Ldx, ZeroPage),
        0xB6 => instr(Ldx, ZeroPageY),
        0xAE => instr(Ldx, Absolute),
        0xBE => instr(Ldx, AbsoluteY),

        0xA0 => instr(Ldy, Immediate),
        0xA4 => instr(Ldy, ZeroPage),
        0xB4 => instr(Ldy, ZeroPageX),
        0xAC => instr(Ldy, Absolute),
        0xBC => instr(Ldy, AbsoluteX),

        0x85 => instr(Sta, ZeroPage),
        0x95 => instr(Sta, ZeroPageX),
        0x8D => instr(Sta, Absolute),
        0x9D => instr(Sta, AbsoluteX),
        0x99 => instr(Sta, AbsoluteY),
        0x81 => instr(Sta, IndexedIndirect),
        0x91 => instr(Sta, IndirectIndexed),

        0x86 => instr(Stx, ZeroPage),
        0x96 => instr(Stx, ZeroPageY),
        0x8E => instr(Stx, Absolute),

        0x84 => instr(Sty, ZeroPage),
        0x94 => instr(Sty, ZeroPageX),
        0x8C => instr(Sty, Absolute),

        0xAA => instr(Tax, Implied),
        0xA8 => instr(Tay, Implied),
        0x8A => instr(Txa, Implied),
        0x98 => instr(Tya, Implied),
        0xBA => instr(Tsx, Implied),
        0x9A => instr(Txs, Implied),

        0x48 => instr(Pha, Implied),
        0x68 => instr(Pla, Implied),
        0x08 => instr(Php, Implied),
        0x28 => instr(Plp, Implied),

        0x69 => instr(Adc, Immediate),
        0x65 => instr(Adc, ZeroPage),
        0x75 => instr(Adc, ZeroPageX),
        0x6D => instr(Adc, Absolute),
        0x7D => instr(Adc, AbsoluteX),
        0x79 => instr(Adc, AbsoluteY),
        0x61 => instr(Adc, IndexedIndirect),
        0x71 => instr(Adc, IndirectIndexed),

        0xE9 => instr(Sbc, Immediate),
        0xE5 => instr(Sbc, ZeroPage),
        0xF5 => instr(Sbc, ZeroPageX),
        0xED => instr(Sbc, Absolute),
        0xFD => instr(Sbc, AbsoluteX),
        0xF9 => instr(Sbc, AbsoluteY),
        0xE1 => instr(Sbc, IndexedIndirect),
        0xF1 => instr(Sbc, IndirectIndexed),

        0x29 => instr(And, Immediate),
        0x25 => instr(And, ZeroPage),
        0x35 => instr(And, ZeroPageX),
        0x2D => instr(And, Absolute),
        0x3D => instr(And, AbsoluteX),
        0x39 => instr(And, AbsoluteY),
        0x21 => instr(And, IndexedIndirect),
        0x31 => instr(And, IndirectIndexed),

        0x09 => instr(Ora, Immediate),
        0x05 => instr(Ora, ZeroPage),
        0x15 => instr(Ora, ZeroPageX),
        0x0D => instr(Ora, Absolute),
        0x1D => instr(Ora, AbsoluteX),
        0x19 => instr(Ora, AbsoluteY),
        0x01 => instr(Ora, IndexedIndirect),
        0x11 => instr(Ora, IndirectIndexed),

        0x49 => instr(Eor, Immediate),
        0x45 => instr(Eor, ZeroPage),
        0x55 => instr(Eor, ZeroPageX),
        0x4D => instr(Eor, Absolute),
        0x5D => instr(Eor, AbsoluteX),
        0x59 => instr(Eor, AbsoluteY),
        0x41 => instr(Eor, IndexedIndirect),
        0x51 => instr(Eor, IndirectIndexed),

        0xC9 => instr(Cmp, Immediate),
        0xC5 => instr(Cmp, ZeroPage),
        0xD5 => instr(Cmp, ZeroPageX),
        0xCD => instr(Cmp, Absolute),
        0xDD => instr(Cmp, AbsoluteX),
        0xD9 => instr(Cmp, AbsoluteY),
        0xC1 => instr(Cmp, IndexedIndirect),
        0xD1 => instr(Cmp, IndirectIndexed),

        0xE0 => instr(Cpx, Immediate),
        0xE4 => instr(Cpx, ZeroPage),
        0xEC => instr(Cpx, Absolute),

        0xC0 => instr(Cpy, Immediate),
        0xC4 => instr(Cpy, ZeroPage),
        0xCC => instr(Cpy, Absolute),

        0x24 => instr(Bit, ZeroPage),
        0x2C => instr(Bit, Absolute),

        0x0A => instr(Asl, Accumulator),
        0x06 => instr(Asl, ZeroPage),
        0x16 => instr(Asl, ZeroPageX),
        0x0E => instr(Asl, Absolute),
        0x1E => instr(Asl, AbsoluteX),

        0x4A => instr(Lsr, Accumulator),
        0x46 => instr(Lsr, ZeroPage),
        0x56 => instr(Lsr, ZeroPageX),
        0x4E => instr(Lsr, Absolute),
        0x5E => instr(Lsr, AbsoluteX),

        0x2A => instr(Rol, Accumulator),
        0x26 => instr(Rol, ZeroPage),
        0x36 => instr(Rol, ZeroPageX),
        0x2E => instr(Rol, Absolute),
        0x3E => instr(Rol, AbsoluteX),

        0x6A => instr(Ror, Accumulator),
        0x66 => instr(Ror, ZeroPage),
        0x76 => instr(Ror, ZeroPageX),
        0x6E => instr(Ror, Absolute),
        0x7E => instr(Ror, AbsoluteX),

        0xE6 => instr(Inc, ZeroPage),
        0xF6 => instr(Inc, ZeroPageX),
        0xEE => instr(Inc, Absolute),
        0xFE => instr(Inc, AbsoluteX),

        0xC6 => instr(Dec, ZeroPage),
        0xD6 => instr(Dec, ZeroPageX),
        0xCE => instr(Dec, Absolute),
        0xDE => instr(Dec, AbsoluteX),

        0xE8 => instr(Inx, Implied),
        0xC8 => instr(Iny, Implied),
        0xCA => instr(Dex, Implied),
        0x88 => instr(Dey, Implied),

        0x18 => instr(Clc, Implied),
        0x38 => instr(Sec, Implied),
        0x58 => instr(Cli, Implied),
        0x78 => instr(Sei, Implied),
        0xB8 => instr(Clv, Implied),
        0xD8 => instr(Cld, Implied),
        0xF8 => instr(Sed, Implied),

        0x10 => instr(Bpl, Relative),
        0x30 => instr(Bmi, Relative),
        0x50 => instr(Bvc, Relative),
        0x70 => instr(Bvs, Relative),
        0x90 => instr(Bcc, Relative),
        0xB0 => instr(Bcs, Relative),
        0xD0 => instr(Bne, Relative),
        0xF0 => instr(Beq, Relative),

        0x4C => instr(Jmp, Absolute),
        0x6C => instr(Jmp, Indirect),
        0x20 => instr(Jsr, Absolute),
        0x60 => instr(Rts, Implied),
        0x40 => instr(Rti, Implied),

        _ => None,
    }
}
