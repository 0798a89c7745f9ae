use log::debug;

use crate::error::EncodeError;

/// Condition field value for "always".
pub const COND_AL: u32 = 0xE;

const DP_SUB: u32 = 0x2;
const DP_RSB: u32 = 0x3;
const DP_ADD: u32 = 0x4;
const DP_MOV: u32 = 0xD;

const LDR_STR_U_BIT: u32 = 1 << 23;
const MAX_LDR_OFFSET: u32 = 0xFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    SP = 13,
    LR = 14,
    PC = 15,
}

impl Reg {
    pub const FP: Reg = Reg::R11;
    pub const IP: Reg = Reg::R12;

    /// Register named by the low four bits of `field`.
    pub fn from_index(field: u32) -> Reg {
        match field & 0xF {
            0 => Reg::R0,
            1 => Reg::R1,
            2 => Reg::R2,
            3 => Reg::R3,
            4 => Reg::R4,
            5 => Reg::R5,
            6 => Reg::R6,
            7 => Reg::R7,
            8 => Reg::R8,
            9 => Reg::R9,
            10 => Reg::R10,
            11 => Reg::R11,
            12 => Reg::R12,
            13 => Reg::SP,
            14 => Reg::LR,
            _ => Reg::PC,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    /// Bit for this register in a block-transfer register list.
    pub fn mask(self) -> u16 {
        1 << (self as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    pub fn from_bits(bits: u32) -> ShiftKind {
        match bits & 0x3 {
            0 => ShiftKind::Lsl,
            1 => ShiftKind::Lsr,
            2 => ShiftKind::Asr,
            _ => ShiftKind::Ror,
        }
    }

    fn bits(self) -> u32 {
        match self {
            ShiftKind::Lsl => 0,
            ShiftKind::Lsr => 1,
            ShiftKind::Asr => 2,
            ShiftKind::Ror => 3,
        }
    }
}

/// Barrel-shifter operation applied to a register operand.
///
/// `lsl #0` is never represented: a register with no shift carries `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// Shift by a constant in `1..=32` (32 only for `lsr`/`asr`).
    Imm(ShiftKind, u8),
    /// Rotate right by one through the carry flag.
    Rrx,
    /// Shift by the bottom byte of a register.
    Reg(ShiftKind, Reg),
}

impl Shift {
    /// Evaluate the shift on a known value. `None` when the result depends on
    /// runtime state (carry flag or a register amount).
    pub fn apply(self, value: u32) -> Option<u32> {
        match self {
            Shift::Imm(ShiftKind::Lsl, n) => value.checked_shl(u32::from(n)),
            Shift::Imm(ShiftKind::Lsr, n) => Some(value.checked_shr(u32::from(n)).unwrap_or(0)),
            Shift::Imm(ShiftKind::Asr, n) => Some(((value as i32) >> u32::from(n).min(31)) as u32),
            Shift::Imm(ShiftKind::Ror, n) => Some(value.rotate_right(u32::from(n))),
            Shift::Rrx | Shift::Reg(..) => None,
        }
    }

    /// Bits 11..4 of a data-processing register operand.
    fn encode(self) -> u32 {
        match self {
            Shift::Imm(kind, amount) => {
                let valid = match kind {
                    ShiftKind::Lsl | ShiftKind::Ror => (1..=31).contains(&amount),
                    ShiftKind::Lsr | ShiftKind::Asr => (1..=32).contains(&amount),
                };
                if !valid {
                    panic!("unsupported shift amount: {kind:?} #{amount}");
                }
                ((u32::from(amount) & 0x1F) << 7) | (kind.bits() << 5)
            }
            Shift::Rrx => ShiftKind::Ror.bits() << 5,
            Shift::Reg(kind, rs) => (rs.index() << 8) | (kind.bits() << 5) | 0x10,
        }
    }
}

/// Encode `value` as an A32 modified immediate (8 bits rotated right by an
/// even amount). Returns `(rotate, imm8)` with the smallest rotation.
pub fn encode_rotated_imm(value: u32) -> Option<(u32, u32)> {
    (0..16u32).find_map(|rotate| {
        let imm8 = value.rotate_left(rotate * 2);
        (imm8 <= 0xFF).then_some((rotate, imm8))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingLiteral {
    /// Index of the `ldr` word that loads this literal.
    insn_index: usize,
    value: u32,
}

/// Append-only A32 code emitter with a deferred literal pool.
///
/// Synthesised instructions take their condition field from [`ArmWriter::cond`];
/// words passed to [`ArmWriter::put_instruction`] are copied untouched.
#[derive(Debug, Clone)]
pub struct ArmWriter {
    base_pc: u32,
    code: Vec<u32>,
    literals: Vec<PendingLiteral>,
    cond: u32,
    sealed: bool,
}

impl ArmWriter {
    pub fn new(pc: u32) -> Self {
        Self {
            base_pc: pc,
            code: Vec::new(),
            literals: Vec::new(),
            cond: COND_AL,
            sealed: false,
        }
    }

    /// Discard everything and start a new segment at `pc`.
    pub fn reset(&mut self, pc: u32) {
        self.base_pc = pc;
        self.code.clear();
        self.literals.clear();
        self.cond = COND_AL;
        self.sealed = false;
    }

    /// Address the next emitted word will execute from.
    pub fn pc(&self) -> u32 {
        self.base_pc.wrapping_add(self.offset() as u32)
    }

    pub fn base_pc(&self) -> u32 {
        self.base_pc
    }

    /// Bytes emitted so far (literals count once flushed).
    pub fn offset(&self) -> usize {
        self.code.len() * 4
    }

    pub fn code(&self) -> &[u32] {
        &self.code
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.code.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Copy the emitted block into `dst` as little-endian words.
    pub fn write_into(&self, dst: &mut [u8]) -> Result<usize, EncodeError> {
        let needed = self.offset();
        if dst.len() < needed {
            return Err(EncodeError::BufferTooSmall {
                needed,
                available: dst.len(),
            });
        }
        for (chunk, word) in dst.chunks_exact_mut(4).zip(&self.code) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(needed)
    }

    pub fn pending_literals(&self) -> usize {
        self.literals.len()
    }

    /// True once a flush has placed literals; no further emission is allowed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn cond(&self) -> u32 {
        self.cond
    }

    pub fn set_cond(&mut self, cond: u32) {
        if cond > COND_AL {
            panic!("not a condition code: {cond:#x}");
        }
        self.cond = cond;
    }

    fn put_u32(&mut self, insn: u32) {
        if self.sealed {
            panic!("emission after the literal pool was flushed");
        }
        self.code.push(insn);
    }

    fn put_cond(&mut self, insn: u32) {
        self.put_u32((self.cond << 28) | (insn & 0x0FFF_FFFF));
    }

    /// Emit a raw instruction word, condition field included.
    pub fn put_instruction(&mut self, insn: u32) {
        self.put_u32(insn);
    }

    pub fn put_mov_reg_reg(&mut self, dst: Reg, src: Reg) {
        // MOV Rd, Rm
        self.put_cond((DP_MOV << 21) | (dst.index() << 12) | src.index());
    }

    pub fn put_mov_reg_reg_shift(&mut self, dst: Reg, src: Reg, shift: Shift) {
        // MOV Rd, Rm, <shift>
        self.put_cond((DP_MOV << 21) | (dst.index() << 12) | shift.encode() | src.index());
    }

    fn put_dp_imm(&mut self, opcode: u32, dst: Reg, src: Reg, rotate: u32, imm8: u32) {
        // cond|001|opcode|0|Rn|Rd|rotate|imm8
        self.put_cond(
            0x0200_0000
                | (opcode << 21)
                | (src.index() << 16)
                | (dst.index() << 12)
                | ((rotate & 0xF) << 8)
                | (imm8 & 0xFF),
        );
    }

    fn put_dp_reg_reg_imm(&mut self, opcode: u32, dst: Reg, src: Reg, imm: u32) {
        let Some((rotate, imm8)) = encode_rotated_imm(imm) else {
            panic!("immediate has no rotated encoding: {imm:#x}");
        };
        self.put_dp_imm(opcode, dst, src, rotate, imm8);
    }

    pub fn put_add_reg_reg_imm(&mut self, dst: Reg, src: Reg, imm: u32) {
        self.put_dp_reg_reg_imm(DP_ADD, dst, src, imm);
    }

    pub fn put_sub_reg_reg_imm(&mut self, dst: Reg, src: Reg, imm: u32) {
        self.put_dp_reg_reg_imm(DP_SUB, dst, src, imm);
    }

    pub fn put_rsb_reg_reg_imm(&mut self, dst: Reg, src: Reg, imm: u32) {
        self.put_dp_reg_reg_imm(DP_RSB, dst, src, imm);
    }

    /// `reg += value`, one `add` per non-zero byte, most significant first.
    pub fn put_add_reg_u32(&mut self, reg: Reg, value: u32) {
        self.put_dp_reg_u32(DP_ADD, reg, value);
    }

    /// `reg -= value`, one `sub` per non-zero byte, most significant first.
    pub fn put_sub_reg_u32(&mut self, reg: Reg, value: u32) {
        self.put_dp_reg_u32(DP_SUB, reg, value);
    }

    fn put_dp_reg_u32(&mut self, opcode: u32, reg: Reg, value: u32) {
        let mut emitted = false;
        for byte in (0..4u32).rev() {
            let imm8 = (value >> (byte * 8)) & 0xFF;
            if imm8 == 0 {
                continue;
            }
            // Byte n sits at bit 8n, i.e. imm8 ROR (32 - 8n).
            let rotate = (16 - byte * 4) % 16;
            self.put_dp_imm(opcode, reg, reg, rotate, imm8);
            emitted = true;
        }
        if !emitted {
            self.put_dp_imm(opcode, reg, reg, 0, 0);
        }
    }

    fn put_transfer_imm(&mut self, base_op: u32, rt: Reg, rn: Reg, offset: i32) {
        let magnitude = offset.unsigned_abs();
        if magnitude > MAX_LDR_OFFSET {
            panic!("unsupported load/store offset: {offset}");
        }
        let u = if offset >= 0 { LDR_STR_U_BIT } else { 0 };
        self.put_cond(base_op | u | (rn.index() << 16) | (rt.index() << 12) | magnitude);
    }

    /// LDR Rt, [Rn, #offset]
    pub fn put_ldr_reg_reg_offset(&mut self, rt: Reg, rn: Reg, offset: i32) {
        self.put_transfer_imm(0x0510_0000, rt, rn, offset);
    }

    /// LDRB Rt, [Rn, #offset]
    pub fn put_ldrb_reg_reg_offset(&mut self, rt: Reg, rn: Reg, offset: i32) {
        self.put_transfer_imm(0x0550_0000, rt, rn, offset);
    }

    /// STR Rt, [Rn, #offset]
    pub fn put_str_reg_reg_offset(&mut self, rt: Reg, rn: Reg, offset: i32) {
        self.put_transfer_imm(0x0500_0000, rt, rn, offset);
    }

    /// `LDR Rt, [PC, #disp]` loading `value` from the literal pool.
    ///
    /// The displacement is a placeholder until [`ArmWriter::flush`] places
    /// the literal after the last instruction.
    pub fn put_ldr_reg_u32(&mut self, rt: Reg, value: u32) {
        let insn_index = self.code.len();
        self.put_cond(0x051F_0000 | (rt.index() << 12));
        self.literals.push(PendingLiteral { insn_index, value });
    }

    /// Absolute jump through the literal pool: `LDR PC, =target`.
    pub fn put_branch_address(&mut self, target: u32) {
        self.put_ldr_reg_u32(Reg::PC, target);
    }

    fn reg_list(regs: &[Reg]) -> u32 {
        if regs.is_empty() {
            panic!("empty register list");
        }
        regs.iter().fold(0u32, |mask, r| mask | u32::from(r.mask()))
    }

    /// PUSH {regs} (STMDB SP!, {regs})
    pub fn put_push_regs(&mut self, regs: &[Reg]) {
        let list = Self::reg_list(regs);
        self.put_cond(0x092D_0000 | list);
    }

    /// POP {regs} (LDMIA SP!, {regs})
    pub fn put_pop_regs(&mut self, regs: &[Reg]) {
        let list = Self::reg_list(regs);
        self.put_cond(0x08BD_0000 | list);
    }

    /// Place pending literals after the last instruction and patch every
    /// referencing `ldr` with its final displacement.
    ///
    /// A no-op when nothing is pending. After literals are placed the writer
    /// is sealed until [`ArmWriter::reset`].
    pub fn flush(&mut self) -> Result<(), EncodeError> {
        if self.literals.is_empty() {
            return Ok(());
        }

        let pool_start = self.code.len();
        for (slot, lit) in self.literals.iter().enumerate() {
            let distance = Self::literal_distance(lit.insn_index, pool_start + slot);
            if distance.unsigned_abs() > u64::from(MAX_LDR_OFFSET) {
                return Err(EncodeError::LiteralOutOfRange {
                    offset: lit.insn_index * 4,
                    distance,
                });
            }
        }

        let literals = std::mem::take(&mut self.literals);
        for (slot, lit) in literals.iter().enumerate() {
            let distance = Self::literal_distance(lit.insn_index, pool_start + slot);
            let u = if distance >= 0 { LDR_STR_U_BIT } else { 0 };
            let insn = &mut self.code[lit.insn_index];
            let imm12 = distance.unsigned_abs() as u32;
            *insn = (*insn & !(LDR_STR_U_BIT | MAX_LDR_OFFSET)) | u | imm12;
            self.code.push(lit.value);
        }
        self.sealed = true;

        debug!(
            "flushed {} literal(s) at {:#x}",
            literals.len(),
            self.base_pc.wrapping_add((pool_start * 4) as u32)
        );
        Ok(())
    }

    /// Displacement an `ldr` at word `insn` needs to reach word `literal`
    /// (the base reads as the instruction address + 8).
    fn literal_distance(insn: usize, literal: usize) -> i64 {
        (literal as i64 * 4) - (insn as i64 * 4 + 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_mov_ip_sp() {
        let mut w = ArmWriter::new(0x1000);
        w.put_mov_reg_reg(Reg::IP, Reg::SP);
        assert_eq!(w.code(), &[0xe1a0c00d]);
        assert_eq!(w.pc(), 0x1004);
    }

    #[test]
    fn encode_mov_shifts() {
        let mut w = ArmWriter::new(0x1000);
        w.put_mov_reg_reg_shift(Reg::R3, Reg::R3, Shift::Imm(ShiftKind::Lsl, 2));
        w.put_mov_reg_reg_shift(Reg::R0, Reg::R1, Shift::Imm(ShiftKind::Lsr, 32));
        w.put_mov_reg_reg_shift(Reg::R0, Reg::R1, Shift::Rrx);
        w.put_mov_reg_reg_shift(Reg::R0, Reg::R1, Shift::Reg(ShiftKind::Asr, Reg::R2));
        assert_eq!(w.code()[0], 0xe1a03103, "lsl r3, r3, #2");
        assert_eq!(w.code()[1], 0xe1a00021, "lsr r0, r1, #32");
        assert_eq!(w.code()[2], 0xe1a00061, "rrx r0, r1");
        assert_eq!(w.code()[3], 0xe1a00251, "asr r0, r1, r2");
    }

    #[test]
    #[should_panic(expected = "unsupported shift amount")]
    fn lsl_by_32_is_rejected() {
        let mut w = ArmWriter::new(0);
        w.put_mov_reg_reg_shift(Reg::R0, Reg::R1, Shift::Imm(ShiftKind::Lsl, 32));
    }

    #[test]
    fn encode_add_sub_rsb_imm() {
        let mut w = ArmWriter::new(0x1000);
        w.put_add_reg_reg_imm(Reg::R3, Reg::R3, 0x28);
        w.put_sub_reg_reg_imm(Reg::R3, Reg::R3, 0x28);
        w.put_rsb_reg_reg_imm(Reg::R1, Reg::R1, 0);
        w.put_add_reg_reg_imm(Reg::SP, Reg::SP, 0x3fc);
        assert_eq!(w.code()[0], 0xe2833028);
        assert_eq!(w.code()[1], 0xe2433028);
        assert_eq!(w.code()[2], 0xe2611000);
        // 0xff ror 30
        assert_eq!(w.code()[3], 0xe28ddfff);
    }

    #[test]
    #[should_panic(expected = "no rotated encoding")]
    fn add_imm_without_encoding_panics() {
        let mut w = ArmWriter::new(0);
        w.put_add_reg_reg_imm(Reg::R0, Reg::R0, 0x101);
    }

    #[test]
    fn rotated_imm_search() {
        assert_eq!(encode_rotated_imm(0xff), Some((0, 0xff)));
        assert_eq!(encode_rotated_imm(0x300), Some((12, 0x03)));
        assert_eq!(encode_rotated_imm(0xf000_000f), Some((2, 0xff)));
        assert_eq!(encode_rotated_imm(0x101), None);
    }

    #[test]
    fn add_u32_splits_into_byte_chunks() {
        let mut w = ArmWriter::new(0x1000);
        w.put_add_reg_u32(Reg::R0, 0x1234_5678);
        assert_eq!(
            w.code(),
            &[
                0xe2800412, // add r0, r0, #0x12000000
                0xe2800834, // add r0, r0, #0x340000
                0xe2800c56, // add r0, r0, #0x5600
                0xe2800078, // add r0, r0, #0x78
            ]
        );
    }

    #[test]
    fn add_u32_skips_zero_bytes_but_emits_at_least_one() {
        let mut w = ArmWriter::new(0x1000);
        w.put_add_reg_u32(Reg::R3, 0x808);
        w.put_sub_reg_u32(Reg::R3, 0);
        assert_eq!(w.code(), &[0xe2833c08, 0xe2833008, 0xe2433000]);
    }

    #[test]
    fn encode_ldr_str_offsets() {
        let mut w = ArmWriter::new(0x1000);
        w.put_ldr_reg_reg_offset(Reg::R3, Reg::R3, 0);
        w.put_ldr_reg_reg_offset(Reg::R0, Reg::R1, -4);
        w.put_ldrb_reg_reg_offset(Reg::R2, Reg::R2, 0);
        w.put_str_reg_reg_offset(Reg::R0, Reg::SP, 4);
        assert_eq!(w.code()[0], 0xe5933000, "ldr r3, [r3]");
        assert_eq!(w.code()[1], 0xe5110004, "ldr r0, [r1, #-4]");
        assert_eq!(w.code()[2], 0xe5d22000, "ldrb r2, [r2]");
        assert_eq!(w.code()[3], 0xe58d0004, "str r0, [sp, #4]");
    }

    #[test]
    #[should_panic(expected = "unsupported load/store offset")]
    fn ldr_offset_out_of_range_panics() {
        let mut w = ArmWriter::new(0);
        w.put_ldr_reg_reg_offset(Reg::R0, Reg::R1, 0x1000);
    }

    #[test]
    fn encode_push_pop() {
        let mut w = ArmWriter::new(0x1000);
        w.put_push_regs(&[Reg::R0, Reg::PC]);
        w.put_pop_regs(&[Reg::R0, Reg::PC]);
        w.put_push_regs(&[Reg::R4, Reg::R5]);
        assert_eq!(w.code(), &[0xe92d8001, 0xe8bd8001, 0xe92d0030]);
    }

    #[test]
    fn condition_applies_to_synthesised_words_only() {
        let mut w = ArmWriter::new(0x1000);
        w.set_cond(0x1);
        assert_eq!(w.cond(), 0x1);
        w.put_mov_reg_reg(Reg::R0, Reg::R1);
        w.put_instruction(0xe1a00000);
        w.set_cond(COND_AL);
        w.put_mov_reg_reg(Reg::R0, Reg::R1);
        assert_eq!(w.code(), &[0x11a00001, 0xe1a00000, 0xe1a00001]);
    }

    #[test]
    fn flush_places_literals_in_request_order() {
        let mut w = ArmWriter::new(1024);
        w.put_ldr_reg_u32(Reg::LR, 0x1111_1111);
        w.put_branch_address(0x2222_2222);
        assert_eq!(w.pending_literals(), 2);
        w.flush().unwrap();
        assert_eq!(w.pending_literals(), 0);
        assert_eq!(
            w.code(),
            &[
                0xe59fe000, // ldr lr, [pc, #0]
                0xe59ff000, // ldr pc, [pc, #0]
                0x1111_1111,
                0x2222_2222,
            ]
        );
        assert_eq!(w.pc(), 1024 + 16);
    }

    #[test]
    fn flush_encodes_negative_displacement() {
        let mut w = ArmWriter::new(0);
        w.put_ldr_reg_u32(Reg::LR, 0xdead_beef);
        w.flush().unwrap();
        assert_eq!(w.code(), &[0xe51fe004, 0xdead_beef]);
    }

    #[test]
    fn flush_without_literals_is_a_noop() {
        let mut w = ArmWriter::new(0);
        w.put_mov_reg_reg(Reg::R0, Reg::R1);
        w.flush().unwrap();
        assert!(!w.is_sealed());
        w.put_mov_reg_reg(Reg::R1, Reg::R0);
        assert_eq!(w.code().len(), 2);
    }

    #[test]
    fn flush_rejects_unreachable_literal() {
        let mut w = ArmWriter::new(0);
        w.put_ldr_reg_u32(Reg::R0, 42);
        for _ in 0..1100 {
            w.put_instruction(0xe1a00000);
        }
        let err = w.flush().unwrap_err();
        assert_eq!(
            err,
            EncodeError::LiteralOutOfRange {
                offset: 0,
                distance: 1101 * 4 - 8,
            }
        );
        // Nothing was placed.
        assert_eq!(w.code().len(), 1101);
        assert_eq!(w.pending_literals(), 1);
    }

    #[test]
    #[should_panic(expected = "emission after the literal pool was flushed")]
    fn emission_after_flush_panics() {
        let mut w = ArmWriter::new(0);
        w.put_ldr_reg_u32(Reg::R0, 42);
        w.flush().unwrap();
        w.put_mov_reg_reg(Reg::R0, Reg::R1);
    }

    #[test]
    fn reset_starts_a_new_segment() {
        let mut w = ArmWriter::new(0);
        w.put_ldr_reg_u32(Reg::R0, 42);
        w.flush().unwrap();
        w.reset(0x4000);
        w.put_mov_reg_reg(Reg::R0, Reg::R1);
        assert_eq!(w.base_pc(), 0x4000);
        assert_eq!(w.code(), &[0xe1a00001]);
    }

    #[test]
    fn write_into_copies_little_endian_words() {
        let mut w = ArmWriter::new(0);
        w.put_mov_reg_reg(Reg::IP, Reg::SP);
        let mut buf = [0u8; 8];
        assert_eq!(w.write_into(&mut buf).unwrap(), 4);
        assert_eq!(buf, [0x0d, 0xc0, 0xa0, 0xe1, 0, 0, 0, 0]);
        assert_eq!(w.to_bytes(), buf[..4].to_vec());

        let mut small = [0u8; 2];
        assert_eq!(
            w.write_into(&mut small),
            Err(EncodeError::BufferTooSmall {
                needed: 4,
                available: 2
            })
        );
    }

    #[test]
    fn shift_apply_matches_barrel_shifter() {
        assert_eq!(Shift::Imm(ShiftKind::Lsl, 2).apply(0x808), Some(0x2020));
        assert_eq!(Shift::Imm(ShiftKind::Lsr, 32).apply(0x8000_0000), Some(0));
        assert_eq!(Shift::Imm(ShiftKind::Asr, 32).apply(0x8000_0000), Some(0xffff_ffff));
        assert_eq!(Shift::Imm(ShiftKind::Ror, 8).apply(0x12), Some(0x1200_0000));
        assert_eq!(Shift::Rrx.apply(1), None);
    }
}
