use log::trace;

use crate::arch::arm::writer::{Reg, Shift, ShiftKind, COND_AL};
use crate::error::DecodeError;

pub const INSN_SIZE: usize = 4;

/// Condition field of the unconditional instruction space (`blx #imm`, `pld`, ...).
pub const COND_UNCONDITIONAL: u32 = 0xF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsnId {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
    Ldr,
    Ldrb,
    Str,
    Strb,
    Push,
    Pop,
    Ldm,
    Stm,
    B,
    Bl,
    Blx,
    Bx,
    Other,
}

/// Data-processing opcodes, indexed by bits 24..21.
const DP_OPCODES: [InsnId; 16] = [
    InsnId::And,
    InsnId::Eor,
    InsnId::Sub,
    InsnId::Rsb,
    InsnId::Add,
    InsnId::Adc,
    InsnId::Sbc,
    InsnId::Rsc,
    InsnId::Tst,
    InsnId::Teq,
    InsnId::Cmp,
    InsnId::Cmn,
    InsnId::Orr,
    InsnId::Mov,
    InsnId::Bic,
    InsnId::Mvn,
];

impl InsnId {
    pub fn is_data_processing(self) -> bool {
        DP_OPCODES.contains(&self)
    }

    /// Data-processing forms without a destination register.
    pub fn is_compare(self) -> bool {
        matches!(self, InsnId::Tst | InsnId::Teq | InsnId::Cmp | InsnId::Cmn)
    }

    pub fn is_branch(self) -> bool {
        matches!(self, InsnId::B | InsnId::Bl | InsnId::Blx | InsnId::Bx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOperand {
    pub base: Reg,
    pub index: Option<Reg>,
    pub shift: Option<Shift>,
    /// Signed immediate offset; zero for register offsets.
    pub disp: i32,
    /// Register offset is subtracted from the base.
    pub subtract: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg { reg: Reg, shift: Option<Shift> },
    /// Immediate value, already rotated. For immediate branches this is the
    /// absolute target address.
    Imm(u32),
    Mem(MemOperand),
    /// Block-transfer register list, one bit per register.
    RegList(u16),
}

impl Operand {
    fn reg(reg: Reg) -> Operand {
        Operand::Reg { reg, shift: None }
    }

    fn reads_pc(&self) -> bool {
        let shift_reads_pc = |shift: &Option<Shift>| matches!(shift, Some(Shift::Reg(_, Reg::PC)));
        match self {
            Operand::Reg { reg, shift } => *reg == Reg::PC || shift_reads_pc(shift),
            Operand::Imm(_) => false,
            Operand::Mem(m) => {
                m.base == Reg::PC || m.index == Some(Reg::PC) || shift_reads_pc(&m.shift)
            }
            Operand::RegList(list) => list & Reg::PC.mask() != 0,
        }
    }
}

/// One decoded A32 instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmInsn {
    pub id: InsnId,
    pub address: u32,
    pub bytes: [u8; INSN_SIZE],
    pub cond: u32,
    /// `S` bit of data-processing instructions.
    pub sets_flags: bool,
    /// Base register is updated (pre-indexed `!`, post-indexed, or `ldm`/`stm` `!`).
    pub writeback: bool,
    pub post_index: bool,
    pub operands: Vec<Operand>,
}

impl ArmInsn {
    pub fn word(&self) -> u32 {
        u32::from_le_bytes(self.bytes)
    }

    pub fn size(&self) -> usize {
        INSN_SIZE
    }

    pub fn is_conditional(&self) -> bool {
        self.cond != COND_AL && self.cond != COND_UNCONDITIONAL
    }

    /// Register written by a data-processing result or a single load.
    pub fn dest(&self) -> Option<Reg> {
        let has_dest = match self.id {
            id if id.is_data_processing() => !id.is_compare(),
            InsnId::Ldr | InsnId::Ldrb => true,
            _ => false,
        };
        match self.operands.first() {
            Some(Operand::Reg { reg, .. }) if has_dest => Some(*reg),
            _ => None,
        }
    }

    /// Immediate branch target (`b`, `bl`, `blx #imm`), Thumb bit not included.
    pub fn branch_target(&self) -> Option<u32> {
        match (self.id, self.operands.first()) {
            (InsnId::B | InsnId::Bl | InsnId::Blx, Some(Operand::Imm(target))) => Some(*target),
            _ => None,
        }
    }

    /// True when some source operand observes the program counter.
    ///
    /// Destinations are not sources: `mov pc, lr` and `pop {pc}` do not read PC.
    pub fn reads_pc(&self) -> bool {
        if self.branch_target().is_some() {
            return true;
        }
        let sources = if self.dest().is_some() {
            &self.operands[1..]
        } else {
            &self.operands[..]
        };
        // Only stores read their register list.
        sources.iter().any(|op| match op {
            Operand::RegList(_) => {
                matches!(self.id, InsnId::Push | InsnId::Stm) && op.reads_pc()
            }
            _ => op.reads_pc(),
        })
    }

    pub fn writes_pc(&self) -> bool {
        if self.id.is_branch() || self.dest() == Some(Reg::PC) {
            return true;
        }
        matches!(self.id, InsnId::Pop | InsnId::Ldm)
            && self
                .operands
                .iter()
                .any(|op| matches!(op, Operand::RegList(list) if list & Reg::PC.mask() != 0))
    }

    /// Control never falls through to the next instruction.
    pub fn ends_flow(&self) -> bool {
        if self.cond != COND_AL {
            return false;
        }
        match self.id {
            InsnId::Bl | InsnId::Blx => false,
            _ => self.writes_pc(),
        }
    }
}

/// Source of decoded instructions for the relocator.
pub trait Decoder {
    /// Decode the instruction at the start of `code`, which executes at `address`.
    fn decode(&self, code: &[u8], address: u32) -> Result<ArmInsn, DecodeError>;
}

/// Decoder for the A32 classes the relocator has to reason about.
///
/// Instructions outside those classes come back as [`InsnId::Other`]; extra
/// and coprocessor load/stores keep their base register so a PC base is
/// still visible.
#[derive(Debug, Default, Clone, Copy)]
pub struct A32Decoder;

impl Decoder for A32Decoder {
    fn decode(&self, code: &[u8], address: u32) -> Result<ArmInsn, DecodeError> {
        let Some(bytes) = code
            .get(..INSN_SIZE)
            .and_then(|b| <[u8; INSN_SIZE]>::try_from(b).ok())
        else {
            return Err(DecodeError::Truncated {
                address,
                available: code.len(),
            });
        };
        let insn = decode_word(u32::from_le_bytes(bytes), address)?;
        trace!("decoded {:#x}: {:#010x} {:?}", address, insn.word(), insn.id);
        Ok(insn)
    }
}

fn bit(word: u32, n: u32) -> bool {
    (word >> n) & 1 != 0
}

fn reg_at(word: u32, lsb: u32) -> Reg {
    Reg::from_index(word >> lsb)
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Decode a register operand's shift field (bits 11..4).
fn decode_shift(word: u32) -> Option<Shift> {
    let kind = ShiftKind::from_bits(word >> 5);
    if bit(word, 4) {
        return Some(Shift::Reg(kind, reg_at(word, 8)));
    }
    let amount = ((word >> 7) & 0x1F) as u8;
    match (kind, amount) {
        (ShiftKind::Lsl, 0) => None,
        (ShiftKind::Ror, 0) => Some(Shift::Rrx),
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => Some(Shift::Imm(kind, 32)),
        _ => Some(Shift::Imm(kind, amount)),
    }
}

/// Decode one little-endian A32 word executing at `address`.
pub fn decode_word(word: u32, address: u32) -> Result<ArmInsn, DecodeError> {
    // Permanently undefined space (UDF and its conditional aliases).
    if word & 0x0FF0_00F0 == 0x07F0_00F0 {
        return Err(DecodeError::Undefined { address, word });
    }

    let mut insn = ArmInsn {
        id: InsnId::Other,
        address,
        bytes: word.to_le_bytes(),
        cond: word >> 28,
        sets_flags: false,
        writeback: false,
        post_index: false,
        operands: Vec::new(),
    };

    if insn.cond == COND_UNCONDITIONAL {
        if (word >> 25) & 0x7 == 0b101 {
            // BLX #imm: H supplies bit 1 of the Thumb target.
            let offset = (sign_extend(word & 0x00FF_FFFF, 24) << 2) | ((word >> 23) & 0x2) as i32;
            insn.id = InsnId::Blx;
            insn.operands.push(Operand::Imm(branch_base(address).wrapping_add_signed(offset)));
        }
        return Ok(insn);
    }

    match (word >> 25) & 0x7 {
        0b000 | 0b001 => decode_data_processing(word, &mut insn),
        0b010 => decode_single_transfer(word, &mut insn),
        0b011 if !bit(word, 4) => decode_single_transfer(word, &mut insn),
        0b100 => decode_block_transfer(word, &mut insn),
        0b101 => {
            let offset = sign_extend(word & 0x00FF_FFFF, 24) << 2;
            insn.id = if bit(word, 24) { InsnId::Bl } else { InsnId::B };
            insn.operands.push(Operand::Imm(branch_base(address).wrapping_add_signed(offset)));
        }
        0b110 => {
            // LDC/STC/VLDR/VSTR: only the base matters to the relocator.
            let imm = ((word & 0xFF) << 2) as i32;
            insn.operands.push(Operand::Mem(MemOperand {
                base: reg_at(word, 16),
                index: None,
                shift: None,
                disp: if bit(word, 23) { imm } else { -imm },
                subtract: false,
            }));
        }
        // Media instructions, coprocessor data processing, SVC.
        _ => {}
    }
    Ok(insn)
}

/// PC as read by data-processing and load operands.
fn branch_base(address: u32) -> u32 {
    address.wrapping_add(8)
}

fn decode_data_processing(word: u32, insn: &mut ArmInsn) {
    let imm = bit(word, 25);
    let opcode = (word >> 21) & 0xF;
    let s = bit(word, 20);

    if !imm && word & 0x90 == 0x90 {
        if (word >> 5) & 0x3 != 0 {
            // LDRH/STRH/LDRSB/LDRSH/LDRD/STRD
            let index = (!bit(word, 22)).then(|| reg_at(word, 0));
            let imm8 = (((word >> 4) & 0xF0) | (word & 0xF)) as i32;
            insn.operands.push(Operand::Mem(MemOperand {
                base: reg_at(word, 16),
                index,
                shift: None,
                disp: match (index, bit(word, 23)) {
                    (Some(_), _) => 0,
                    (None, true) => imm8,
                    (None, false) => -imm8,
                },
                subtract: index.is_some() && !bit(word, 23),
            }));
        }
        // Multiplies and swaps stay opaque.
        return;
    }

    // TST/TEQ/CMP/CMN without S encode the miscellaneous space.
    if opcode & 0b1100 == 0b1000 && !s {
        if !imm {
            match word & 0x0FFF_FFF0 {
                0x012F_FF10 => insn.id = InsnId::Bx,
                0x012F_FF30 => insn.id = InsnId::Blx,
                _ => return,
            }
            insn.operands.push(Operand::reg(reg_at(word, 0)));
        }
        return;
    }

    insn.id = DP_OPCODES[opcode as usize];
    insn.sets_flags = s;

    let op2 = if imm {
        let rotate = ((word >> 8) & 0xF) * 2;
        Operand::Imm((word & 0xFF).rotate_right(rotate))
    } else {
        Operand::Reg {
            reg: reg_at(word, 0),
            shift: decode_shift(word),
        }
    };
    let rn = Operand::reg(reg_at(word, 16));
    let rd = Operand::reg(reg_at(word, 12));

    insn.operands = match insn.id {
        id if id.is_compare() => vec![rn, op2],
        InsnId::Mov | InsnId::Mvn => vec![rd, op2],
        _ => vec![rd, rn, op2],
    };
}

fn decode_single_transfer(word: u32, insn: &mut ArmInsn) {
    let pre_index = bit(word, 24);
    let add = bit(word, 23);

    insn.id = match (bit(word, 20), bit(word, 22)) {
        (true, false) => InsnId::Ldr,
        (true, true) => InsnId::Ldrb,
        (false, false) => InsnId::Str,
        (false, true) => InsnId::Strb,
    };
    insn.post_index = !pre_index;
    insn.writeback = !pre_index || bit(word, 21);

    let mem = if bit(word, 25) {
        MemOperand {
            base: reg_at(word, 16),
            index: Some(reg_at(word, 0)),
            shift: decode_shift(word),
            disp: 0,
            subtract: !add,
        }
    } else {
        let imm12 = (word & 0xFFF) as i32;
        MemOperand {
            base: reg_at(word, 16),
            index: None,
            shift: None,
            disp: if add { imm12 } else { -imm12 },
            subtract: false,
        }
    };
    insn.operands = vec![Operand::reg(reg_at(word, 12)), Operand::Mem(mem)];
}

fn decode_block_transfer(word: u32, insn: &mut ArmInsn) {
    let pre_index = bit(word, 24);
    let up = bit(word, 23);
    let user_regs = bit(word, 22);
    let writeback = bit(word, 21);
    let load = bit(word, 20);
    let base = reg_at(word, 16);
    let list = Operand::RegList((word & 0xFFFF) as u16);

    insn.writeback = writeback;
    let stack = base == Reg::SP && writeback && !user_regs;
    insn.id = match (load, pre_index, up) {
        (false, true, false) if stack => InsnId::Push,
        (true, false, true) if stack => InsnId::Pop,
        (true, ..) => InsnId::Ldm,
        (false, ..) => InsnId::Stm,
    };
    insn.operands = match insn.id {
        InsnId::Push | InsnId::Pop => vec![list],
        _ => vec![Operand::reg(base), list],
    };
}
