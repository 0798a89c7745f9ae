use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::arch::arm::decoder::{
    A32Decoder, ArmInsn, Decoder, InsnId, MemOperand, Operand, COND_UNCONDITIONAL, INSN_SIZE,
};
use crate::arch::arm::writer::{ArmWriter, Reg, Shift, COND_AL};
use crate::error::{RelocError, Result};

/// Worst-case instruction words emitted for one input instruction:
/// `ldr pc, [pc, rm, <shift>]` = push + shift + 4 adds + ldr + str + pop.
pub const MAX_INSN_EXPANSION: usize = 9;

/// Literal words one input instruction can add to the pool (`bl`, `blx`).
pub const MAX_INSN_LITERALS: usize = 2;

/// Bytes to reserve for relocating `n_insns` instructions plus the jump back.
pub fn max_output_size(n_insns: usize) -> usize {
    (n_insns * (MAX_INSN_EXPANSION + MAX_INSN_LITERALS) + 2) * INSN_SIZE
}

/// How the value of a rewritten instruction is rebuilt without reading PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcValue {
    /// `ldr t, =value`
    Const(u32),
    /// `ldr t, =pc` then `add`/`sub` of `imm` in byte chunks.
    PcOffset { pc: u32, imm: u32, subtract: bool },
    /// Move `reg` (shifted, optionally negated) into `t`, then add or
    /// subtract `constant` in byte chunks.
    RegOffset {
        reg: Reg,
        shift: Option<Shift>,
        negate: bool,
        constant: u32,
        subtract: bool,
    },
}

impl PcValue {
    /// Register a PC-destination wrapper computes in; it is saved and
    /// restored by the wrapper's push/pop.
    fn scratch(&self) -> Reg {
        match self {
            PcValue::RegOffset { reg, .. } if *reg != Reg::SP => *reg,
            _ => Reg::R0,
        }
    }

    fn emit(&self, writer: &mut ArmWriter, target: Reg) {
        match *self {
            PcValue::Const(value) => writer.put_ldr_reg_u32(target, value),
            PcValue::PcOffset { pc, imm, subtract } => {
                writer.put_ldr_reg_u32(target, pc);
                if subtract {
                    writer.put_sub_reg_u32(target, imm);
                } else {
                    writer.put_add_reg_u32(target, imm);
                }
            }
            PcValue::RegOffset {
                reg,
                shift,
                negate,
                constant,
                subtract,
            } => {
                match shift {
                    Some(shift) => writer.put_mov_reg_reg_shift(target, reg, shift),
                    None if target != reg => writer.put_mov_reg_reg(target, reg),
                    None => {}
                }
                if negate {
                    writer.put_rsb_reg_reg_imm(target, target, 0);
                }
                if subtract {
                    writer.put_sub_reg_u32(target, constant);
                } else {
                    writer.put_add_reg_u32(target, constant);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadWidth {
    Word,
    Byte,
}

/// What the relocator emits for one input instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Copy the original word.
    Verbatim,
    /// `dest = value` (or `dest = [value]` with `load`). A PC destination is
    /// wrapped in `push {t, pc}` / `str t, [sp, #4]` / `pop {t, pc}`.
    Compute {
        dest: Reg,
        value: PcValue,
        load: Option<LoadWidth>,
    },
    /// `ldr pc, =target`
    Branch { target: u32 },
    /// `ldr lr, =<next output insn>` then `ldr pc, =target`
    BranchLink { target: u32 },
}

fn unsupported(insn: &ArmInsn, reason: &'static str) -> RelocError {
    RelocError::Unsupported {
        address: insn.address,
        reason,
    }
}

/// Value of a register operand that names PC, with its shift applied.
fn shifted_pc(insn: &ArmInsn, pc: u32, shift: Option<Shift>) -> Result<u32> {
    match shift {
        None => Ok(pc),
        Some(shift) => shift
            .apply(pc)
            .ok_or_else(|| unsupported(insn, "pc operand with a runtime-dependent shift")),
    }
}

fn reg_operand(op: Option<&Operand>) -> Option<Reg> {
    match op {
        Some(Operand::Reg { reg, shift: None }) => Some(*reg),
        _ => None,
    }
}

/// Decide how `insn` is relocated.
///
/// Pure function of the decoded operands: an instruction is copied unless
/// one of its sources observes PC, in which case a rewrite is planned or
/// the instruction is rejected.
pub fn classify(insn: &ArmInsn) -> Result<Rewrite> {
    if let Some(target) = insn.branch_target() {
        return Ok(match insn.id {
            InsnId::B => Rewrite::Branch { target },
            InsnId::Bl => Rewrite::BranchLink { target },
            // blx #imm always switches to Thumb.
            _ => Rewrite::BranchLink { target: target | 1 },
        });
    }

    if !insn.reads_pc() {
        return Ok(Rewrite::Verbatim);
    }

    let pc = insn.address.wrapping_add(8);
    let rewrite = match insn.id {
        InsnId::Mov => classify_mov(insn, pc)?,
        InsnId::Add | InsnId::Sub => classify_arith(insn, pc)?,
        InsnId::Ldr | InsnId::Ldrb => classify_load(insn, pc)?,
        _ => return Err(unsupported(insn, "pc is read by an instruction with no rewrite")),
    };

    if let Rewrite::Compute {
        dest: Reg::PC,
        value: PcValue::RegOffset { reg: Reg::SP, .. },
        ..
    } = rewrite
    {
        // The wrapper's push moves sp before it is read.
        return Err(unsupported(insn, "sp operand with a pc destination"));
    }
    Ok(rewrite)
}

fn classify_mov(insn: &ArmInsn, pc: u32) -> Result<Rewrite> {
    if insn.sets_flags {
        return Err(unsupported(insn, "flag-setting move from pc"));
    }
    let (Some(dest), Some(Operand::Reg { reg: Reg::PC, shift })) =
        (insn.dest(), insn.operands.get(1))
    else {
        return Err(unsupported(insn, "pc used as a shift amount"));
    };
    Ok(Rewrite::Compute {
        dest,
        value: PcValue::Const(shifted_pc(insn, pc, *shift)?),
        load: None,
    })
}

fn classify_arith(insn: &ArmInsn, pc: u32) -> Result<Rewrite> {
    if insn.sets_flags {
        return Err(unsupported(insn, "flag-setting arithmetic on pc"));
    }
    let subtract = insn.id == InsnId::Sub;
    let (Some(dest), Some(rn), Some(op2)) = (
        insn.dest(),
        reg_operand(insn.operands.get(1)),
        insn.operands.get(2),
    ) else {
        return Err(unsupported(insn, "malformed data-processing operands"));
    };
    if matches!(op2, Operand::Reg { shift: Some(Shift::Reg(_, Reg::PC)), .. }) {
        return Err(unsupported(insn, "pc used as a shift amount"));
    }

    let value = match (rn, op2) {
        (Reg::PC, Operand::Reg { reg: Reg::PC, shift }) => {
            let rhs = shifted_pc(insn, pc, *shift)?;
            PcValue::Const(if subtract { pc.wrapping_sub(rhs) } else { pc.wrapping_add(rhs) })
        }
        (Reg::PC, Operand::Imm(imm)) => PcValue::PcOffset {
            pc,
            imm: *imm,
            subtract,
        },
        // pc - Rm == -Rm + pc
        (Reg::PC, Operand::Reg { reg, shift }) => PcValue::RegOffset {
            reg: *reg,
            shift: *shift,
            negate: subtract,
            constant: pc,
            subtract: false,
        },
        (rn, Operand::Reg { reg: Reg::PC, shift }) => PcValue::RegOffset {
            reg: rn,
            shift: None,
            negate: false,
            constant: shifted_pc(insn, pc, *shift)?,
            subtract,
        },
        _ => return Err(unsupported(insn, "malformed data-processing operands")),
    };

    Ok(Rewrite::Compute {
        dest,
        value,
        load: None,
    })
}

fn classify_load(insn: &ArmInsn, pc: u32) -> Result<Rewrite> {
    let (Some(dest), Some(Operand::Mem(mem))) = (insn.dest(), insn.operands.get(1)) else {
        return Err(unsupported(insn, "malformed load operands"));
    };
    let MemOperand {
        base,
        index,
        shift,
        disp,
        subtract,
    } = *mem;

    if base != Reg::PC || index == Some(Reg::PC) {
        return Err(unsupported(insn, "pc used as a load index"));
    }
    if insn.writeback || insn.post_index {
        return Err(unsupported(insn, "pc-relative load with writeback"));
    }
    if insn.id == InsnId::Ldrb && dest == Reg::PC {
        return Err(unsupported(insn, "byte load into pc"));
    }
    if matches!(shift, Some(Shift::Reg(..))) {
        return Err(unsupported(insn, "register-shifted load index"));
    }

    let value = match index {
        None => PcValue::PcOffset {
            pc,
            imm: disp.unsigned_abs(),
            subtract: disp < 0,
        },
        Some(reg) => PcValue::RegOffset {
            reg,
            shift,
            negate: subtract,
            constant: pc,
            subtract: false,
        },
    };
    let load = if insn.id == InsnId::Ldrb {
        LoadWidth::Byte
    } else {
        LoadWidth::Word
    };

    Ok(Rewrite::Compute {
        dest,
        value,
        load: Some(load),
    })
}

fn emit_rewrite(rewrite: &Rewrite, insn: &ArmInsn, writer: &mut ArmWriter) {
    match rewrite {
        Rewrite::Verbatim => writer.put_instruction(insn.word()),
        Rewrite::Compute { dest, value, load } => {
            let wrap = *dest == Reg::PC;
            let target = if wrap { value.scratch() } else { *dest };

            if wrap {
                writer.put_push_regs(&[target, Reg::PC]);
            }
            value.emit(writer, target);
            match load {
                Some(LoadWidth::Word) => writer.put_ldr_reg_reg_offset(target, target, 0),
                Some(LoadWidth::Byte) => writer.put_ldrb_reg_reg_offset(target, target, 0),
                None => {}
            }
            if wrap {
                // Overwrite the stacked pc slot; the pop performs the jump.
                writer.put_str_reg_reg_offset(target, Reg::SP, 4);
                writer.put_pop_regs(&[target, Reg::PC]);
            }
        }
        Rewrite::Branch { target } => writer.put_branch_address(*target),
        Rewrite::BranchLink { target } => {
            // Return to the output instruction following `ldr pc`.
            let return_address = writer.pc().wrapping_add(8);
            writer.put_ldr_reg_u32(Reg::LR, return_address);
            writer.put_branch_address(*target);
        }
    }
}

/// Moves A32 instructions from `input` (executing at `input_pc`) into an
/// [`ArmWriter`], rewriting everything whose behaviour depends on PC.
///
/// Instructions are read ahead into a FIFO and written back out in order.
pub struct ArmRelocator<'a, D: Decoder = A32Decoder> {
    input: &'a [u8],
    input_pc: u32,
    input_cur: usize,
    pending: VecDeque<ArmInsn>,
    eob: bool,
    eoi: bool,
    decoder: D,
}

impl<'a> ArmRelocator<'a> {
    pub fn new(input: &'a [u8], input_pc: u32) -> Self {
        Self::with_decoder(input, input_pc, A32Decoder)
    }
}

impl<'a, D: Decoder> ArmRelocator<'a, D> {
    pub fn with_decoder(input: &'a [u8], input_pc: u32, decoder: D) -> Self {
        Self {
            input,
            input_pc,
            input_cur: 0,
            pending: VecDeque::new(),
            eob: false,
            eoi: false,
            decoder,
        }
    }

    pub fn reset(&mut self, input: &'a [u8], input_pc: u32) {
        self.input = input;
        self.input_pc = input_pc;
        self.input_cur = 0;
        self.pending.clear();
        self.eob = false;
        self.eoi = false;
    }

    pub fn input_pc(&self) -> u32 {
        self.input_pc
    }

    /// Bytes consumed from the input so far.
    pub fn input_cur(&self) -> usize {
        self.input_cur
    }

    /// A branch or other PC write has been read.
    pub fn eob(&self) -> bool {
        self.eob
    }

    /// An instruction that never falls through has been read.
    pub fn eoi(&self) -> bool {
        self.eoi
    }

    /// Decode the next input instruction and queue it for writing.
    ///
    /// Returns the total bytes consumed and the queued instruction. Nothing
    /// advances on failure.
    pub fn read_one(&mut self) -> Result<(usize, &ArmInsn)> {
        let address = self.input_pc.wrapping_add(self.input_cur as u32);
        if self.eoi {
            return Err(RelocError::EndOfInput { address });
        }

        let code = self.input.get(self.input_cur..).unwrap_or(&[]);
        let insn = self.decoder.decode(code, address)?;

        if insn.writes_pc() {
            self.eob = true;
        }
        if insn.ends_flow() {
            self.eoi = true;
        }
        self.input_cur += insn.size();
        self.pending.push_back(insn);

        Ok((self.input_cur, &self.pending[self.pending.len() - 1]))
    }

    pub fn peek_next_write_insn(&self) -> Option<&ArmInsn> {
        self.pending.front()
    }

    /// Original address of the next instruction to be written.
    pub fn peek_next_write_source(&self) -> Option<u32> {
        self.pending.front().map(|insn| insn.address)
    }

    /// Drop the next pending instruction without emitting anything.
    pub fn skip_one(&mut self) -> bool {
        self.pending.pop_front().is_some()
    }

    /// Emit the oldest pending instruction.
    ///
    /// `Ok(false)` when nothing is pending. On error the instruction stays
    /// queued and nothing is emitted.
    pub fn write_one(&mut self, writer: &mut ArmWriter) -> Result<bool> {
        let Some(insn) = self.pending.front() else {
            return Ok(false);
        };

        let rewrite = classify(insn)?;
        let start = writer.offset();

        let cond = if insn.cond == COND_UNCONDITIONAL {
            COND_AL
        } else {
            insn.cond
        };
        writer.set_cond(cond);
        emit_rewrite(&rewrite, insn, writer);
        writer.set_cond(COND_AL);

        if rewrite == Rewrite::Verbatim {
            trace!("copied {:#x}: {:#010x}", insn.address, insn.word());
        } else {
            debug!(
                "rewrote {:#x}: {:#010x} ({:?}) into {} word(s) at +{:#x}",
                insn.address,
                insn.word(),
                insn.id,
                (writer.offset() - start) / INSN_SIZE,
                start
            );
        }

        self.pending.pop_front();
        Ok(true)
    }

    /// Emit every pending instruction.
    pub fn write_all(&mut self, writer: &mut ArmWriter) -> Result<usize> {
        let mut written = 0;
        while self.write_one(writer)? {
            written += 1;
        }
        Ok(written)
    }

    /// Read until at least `min_bytes` of input are consumed (or the block
    /// ends), then write everything out. Returns the bytes consumed.
    pub fn relocate_at_least(&mut self, writer: &mut ArmWriter, min_bytes: usize) -> Result<usize> {
        while self.input_cur < min_bytes && !self.eoi {
            self.read_one()?;
        }
        self.write_all(writer)?;
        Ok(self.input_cur)
    }
}

/// How many bytes starting at `input` can be relocated, reading at most up
/// to `min_bytes`.
///
/// Stops after an instruction that never falls through, and before one that
/// reads PC in a way that cannot be rewritten. Calls and conditional
/// branches do not stop it.
pub fn can_relocate(input: &[u8], input_pc: u32, min_bytes: usize) -> Result<usize> {
    let mut relocator = ArmRelocator::new(input, input_pc);
    let mut safe = 0;

    while safe < min_bytes {
        let (consumed, insn) = relocator.read_one()?;
        if let Err(err) = classify(insn) {
            warn!("relocation stops at {:#x}: {}", insn.address, err);
            break;
        }
        safe = consumed;
        if relocator.eoi() {
            break;
        }
    }

    Ok(safe)
}

/// Relocate at least `min_bytes` of `input` into `writer`. The writer is not flushed.
pub fn relocate(
    input: &[u8],
    input_pc: u32,
    min_bytes: usize,
    writer: &mut ArmWriter,
) -> Result<usize> {
    ArmRelocator::new(input, input_pc).relocate_at_least(writer, min_bytes)
}
