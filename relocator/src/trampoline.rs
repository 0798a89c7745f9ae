use log::debug;

use crate::arch::arm::relocator::ArmRelocator;
use crate::arch::arm::writer::ArmWriter;
use crate::error::Result;

/// Relocated prologue of a hooked function, ready to be copied to `base_pc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trampoline {
    /// Address the code was generated for.
    pub base_pc: u32,
    /// Little-endian instruction words followed by the literal pool.
    pub code: Vec<u8>,
    /// Bytes taken from the original function.
    pub relocated_bytes: usize,
    /// Where the trampoline jumps back into the original function, or `None`
    /// when the relocated block never falls through.
    pub resume_pc: Option<u32>,
}

/// Relocate at least `min_bytes` of `code` (executing at `input_pc`) into a
/// trampoline executing at `output_pc`, then jump back to the first
/// instruction that was not relocated.
pub fn build_trampoline(
    code: &[u8],
    input_pc: u32,
    output_pc: u32,
    min_bytes: usize,
) -> Result<Trampoline> {
    let mut w = ArmWriter::new(output_pc);
    let mut r = ArmRelocator::new(code, input_pc);

    let relocated_bytes = r.relocate_at_least(&mut w, min_bytes)?;
    let resume_pc = if r.eoi() {
        None
    } else {
        let resume = input_pc.wrapping_add(relocated_bytes as u32);
        w.put_branch_address(resume);
        Some(resume)
    };
    w.flush()?;

    debug!(
        "trampoline at {:#x}: {} byte(s) from {:#x}, {} byte(s) emitted",
        output_pc,
        relocated_bytes,
        input_pc,
        w.offset()
    );

    Ok(Trampoline {
        base_pc: output_pc,
        code: w.to_bytes(),
        relocated_bytes,
        resume_pc,
    })
}
