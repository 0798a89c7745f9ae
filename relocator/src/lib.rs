//! arm-relocator: A32 instruction relocation for inline-hook trampolines.
//!
//! Copies the first instructions of a function into a new location and
//! rewrites everything that reads the program counter, using an
//! [`ArmWriter`] with a trailing literal pool for the absolute values.

pub mod arch;
pub mod error;
pub mod trampoline;

// Re-exports for convenience (flattened imports)
pub use arch::arm::decoder::{A32Decoder, ArmInsn, Decoder, InsnId, MemOperand, Operand};
pub use arch::arm::relocator::{can_relocate, relocate, ArmRelocator, Rewrite};
pub use arch::arm::writer::{ArmWriter, Reg, Shift, ShiftKind};
pub use error::{DecodeError, EncodeError, RelocError, Result};
pub use trampoline::{build_trampoline, Trampoline};
