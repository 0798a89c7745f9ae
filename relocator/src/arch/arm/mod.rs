//! A32 (ARM state, 32-bit fixed width) support.

pub mod decoder;
pub mod relocator;
pub mod writer;
