use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated instruction at {address:#x}: {available} byte(s) available, 4 required")]
    Truncated { address: u32, available: usize },

    #[error("undefined instruction {word:#010x} at {address:#x}")]
    Undefined { address: u32, word: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A literal landed further from its `ldr` than the 12-bit displacement reaches.
    #[error("literal referenced at offset {offset:#x} is {distance} bytes away (max 4095)")]
    LiteralOutOfRange { offset: usize, distance: i64 },

    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelocError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("no further input after the end of the block at {address:#x}")]
    EndOfInput { address: u32 },

    #[error("cannot relocate instruction at {address:#x}: {reason}")]
    Unsupported { address: u32, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, RelocError>;
