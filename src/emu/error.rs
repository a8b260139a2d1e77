use std::path::PathBuf;

/// Errors raised while executing instructions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VmError {
    #[error("Unknown opcode {opcode:#06X} at address {address:#05X}")]
    UnknownOpcode { opcode: u16, address: u16 },

    #[error("Stack overflow: call at {address:#05X} exceeds 16 nested subroutines")]
    StackOverflow { address: u16 },

    #[error("Stack underflow: return at {address:#05X} with empty call stack")]
    StackUnderflow { address: u16 },
}

/// Errors raised while placing a program image into memory.
///
/// Any of these prevents execution from starting.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read program image {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Program image is too large ({size} bytes), max size is {max_size} bytes")]
    TooLarge { size: usize, max_size: usize },

    #[error("Program image was truncated: expected {expected} bytes, read {actual}")]
    Truncated { expected: usize, actual: usize },
}
