use thiserror::Error;

/// Conditions that stop the machine. Anything here means the program asked
/// for something the address space or the stack cannot hold; the state is
/// left as it was before the faulting instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("access of {len} byte(s) at {addr:#05x} falls outside the 4K address space")]
    AddressOutOfBounds { addr: u16, len: usize },

    #[error("write of {len} byte(s) at {addr:#05x} would overwrite the glyph table")]
    GlyphTableWrite { addr: u16, len: usize },

    #[error("stack overflow: call at {pc:#05x} with SP at {sp:#05x}")]
    StackOverflow { pc: u16, sp: u16 },

    #[error("stack underflow: return at {pc:#05x} with an empty stack")]
    StackUnderflow { pc: u16 },

    #[error("V{x:X} holds {value:#04x}, which is not a key (0-F)")]
    InvalidKey { x: u8, value: u8 },

    #[error("there is no key {0:#04x}, keys are 0-F")]
    NoSuchKey(u8),

    #[error("program is {size} bytes, only {max} fit above 0x200")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("io error reading program: {0}")]
    Io(String),
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Fault::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Fault>;
