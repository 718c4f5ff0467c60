use thiserror::Error;

/// An error raised while bringing up an instrumentation host
#[derive(Debug, Error)]
pub enum LoopscopeHostError {
    /// The execution recording could not be read from disk
    #[error("failed to read execution recording")]
    Io(#[from] std::io::Error),
    /// The execution recording was readable but was not a valid recording
    #[error("failed to parse execution recording")]
    Recording(#[from] serde_json::Error),
    /// A basic block was declared with no instructions in it. Carries the
    /// address of the enclosing code unit
    #[error("basic block at {0:#x} contains zero instructions")]
    EmptyBlock(u64),
    /// Two loaded images claim the same addresses
    #[error("images `{0}` and `{1}` overlap")]
    OverlappingImages(String, String),
    /// Two code units share instructions. Each instruction has to belong to
    /// exactly one code unit, or its hooks would be installed once per unit
    #[error("code units at {0:#x} and {1:#x} overlap")]
    OverlappingCodeUnits(u64, u64),
    /// An instruction extends past the end of the address space
    #[error("instruction at {0:#x} runs past the end of the address space")]
    AddressOverflow(u64),
    /// The recorded execution reached an address that no code unit covers.
    /// Probably indicates a recording that was truncated or hand-edited
    #[error("execution reached {0:#x}, which no code unit covers")]
    UnknownCodeAddress(u64),
}
