pub(crate) mod block;
pub(crate) mod error;
pub mod hook;
pub(crate) mod image;
pub(crate) mod instruction;
pub mod replay;

pub use block::{BasicBlock, CodeUnit};
pub use error::LoopscopeHostError;
pub use hook::{HookArgs, HookId, InsertionPoint, Instrumenter};
pub use image::{Image, ProgramImages, Routine};
pub use instruction::*;

/// An address in the profiled program's address space
pub type Address = u64;
