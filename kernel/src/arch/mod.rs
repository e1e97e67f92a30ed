//! Architecture-specific definitions
//!
//! The core targets a MIPS32-style CPU with a CP0 compare timer. Only the
//! saved register layout and the CP0 status/cause bits are needed here; the
//! routines that actually load and store registers belong to the platform.

pub mod context;
pub mod registers;

pub use context::{RegisterContext, Word, CONTEXT_SIZE};
pub use registers::{Cause, Status};
