//! Shim Declaration Model
//!
//! Pure data structures describing library primitives (declarations, C
//! types, parameter conventions) and the wrapper manifest handed to binding
//! generators. No file I/O and no code generation lives here.

pub mod conventions;
pub mod ctype;
pub mod manifest;
pub mod types;

// Re-export commonly used types at the crate root
pub use conventions::*;
pub use ctype::{CType, CTypeError};
pub use manifest::*;
pub use types::*;
