//! Linkable Shims for Inline Primitives
//!
//! Generates a C translation unit that gives an exported symbol to every
//! `static inline` function and function-like macro of a library, each one
//! a single-call forwarder with the primitive's exact signature, together
//! with a manifest a binding layer can declare the symbols from.
//!
//! The pass is Parse (`shim_loader`), Classify, Preserve, Emit and Record.
//! It either produces both outputs or none.

pub mod classify;
pub mod codegen;
pub mod errors;
pub mod naming;
pub mod pipeline;
pub mod signature;

pub use classify::{classify, partition, Classification, Partition, RejectReason};
pub use codegen::{Forwarder, ManifestFormat};
pub use errors::GenerateError;
pub use naming::{exported_name, SymbolNamer, DEFAULT_SUFFIX};
pub use pipeline::{generate, plan, write_outputs, GenerateOptions, GeneratedShims, RejectPolicy, WrittenOutputs};
pub use signature::{preserve, PreservedParam, PreservedSignature};

// Re-export the loader for convenience
pub use shim_loader;
