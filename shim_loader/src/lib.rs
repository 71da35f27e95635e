//! Declaration Loading
//!
//! This crate turns library headers and coverage files into the normalized
//! declaration set consumed by the shim generator: it scans headers for
//! inline functions and function-like macros, loads coverage files with
//! their imports, and merges both into one ordered list.

pub mod file;
pub mod header;
pub mod resolver;
pub mod source_set;

// Re-export commonly used types at the crate root
pub use file::{CoverageFile, CoverageMetadata, DeclarationEntry, ImportSource, ParamEntry};
pub use header::{list_headers, parse_source, scan_header_file, ParseError, ParsedHeader, ScanOptions};
pub use resolver::ImportResolver;
pub use source_set::{load_sources, DeclarationSet, SourceOptions};

// Re-export shim_types for convenience
pub use shim_types;
