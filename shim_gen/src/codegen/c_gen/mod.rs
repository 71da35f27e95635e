pub mod forwarder;
pub mod helpers;

// Re-export main public functions
pub use forwarder::{emit_forwarder, Forwarder};
pub use helpers::{emit_includes, format_arg_list, format_param_list, WRAPPERS_MARKER};
