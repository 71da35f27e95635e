use shim_types::RejectedEntry;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a generation pass.
///
/// Every variant is fatal: nothing is written when one is returned.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Declarations that cannot be wrapped without changing their contract
    #[error("{} declaration(s) cannot be wrapped: {}", .0.len(), list_rejects(.0))]
    Rejected(Vec<RejectedEntry>),

    /// Two wrappers, or a wrapper and a library symbol, would share a name
    #[error("Naming collision: {0}")]
    NamingCollision(String),

    /// An emitted forwarder is not a pure pass-through of its declaration
    #[error("Semantic drift in '{name}': {detail}")]
    SemanticDrift { name: String, detail: String },

    /// Header or coverage file loading failed
    #[error("Failed to load declarations: {0:#}")]
    Load(anyhow::Error),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(String),

    /// The suffix must keep exported names valid C identifiers
    #[error("Invalid wrapper suffix '{0}': expected one or more of [A-Za-z0-9_]")]
    InvalidSuffix(String),

    /// The declaration set is empty, usually a misconfigured header directory
    #[error("No declarations found")]
    Empty,
}

impl GenerateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerateError::Io {
            path: path.into(),
            source,
        }
    }
}

fn list_rejects(rejects: &[RejectedEntry]) -> String {
    rejects
        .iter()
        .map(|r| format!("{} ({})", r.name, r.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_lists_every_name() {
        let err = GenerateError::Rejected(vec![
            RejectedEntry {
                name: "flint_printf".to_string(),
                reason: "variadic".to_string(),
            },
            RejectedEntry {
                name: "FLINT_SWAP".to_string(),
                reason: "untyped macro".to_string(),
            },
        ]);
        assert_eq!(
            err.to_string(),
            "2 declaration(s) cannot be wrapped: flint_printf (variadic), FLINT_SWAP (untyped macro)"
        );
    }

    #[test]
    fn load_keeps_the_context_chain() {
        let inner = anyhow::anyhow!("missing").context("Failed to read 'a.yaml'");
        let err = GenerateError::Load(inner);
        assert_eq!(err.to_string(), "Failed to load declarations: Failed to read 'a.yaml': missing");
    }
}
