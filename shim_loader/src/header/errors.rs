use thiserror::Error;

/// Errors raised while scanning a C header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A `/* ... */` comment or string literal runs past the end of the file.
    #[error("line {line}: unterminated {what}")]
    Unterminated { line: usize, what: &'static str },

    /// A closing delimiter without an opener, or an opener never closed.
    #[error("line {line}: unbalanced '{delimiter}'")]
    Unbalanced { line: usize, delimiter: char },

    /// `#else`/`#endif` without a matching `#if`.
    #[error("line {line}: '#{directive}' without matching '#if'")]
    StrayConditional { line: usize, directive: String },

    /// A function-like `#define` whose parameter list does not parse.
    #[error("line {line}: malformed macro parameters for '{name}'")]
    MalformedMacro { line: usize, name: String },

    /// A `static` or inline function whose name cannot be found.
    #[error("line {line}: cannot find the name of a local function")]
    UnnamedFunction { line: usize },
}
