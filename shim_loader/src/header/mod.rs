//! C header scanning: just enough of C to find file-scope functions and
//! function-like macros and to keep their signatures verbatim.

pub mod errors;
pub mod lexer;
pub mod parser;
pub mod preprocess;

pub use errors::ParseError;
pub use parser::ParsedFunction;
pub use preprocess::MacroDef;

use anyhow::Context;
use shim_types::{Declaration, TypeConventions};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/* Knobs for the header scanner */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /* Macros that expand to attributes or visibility and carry no type */
    pub attribute_macros: Vec<String>,

    /* Macros that expand to `static inline` (any upper-case `*_INLINE` also counts) */
    pub inline_markers: Vec<String>,

    /* Report function-like macros as declarations */
    pub include_macros: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            attribute_macros: [
                "FLINT_DLL",
                "FLINT_WARN_UNUSED",
                "FLINT_CONST",
                "FLINT_PURE",
                "FLINT_NORETURN",
                "FLINT_UNUSED",
                "WARN_UNUSED_RESULT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            inline_markers: vec!["FLINT_INLINE".to_string(), "FLINT_FORCE_INLINE".to_string()],
            include_macros: true,
        }
    }
}

impl ScanOptions {
    pub fn is_inline_marker(&self, word: &str) -> bool {
        if self.inline_markers.iter().any(|m| m == word) {
            return true;
        }
        word.ends_with("_INLINE")
            && word
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    }
}

/* Everything found in one header, in source order */
#[derive(Debug, Default)]
pub struct ParsedHeader {
    pub functions: Vec<ParsedFunction>,
    pub macros: Vec<MacroDef>,
}

impl ParsedHeader {
    /* Functions and macros interleaved by line number */
    pub fn declarations(&self, include_macros: bool) -> Vec<Declaration> {
        let mut entries: Vec<(usize, Declaration)> = self
            .functions
            .iter()
            .map(|f| (f.line, f.declaration.clone()))
            .collect();
        if include_macros {
            entries.extend(self.macros.iter().map(|m| (m.line, parser::macro_declaration(m))));
        }
        entries.sort_by_key(|(line, _)| *line);
        entries.into_iter().map(|(_, decl)| decl).collect()
    }
}

/* Parse C source text */
pub fn parse_source(
    text: &str,
    options: &ScanOptions,
    conventions: &TypeConventions,
) -> Result<ParsedHeader, ParseError> {
    let pre = preprocess::preprocess(text)?;
    let tokens = lexer::tokenize(&pre.lines)?;
    let functions = parser::parse_functions(&tokens, options, conventions)?;
    Ok(ParsedHeader {
        functions,
        macros: pre.macros,
    })
}

/* Scan one header file; every declaration records the header it came from */
pub fn scan_header_file(
    path: &Path,
    options: &ScanOptions,
    conventions: &TypeConventions,
) -> anyhow::Result<Vec<Declaration>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read header '{}'", path.display()))?;
    let parsed = parse_source(&text, options, conventions)
        .with_context(|| format!("Failed to parse header '{}'", path.display()))?;

    let header = path.display().to_string();
    let declarations: Vec<Declaration> = parsed
        .declarations(options.include_macros)
        .into_iter()
        .map(|d| d.with_header(&header))
        .collect();

    debug!(
        header = %header,
        functions = parsed.functions.len(),
        macros = parsed.macros.len(),
        "scanned header"
    );
    Ok(declarations)
}

/* All `*.h` files in a directory, sorted by name, minus the skip list */
pub fn list_headers(dir: &Path, skip_headers: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Cannot find the header directory '{}'", dir.display());
    }

    let skip: HashSet<&OsStr> = skip_headers.iter().map(OsStr::new).collect();
    let header_extension = OsStr::new("h");

    let mut headers = Vec::new();
    for entry in dir
        .read_dir()
        .with_context(|| format!("Failed to list '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.extension() != Some(header_extension) || !path.is_file() {
            continue;
        }
        if path.file_name().is_some_and(|name| skip.contains(name)) {
            debug!(header = %path.display(), "skipping header");
            continue;
        }
        headers.push(path);
    }

    /* read_dir order is unspecified; output must not depend on it */
    headers.sort();
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shim_types::LinkageKind;

    #[test]
    fn inline_markers() {
        let opts = ScanOptions::default();
        assert!(opts.is_inline_marker("FLINT_INLINE"));
        assert!(opts.is_inline_marker("FMPZ_MOD_POLY_INLINE"));
        assert!(!opts.is_inline_marker("fmpz_INLINE"));
        assert!(!opts.is_inline_marker("FLINT_DLL"));
    }

    #[test]
    fn declarations_follow_source_order() {
        let src = "\
#define FLINT_SWAP(T, a, b) do { T t = a; a = b; b = t; } while (0)
FLINT_INLINE void fmpz_zero(fmpz_t f) { *f = 0; }
#define fmpz_is_zero_fast(f) (*(f) == 0)
void fmpz_add(fmpz_t f, const fmpz_t g, const fmpz_t h);
";
        let parsed = parse_source(src, &ScanOptions::default(), &TypeConventions::default()).unwrap();
        let decls = parsed.declarations(true);
        let names: Vec<_> = decls.iter().map(|d| d.original_name.as_str()).collect();
        assert_eq!(names, vec!["FLINT_SWAP", "fmpz_zero", "fmpz_is_zero_fast", "fmpz_add"]);
        assert_eq!(decls[0].linkage_kind, LinkageKind::Macro);
        assert_eq!(decls[1].linkage_kind, LinkageKind::Inline);
        assert_eq!(decls[3].linkage_kind, LinkageKind::Extern);

        let without_macros = parsed.declarations(false);
        assert_eq!(without_macros.len(), 2);
    }
}
