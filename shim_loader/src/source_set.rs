use crate::file::CoverageFile;
use crate::header::{self, ScanOptions};
use crate::resolver::ImportResolver;
use anyhow::Context;
use regex::Regex;
use shim_types::{Declaration, LinkageKind, TypeConventions};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/* Where declarations come from */
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /* Directory whose headers are scanned, if any */
    pub header_dir: Option<PathBuf>,

    /* Header file names in `header_dir` that are never scanned */
    pub skip_headers: Vec<String>,

    /* Coverage files; their declarations override scanned ones */
    pub coverage_files: Vec<PathBuf>,

    /* Search path for coverage file imports */
    pub include_dirs: Vec<PathBuf>,

    /* Regexes over original names; matching declarations are dropped */
    pub deny_patterns: Vec<String>,

    pub scan: ScanOptions,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            header_dir: None,
            skip_headers: Vec::new(),
            coverage_files: Vec::new(),
            include_dirs: Vec::new(),
            /* Reserved identifiers are internal to the library or the C runtime */
            deny_patterns: vec!["^__".to_string()],
            scan: ScanOptions::default(),
        }
    }
}

/// The normalized input of one generation pass.
#[derive(Debug, Clone, Default)]
pub struct DeclarationSet {
    pub library: String,
    pub library_version: Option<String>,
    pub coverage_version: Option<u32>,

    /* Headers for the emitted translation unit, in include order */
    pub headers: Vec<String>,

    /* Declarations in header order, then coverage order */
    pub declarations: Vec<Declaration>,
}

impl DeclarationSet {
    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.original_name == name)
    }

    fn push_header(&mut self, header: &str) {
        if !self.headers.iter().any(|h| h == header) {
            self.headers.push(header.to_string());
        }
    }

    /// Add scanned declarations, folding redeclarations.
    ///
    /// A prototype and a definition with the same types are one primitive; the
    /// inline one wins and names missing from either are filled in. A text
    /// macro sharing its name with a typed declaration is dropped because the
    /// typed one already describes the call. Declarations with the same name
    /// but different types are all kept so the naming check can report them.
    pub fn add_scanned(&mut self, declarations: Vec<Declaration>) {
        for decl in declarations {
            let same_name: Vec<usize> = self
                .declarations
                .iter()
                .enumerate()
                .filter(|(_, d)| d.original_name == decl.original_name)
                .map(|(idx, _)| idx)
                .collect();

            let text_macro = same_name.iter().copied().find(|&idx| {
                let existing = &self.declarations[idx];
                existing.linkage_kind == LinkageKind::Macro && existing.has_untyped_parts()
            });

            if decl.linkage_kind == LinkageKind::Macro && decl.has_untyped_parts() {
                if !same_name.is_empty() {
                    debug!(name = %decl.original_name, "macro shadows a typed declaration; keeping the typed one");
                    continue;
                }
            } else if let Some(macro_idx) = text_macro {
                debug!(name = %decl.original_name, "typed declaration replaces text macro");
                self.declarations[macro_idx] = decl;
                continue;
            }

            let key = decl.signature_key();
            let duplicate = same_name
                .iter()
                .copied()
                .find(|&idx| self.declarations[idx].signature_key() == key);

            match duplicate {
                Some(idx) => {
                    let existing = &mut self.declarations[idx];
                    if existing.linkage_kind == LinkageKind::Extern && decl.linkage_kind != LinkageKind::Extern {
                        let mut replacement = decl;
                        replacement.adopt_names_from(existing);
                        *existing = replacement;
                    } else {
                        existing.adopt_names_from(&decl);
                    }
                }
                None => self.declarations.push(decl),
            }
        }
    }

    /* Coverage entries replace every scanned declaration of the same name, in place */
    pub fn apply_coverage(&mut self, declarations: Vec<Declaration>) {
        for decl in declarations {
            if let Some(header) = &decl.header {
                self.push_header(header);
            }
            let first = self
                .declarations
                .iter()
                .position(|d| d.original_name == decl.original_name);
            match first {
                Some(idx) => {
                    let name = decl.original_name.clone();
                    let mut header = self.declarations[idx].header.clone();
                    if decl.header.is_some() {
                        header = decl.header.clone();
                    }
                    self.declarations[idx] = Declaration { header, ..decl };
                    let mut seen_first = false;
                    self.declarations.retain(|d| {
                        if d.original_name != name {
                            return true;
                        }
                        let keep = !seen_first;
                        seen_first = true;
                        keep
                    });
                }
                None => self.declarations.push(decl),
            }
        }
    }

    pub fn apply_deny_patterns(&mut self, patterns: &[Regex]) {
        if patterns.is_empty() {
            return;
        }
        let before = self.declarations.len();
        self.declarations
            .retain(|d| !patterns.iter().any(|p| p.is_match(&d.original_name)));
        let dropped = before - self.declarations.len();
        if dropped > 0 {
            debug!(dropped, "dropped declarations matching deny patterns");
        }
    }
}

pub fn compile_patterns(patterns: &[String]) -> anyhow::Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("Invalid deny pattern '{}'", p)))
        .collect()
}

/// Parse stage: read headers and coverage files into one declaration set.
pub fn load_sources(
    options: &SourceOptions,
    conventions: &TypeConventions,
) -> anyhow::Result<DeclarationSet> {
    let deny = compile_patterns(&options.deny_patterns)?;
    let mut set = DeclarationSet::default();

    if let Some(dir) = &options.header_dir {
        let headers = header::list_headers(dir, &options.skip_headers)?;
        info!(dir = %dir.display(), headers = headers.len(), "scanning headers");
        for path in &headers {
            let declarations = header::scan_header_file(path, &options.scan, conventions)?;
            set.push_header(&path.display().to_string());
            set.add_scanned(declarations);
        }
        set.library = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
    }

    let mut resolver = ImportResolver::new(options.include_dirs.clone());
    for file in &options.coverage_files {
        resolver.load_file_with_imports(file)?;
    }

    let mut covered: HashMap<String, PathBuf> = HashMap::new();
    for (path, coverage) in resolver.get_all_files() {
        check_coverage_names(path, coverage, &mut covered)?;
        for header in coverage.headers() {
            set.push_header(header);
        }
        let declarations = coverage
            .get_declarations()
            .iter()
            .map(|entry| entry.to_declaration(conventions))
            .collect();
        set.apply_coverage(declarations);
    }

    /* The last loaded file is the root of the last import tree */
    if let Some((_, root)) = resolver.get_all_files().last() {
        set.library = root.library().to_string();
        set.library_version = root.coverage.library_version.clone();
        set.coverage_version = Some(root.coverage_version());
    }
    if set.library.is_empty() {
        set.library = "library".to_string();
    }

    set.apply_deny_patterns(&deny);

    info!(
        library = %set.library,
        headers = set.headers.len(),
        declarations = set.declarations.len(),
        coverage_files = resolver.loaded_file_count(),
        "loaded declarations"
    );
    Ok(set)
}

/* Two coverage files claiming the same primitive is an audit error, not an override */
fn check_coverage_names(
    path: &std::path::Path,
    coverage: &CoverageFile,
    covered: &mut HashMap<String, PathBuf>,
) -> anyhow::Result<()> {
    for entry in coverage.get_declarations() {
        if let Some(previous) = covered.insert(entry.name.clone(), path.to_path_buf()) {
            anyhow::bail!(
                "Primitive '{}' is covered twice: '{}' and '{}'",
                entry.name,
                previous.display(),
                path.display()
            );
        }
    }
    Ok(())
}
