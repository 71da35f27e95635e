use anyhow::Context;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::file::CoverageFile;

/* Import resolver for loading coverage files and the files they import */
pub struct ImportResolver {
    /* Track loaded files to detect circular imports */
    loaded_files: HashSet<PathBuf>,

    /* Include directories for searching imports */
    include_dirs: Vec<PathBuf>,

    /* Loaded files, imports before their importers */
    all_files: Vec<(PathBuf, CoverageFile)>,
}

impl ImportResolver {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            loaded_files: HashSet::new(),
            include_dirs,
            all_files: Vec::new(),
        }
    }

    /* Resolve an import path relative to a base file or include directories */
    fn resolve_import_path(&self, import_path: &str, base_file: &Path) -> anyhow::Result<PathBuf> {
        if let Some(parent) = base_file.parent() {
            let relative_path = parent.join(import_path);
            if relative_path.exists() {
                return Ok(relative_path.canonicalize()?);
            }
        }

        for include_dir in &self.include_dirs {
            let include_path = include_dir.join(import_path);
            if include_path.exists() {
                return Ok(include_path.canonicalize()?);
            }
        }

        anyhow::bail!(
            "Import '{}' not found relative to '{}' or in include directories",
            import_path,
            base_file.display()
        )
    }

    /* Load a coverage file and recursively load its imports */
    pub fn load_file_with_imports(&mut self, file_path: &Path) -> anyhow::Result<()> {
        let canonical_path = file_path
            .canonicalize()
            .with_context(|| format!("Coverage file '{}' not found", file_path.display()))?;

        if self.loaded_files.contains(&canonical_path) {
            debug!(file = %file_path.display(), "skipping already loaded coverage file");
            return Ok(());
        }

        /* Mark as loaded before processing imports so cycles terminate */
        self.loaded_files.insert(canonical_path.clone());

        let contents = std::fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read '{}'", file_path.display()))?;
        let coverage_file: CoverageFile = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse coverage file '{}'", file_path.display()))?;

        debug!(
            file = %file_path.display(),
            library = coverage_file.library(),
            version = coverage_file.coverage_version(),
            declarations = coverage_file.get_declarations().len(),
            "loaded coverage file"
        );

        for import in coverage_file.imports().to_vec() {
            let import_path = self.resolve_import_path(import.path(), &canonical_path)?;
            self.load_file_with_imports(&import_path)?;
        }

        self.all_files.push((canonical_path, coverage_file));
        Ok(())
    }

    /* Loaded files in dependency order; the root of each import tree comes last */
    pub fn get_all_files(&self) -> &[(PathBuf, CoverageFile)] {
        &self.all_files
    }

    pub fn loaded_file_count(&self) -> usize {
        self.loaded_files.len()
    }
}
