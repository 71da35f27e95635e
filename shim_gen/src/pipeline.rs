use crate::classify::{partition, RejectReason};
use crate::codegen::{
    build_manifest, serialize_manifest, verify_translation_unit, CShimGenerator, CShimGeneratorOptions,
    Forwarder, ManifestContext, ManifestFormat, DEFAULT_MANIFEST_FILE, DEFAULT_UNIT_FILE,
};
use crate::errors::GenerateError;
use crate::naming::{check_original_names, validate_suffix, SymbolNamer, DEFAULT_SUFFIX};
use crate::signature::{preserve, PreservedSignature};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use shim_loader::{load_sources, DeclarationSet, SourceOptions};
use shim_types::{Declaration, Manifest, RejectedEntry, TypeConventions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/* What to do with declarations that cannot be wrapped */
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RejectPolicy {
    /* Abort the pass, listing every reject */
    #[default]
    Fail,
    /* Leave them out and record them in the manifest */
    Exclude,
}

pub struct GenerateOptions {
    pub sources: SourceOptions,
    pub conventions: TypeConventions,
    pub output_dir: PathBuf,
    pub unit_file_name: String,
    pub manifest_file_name: String,
    pub manifest_format: ManifestFormat,
    pub suffix: String,
    pub reject_policy: RejectPolicy,
    /* Fan classification, preservation and rendering out over rayon */
    pub parallel: bool,
    /* Re-parse the emitted unit and compare it to the forwarders */
    pub verify: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            sources: SourceOptions::default(),
            conventions: TypeConventions::default(),
            output_dir: PathBuf::from("."),
            unit_file_name: DEFAULT_UNIT_FILE.to_string(),
            manifest_file_name: DEFAULT_MANIFEST_FILE.to_string(),
            manifest_format: ManifestFormat::Json,
            suffix: DEFAULT_SUFFIX.to_string(),
            reject_policy: RejectPolicy::Fail,
            parallel: false,
            verify: true,
        }
    }
}

/// The complete result of one pass, before anything touches the disk.
#[derive(Debug, Clone)]
pub struct GeneratedShims {
    pub translation_unit: String,
    pub manifest: Manifest,
    pub manifest_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenOutputs {
    pub unit_path: PathBuf,
    pub manifest_path: PathBuf,
}

fn rejected_entry(decl: &Declaration, reason: &RejectReason) -> RejectedEntry {
    RejectedEntry {
        name: decl.original_name.clone(),
        reason: reason.to_string(),
    }
}

/// Classify, preserve, emit and record a declaration set.
///
/// Pure: the same set and options always give byte-identical output, and
/// nothing is written. Rejects are listed classification rejects first,
/// then preservation rejects, each in declaration order.
pub fn plan(set: &DeclarationSet, options: &GenerateOptions) -> Result<GeneratedShims, GenerateError> {
    validate_suffix(&options.suffix)?;
    if set.declarations.is_empty() {
        return Err(GenerateError::Empty);
    }

    let parts = partition(&set.declarations, options.parallel);
    debug!(
        shim = parts.shim.len(),
        skip = parts.skip.len(),
        reject = parts.reject.len(),
        "classified declarations"
    );

    let conventions = &options.conventions;
    let preserved: Vec<(&Declaration, Result<PreservedSignature, RejectReason>)> = if options.parallel {
        parts.shim.par_iter().map(|d| (*d, preserve(d, conventions))).collect()
    } else {
        parts.shim.iter().map(|d| (*d, preserve(d, conventions))).collect()
    };

    let mut rejected: Vec<RejectedEntry> = parts
        .reject
        .iter()
        .map(|(decl, reason)| rejected_entry(decl, reason))
        .collect();
    let mut signatures = Vec::with_capacity(preserved.len());
    for (decl, result) in preserved {
        match result {
            Ok(sig) => signatures.push(sig),
            Err(reason) => rejected.push(rejected_entry(decl, &reason)),
        }
    }

    if !rejected.is_empty() {
        match options.reject_policy {
            RejectPolicy::Fail => return Err(GenerateError::Rejected(rejected)),
            RejectPolicy::Exclude => {
                for entry in &rejected {
                    warn!(name = %entry.name, reason = %entry.reason, "excluding declaration");
                }
            }
        }
    }

    let all_names = || set.declarations.iter().map(|d| d.original_name.as_str());
    check_original_names(signatures.iter().map(|s| s.original_name.as_str()), all_names())?;

    let mut namer = SymbolNamer::new(&options.suffix, all_names())?;
    let mut forwarders = Vec::with_capacity(signatures.len());
    for signature in signatures {
        let exported_name = namer.assign(&signature)?;
        forwarders.push(Forwarder {
            exported_name,
            signature,
        });
    }

    let generator = CShimGenerator::new(CShimGeneratorOptions {
        parallel: options.parallel,
        ..CShimGeneratorOptions::default()
    });
    let translation_unit = generator.emit_code(&set.headers, &forwarders);

    if options.verify {
        verify_translation_unit(&translation_unit, &forwarders, conventions)?;
    }

    let context = ManifestContext {
        library: &set.library,
        library_version: set.library_version.as_deref(),
        coverage_version: set.coverage_version,
        suffix: &options.suffix,
        translation_unit: &options.unit_file_name,
    };
    let skipped = parts.skip.iter().map(|d| d.original_name.clone()).collect();
    let manifest = build_manifest(&context, &translation_unit, &forwarders, skipped, rejected);
    let manifest_text = serialize_manifest(&manifest, options.manifest_format)?;

    info!(
        library = %manifest.library,
        wrappers = manifest.wrappers.len(),
        skipped = manifest.skipped.len(),
        rejected = manifest.rejected.len(),
        "planned shims"
    );

    Ok(GeneratedShims {
        translation_unit,
        manifest,
        manifest_text,
    })
}

/// Load the sources, plan the pass and write both outputs.
pub fn generate(options: &GenerateOptions) -> Result<(GeneratedShims, WrittenOutputs), GenerateError> {
    let set = load_sources(&options.sources, &options.conventions).map_err(GenerateError::Load)?;
    let generated = plan(&set, options)?;
    let written = write_outputs(&generated, options)?;
    Ok((generated, written))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn stage(path: &Path, contents: &str) -> Result<PathBuf, GenerateError> {
    let staged = staging_path(path);
    fs::write(&staged, contents).map_err(|e| {
        let _ = fs::remove_file(&staged);
        GenerateError::io(&staged, e)
    })?;
    Ok(staged)
}

/// Write the unit and the manifest side by side.
///
/// Both files are staged next to their targets first and only renamed into
/// place once both are on disk, so a failed pass leaves the previous pair
/// untouched.
pub fn write_outputs(
    generated: &GeneratedShims,
    options: &GenerateOptions,
) -> Result<WrittenOutputs, GenerateError> {
    let dir = &options.output_dir;
    let unit_path = dir.join(&options.unit_file_name);
    let manifest_path = dir.join(&options.manifest_file_name);
    if unit_path == manifest_path {
        return Err(GenerateError::io(
            &unit_path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "the unit and the manifest must be different files",
            ),
        ));
    }

    fs::create_dir_all(dir).map_err(|e| GenerateError::io(dir, e))?;

    let unit_staged = stage(&unit_path, &generated.translation_unit)?;
    let manifest_staged = match stage(&manifest_path, &generated.manifest_text) {
        Ok(staged) => staged,
        Err(err) => {
            let _ = fs::remove_file(&unit_staged);
            return Err(err);
        }
    };

    fs::rename(&unit_staged, &unit_path).map_err(|e| {
        let _ = fs::remove_file(&unit_staged);
        let _ = fs::remove_file(&manifest_staged);
        GenerateError::io(&unit_path, e)
    })?;
    fs::rename(&manifest_staged, &manifest_path).map_err(|e| {
        let _ = fs::remove_file(&manifest_staged);
        GenerateError::io(&manifest_path, e)
    })?;

    info!(
        unit = %unit_path.display(),
        manifest = %manifest_path.display(),
        "wrote shims"
    );
    Ok(WrittenOutputs {
        unit_path,
        manifest_path,
    })
}
