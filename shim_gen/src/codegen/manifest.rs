use crate::codegen::c_gen::Forwarder;
use crate::errors::GenerateError;
use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shim_types::{Manifest, RejectedEntry, WrapperEntry, WrapperParam, MANIFEST_VERSION};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestFormat {
    #[default]
    Json,
    Yaml,
}

/* Everything about the pass that is not a wrapper */
pub struct ManifestContext<'a> {
    pub library: &'a str,
    pub library_version: Option<&'a str>,
    pub coverage_version: Option<u32>,
    pub suffix: &'a str,
    pub translation_unit: &'a str,
}

pub fn wrapper_entry(forwarder: &Forwarder) -> WrapperEntry {
    let sig = &forwarder.signature;
    WrapperEntry {
        exported_name: forwarder.exported_name.clone(),
        forwards_to: sig.original_name.clone(),
        linkage: sig.linkage,
        header: sig.header.clone(),
        returns: sig.return_type.clone(),
        params: sig
            .params
            .iter()
            .map(|p| WrapperParam {
                name: p.name.clone(),
                ty: p.ty.clone(),
                direction: p.direction,
                ownership: p.ownership,
                class: p.class,
            })
            .collect(),
    }
}

pub fn unit_digest(unit: &str) -> String {
    hex::encode(Sha256::digest(unit.as_bytes()))
}

/// Project the forwarders into the manifest, bound to the exact unit text.
pub fn build_manifest(
    context: &ManifestContext<'_>,
    unit: &str,
    forwarders: &[Forwarder],
    skipped: Vec<String>,
    rejected: Vec<RejectedEntry>,
) -> Manifest {
    Manifest {
        manifest_version: MANIFEST_VERSION,
        library: context.library.to_string(),
        library_version: context.library_version.map(str::to_string),
        coverage_version: context.coverage_version,
        suffix: context.suffix.to_string(),
        translation_unit: context.translation_unit.to_string(),
        translation_unit_sha256: unit_digest(unit),
        wrappers: forwarders.iter().map(wrapper_entry).collect(),
        skipped,
        rejected,
    }
}

pub fn serialize_manifest(manifest: &Manifest, format: ManifestFormat) -> Result<String, GenerateError> {
    let mut text = match format {
        ManifestFormat::Json => serde_json::to_string_pretty(manifest)
            .map_err(|e| GenerateError::Serialize(e.to_string()))?,
        ManifestFormat::Yaml => {
            serde_yml::to_string(manifest).map_err(|e| GenerateError::Serialize(e.to_string()))?
        }
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}
