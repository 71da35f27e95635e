use crate::conventions::TypeClass;
use crate::ctype::CType;
use crate::types::{Direction, LinkageKind, Ownership};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;

/* Bumped whenever the serialized shape changes */
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct WrapperParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: CType,
    pub direction: Direction,
    pub ownership: Ownership,
    pub class: TypeClass,
}

/* One emitted forwarder, as a binding generator should declare it */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct WrapperEntry {
    pub exported_name: String,
    pub forwards_to: String,
    pub linkage: LinkageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub returns: CType,
    #[serde(default)]
    pub params: Vec<WrapperParam>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct RejectedEntry {
    pub name: String,
    pub reason: String,
}

/// The authoritative list of wrapper symbols produced by one generation pass.
///
/// `translation-unit-sha256` ties the manifest to the exact C text emitted in
/// the same pass, so a binding layer can refuse a stale pair.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    pub manifest_version: u32,
    pub library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_version: Option<u32>,
    pub suffix: String,
    pub translation_unit: String,
    pub translation_unit_sha256: String,
    #[serde(default)]
    pub wrappers: Vec<WrapperEntry>,
    #[serde(default)]
    pub skipped: Vec<String>,
    #[serde(default)]
    pub rejected: Vec<RejectedEntry>,
}

impl Manifest {
    pub fn find(&self, exported_name: &str) -> Option<&WrapperEntry> {
        self.wrappers.iter().find(|w| w.exported_name == exported_name)
    }

    pub fn exported_names(&self) -> impl Iterator<Item = &str> {
        self.wrappers.iter().map(|w| w.exported_name.as_str())
    }

    /* Exported names that occur more than once, in first-repeat order */
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for name in self.exported_names() {
            if !seen.insert(name) && !dups.contains(&name) {
                dups.push(name);
            }
        }
        dups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::{Aliasing, Pointee};

    fn entry(name: &str) -> WrapperEntry {
        WrapperEntry {
            exported_name: format!("{}__extern", name),
            forwards_to: name.to_string(),
            linkage: LinkageKind::Inline,
            header: Some("fmpz.h".to_string()),
            returns: CType::void(),
            params: vec![WrapperParam {
                name: "f".to_string(),
                ty: "fmpz_t".parse().unwrap(),
                direction: Direction::InOut,
                ownership: Ownership::Borrowed,
                class: TypeClass::Pointer {
                    pointee: Pointee::Record,
                    aliasing: Aliasing::Ptr,
                },
            }],
        }
    }

    fn manifest(wrappers: Vec<WrapperEntry>) -> Manifest {
        Manifest {
            manifest_version: MANIFEST_VERSION,
            library: "flint".to_string(),
            library_version: None,
            coverage_version: Some(1),
            suffix: "__extern".to_string(),
            translation_unit: "extern.c".to_string(),
            translation_unit_sha256: String::new(),
            wrappers,
            skipped: Vec::new(),
            rejected: Vec::new(),
        }
    }

    #[test]
    fn finds_duplicates() {
        let m = manifest(vec![entry("fmpz_init"), entry("fmpz_clear"), entry("fmpz_init")]);
        assert_eq!(m.duplicate_names(), vec!["fmpz_init__extern"]);
        assert!(m.find("fmpz_clear__extern").is_some());
        assert!(m.find("fmpz_clear").is_none());
    }

    #[test]
    fn json_field_names() {
        let m = manifest(vec![entry("fmpz_zero")]);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["wrappers"][0]["exported-name"], "fmpz_zero__extern");
        assert_eq!(json["wrappers"][0]["params"][0]["type"], "fmpz_t");
        assert_eq!(json["wrappers"][0]["params"][0]["direction"], "inout");
        assert_eq!(json["wrappers"][0]["params"][0]["class"]["kind"], "pointer");
        assert_eq!(json["wrappers"][0]["params"][0]["class"]["aliasing"], "ptr");
        assert!(json.get("library-version").is_none());
    }
}
