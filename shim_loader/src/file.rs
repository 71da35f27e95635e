use serde_derive::{Deserialize, Serialize};
use shim_types::{CType, Declaration, Direction, LinkageKind, Ownership, Parameter, TypeConventions};

/* ============================================================================
   Coverage file: the explicit, versioned list of covered primitives
   ============================================================================ */

/* Where an import is loaded from */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ImportSource {
    /* Local file path import */
    Path {
        /* Relative to the importing file, or to an include directory */
        path: String,
    },
}

impl ImportSource {
    pub fn path(&self) -> &str {
        match self {
            ImportSource::Path { path } => path,
        }
    }
}

/* Metadata for a coverage file */
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct CoverageMetadata {
    /* Library the primitives belong to (e.g., "flint") */
    pub library: String,

    /* Revision of this coverage list; bump on every audited change */
    pub coverage_version: u32,

    /* Library release the list was audited against */
    #[serde(default)]
    pub library_version: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub imports: Vec<ImportSource>,

    /* Headers the emitted translation unit must include */
    #[serde(default)]
    pub headers: Vec<String>,
}

/* A parameter as written in a coverage file */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ParamEntry {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: CType,

    /* Falls back to the type conventions when absent */
    #[serde(default)]
    pub direction: Option<Direction>,

    #[serde(default)]
    pub ownership: Option<Ownership>,
}

/* An audited primitive: every type is spelled out by hand */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct DeclarationEntry {
    pub name: String,

    pub linkage: LinkageKind,

    pub returns: CType,

    #[serde(default)]
    pub params: Vec<ParamEntry>,

    #[serde(default)]
    pub variadic: bool,

    /* Header that defines the primitive, when known */
    #[serde(default)]
    pub header: Option<String>,
}

impl DeclarationEntry {
    pub fn to_declaration(&self, conventions: &TypeConventions) -> Declaration {
        let parameters = self
            .params
            .iter()
            .map(|p| Parameter {
                name: Some(p.name.clone()),
                ty: Some(p.ty.clone()),
                direction: p.direction.unwrap_or_else(|| conventions.default_direction(&p.ty)),
                ownership: p.ownership.unwrap_or_else(|| conventions.default_ownership(&p.ty)),
            })
            .collect();

        Declaration {
            original_name: self.name.clone(),
            parameters,
            return_type: Some(self.returns.clone()),
            linkage_kind: self.linkage,
            is_variadic: self.variadic,
            header: self.header.clone(),
            unsupported: None,
        }
    }
}

/* Complete coverage file structure */
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct CoverageFile {
    pub coverage: CoverageMetadata,

    #[serde(default)]
    pub declarations: Vec<DeclarationEntry>,
}

impl CoverageFile {
    pub fn library(&self) -> &str {
        &self.coverage.library
    }

    pub fn coverage_version(&self) -> u32 {
        self.coverage.coverage_version
    }

    pub fn imports(&self) -> &[ImportSource] {
        &self.coverage.imports
    }

    pub fn headers(&self) -> &[String] {
        &self.coverage.headers
    }

    pub fn get_declarations(&self) -> &[DeclarationEntry] {
        &self.declarations
    }
}
