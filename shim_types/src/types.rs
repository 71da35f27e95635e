use crate::ctype::CType;
use serde_derive::{Deserialize, Serialize};

/* How the library gives a primitive its body */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LinkageKind {
    /* `static inline` (or an inline marker macro): no linkable symbol */
    Inline,
    /* Function-like preprocessor macro: no symbol, possibly no types */
    Macro,
    /* Ordinary prototype: the library already exports it */
    Extern,
}

impl LinkageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkageKind::Inline => "inline",
            LinkageKind::Macro => "macro",
            LinkageKind::Extern => "extern",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    In,
    Out,
    #[serde(rename = "inout")]
    InOut,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Ownership {
    Borrowed,
    Owned,
    #[default]
    None,
}

/* One parameter exactly as the header spells it */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Parameter {
    /* Prototypes may omit names */
    #[serde(default)]
    pub name: Option<String>,

    /* None for text macro parameters that carry no type */
    #[serde(rename = "type", default)]
    pub ty: Option<CType>,

    #[serde(default)]
    pub direction: Direction,

    #[serde(default)]
    pub ownership: Ownership,
}

impl Parameter {
    pub fn typed(name: Option<&str>, ty: CType) -> Self {
        Self {
            name: name.map(str::to_string),
            ty: Some(ty),
            direction: Direction::In,
            ownership: Ownership::None,
        }
    }

    pub fn untyped(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ty: None,
            direction: Direction::In,
            ownership: Ownership::None,
        }
    }
}

/// A normalized library primitive.
///
/// Parameter order and types are exactly those of the library header.
/// `unsupported` is set by the header scanner when the declarator uses a
/// construct that cannot be written back verbatim (function-pointer
/// parameters and similar); such declarations are always rejected.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Declaration {
    pub original_name: String,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /* None only for macros whose result type is unknown */
    #[serde(default)]
    pub return_type: Option<CType>,

    pub linkage_kind: LinkageKind,

    #[serde(default)]
    pub is_variadic: bool,

    #[serde(default)]
    pub header: Option<String>,

    #[serde(default)]
    pub unsupported: Option<String>,
}

impl Declaration {
    pub fn new(name: &str, linkage_kind: LinkageKind) -> Self {
        Self {
            original_name: name.to_string(),
            parameters: Vec::new(),
            return_type: None,
            linkage_kind,
            is_variadic: false,
            header: None,
            unsupported: None,
        }
    }

    pub fn returning(mut self, ty: CType) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn with_param(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    /* Any parameter or the result lacks a type */
    pub fn has_untyped_parts(&self) -> bool {
        self.return_type.is_none() || self.parameters.iter().any(|p| p.ty.is_none())
    }

    /* Type-only spelling used to tell a redeclaration from a conflicting one */
    pub fn signature_key(&self) -> String {
        let ret = self
            .return_type
            .as_ref()
            .map(CType::render)
            .unwrap_or_else(|| "?".to_string());
        let mut params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| match &p.ty {
                Some(ty) => ty.render(),
                None => "?".to_string(),
            })
            .collect();
        if self.is_variadic {
            params.push("...".to_string());
        }
        format!("{} {}({})", ret, self.original_name, params.join(", "))
    }

    /* Copy parameter names from an equivalent redeclaration where ours are missing */
    pub fn adopt_names_from(&mut self, other: &Declaration) {
        for (mine, theirs) in self.parameters.iter_mut().zip(&other.parameters) {
            if mine.name.is_none() {
                mine.name = theirs.name.clone();
            }
        }
    }
}
