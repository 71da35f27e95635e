use crate::errors::GenerateError;
use crate::signature::PreservedSignature;
use indexmap::IndexMap;
use std::collections::HashSet;

pub const DEFAULT_SUFFIX: &str = "__extern";

pub fn validate_suffix(suffix: &str) -> Result<(), GenerateError> {
    if suffix.is_empty() || !suffix.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()) {
        return Err(GenerateError::InvalidSuffix(suffix.to_string()));
    }
    Ok(())
}

/* Depends on nothing but the original name, so names survive regeneration */
pub fn exported_name(original: &str, suffix: &str) -> String {
    format!("{}{}", original, suffix)
}

/// Assigns exported names and checks they are unique.
///
/// `known` holds every symbol name the library declares, whether or not it
/// is wrapped. An exported name may not shadow any of them.
pub struct SymbolNamer<'a> {
    suffix: &'a str,
    known: HashSet<&'a str>,
    /* exported name -> original name, in assignment order */
    assigned: IndexMap<String, String>,
}

impl<'a> SymbolNamer<'a> {
    pub fn new(suffix: &'a str, known: impl IntoIterator<Item = &'a str>) -> Result<Self, GenerateError> {
        validate_suffix(suffix)?;
        Ok(Self {
            suffix,
            known: known.into_iter().collect(),
            assigned: IndexMap::new(),
        })
    }

    pub fn assign(&mut self, sig: &PreservedSignature) -> Result<String, GenerateError> {
        let exported = exported_name(&sig.original_name, self.suffix);

        if self.known.contains(exported.as_str()) {
            return Err(GenerateError::NamingCollision(format!(
                "'{}' (wrapper of '{}') is already a library symbol",
                exported, sig.original_name
            )));
        }
        if let Some(previous) = self.assigned.get(&exported) {
            return Err(GenerateError::NamingCollision(format!(
                "'{}' would be exported for both '{}' and '{}'",
                exported, previous, sig.original_name
            )));
        }

        self.assigned.insert(exported.clone(), sig.original_name.clone());
        Ok(exported)
    }

    pub fn assigned(&self) -> &IndexMap<String, String> {
        &self.assigned
    }
}

/* Distinct declarations sharing one original name cannot both be forwarded to */
pub fn check_original_names<'a, 'b>(
    wrapped: impl IntoIterator<Item = &'a str>,
    all_names: impl IntoIterator<Item = &'b str>,
) -> Result<(), GenerateError> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for name in all_names {
        *counts.entry(name).or_default() += 1;
    }
    for name in wrapped {
        let count = counts.get(name).copied().unwrap_or(0);
        if count > 1 {
            return Err(GenerateError::NamingCollision(format!(
                "'{}' has {} conflicting declarations",
                name, count
            )));
        }
    }
    Ok(())
}
