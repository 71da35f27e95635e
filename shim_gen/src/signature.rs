use crate::classify::RejectReason;
use shim_types::{CType, Declaration, Direction, LinkageKind, Ownership, TypeClass, TypeConventions};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedParam {
    pub name: String,
    pub ty: CType,
    pub direction: Direction,
    pub ownership: Ownership,
    pub class: TypeClass,
}

/// A declaration's calling convention, ready to be written back out.
///
/// Types are the header's own spelling. Only missing parameter names are
/// invented; names are not part of a C function type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedSignature {
    pub original_name: String,
    pub linkage: LinkageKind,
    pub header: Option<String>,
    pub return_type: CType,
    pub params: Vec<PreservedParam>,
}

impl PreservedSignature {
    pub fn returns_void(&self) -> bool {
        self.return_type.is_void()
    }
}

pub fn preserve(
    decl: &Declaration,
    conventions: &TypeConventions,
) -> Result<PreservedSignature, RejectReason> {
    let return_type = decl
        .return_type
        .clone()
        .ok_or(RejectReason::UntypedMacro(None))?;
    if return_type.array_suffix().is_some() {
        return Err(RejectReason::InvalidReturn(return_type.render()));
    }

    /* `f(void)` is an empty list; the scanner normally folds it already */
    let declared = match decl.parameters.as_slice() {
        [only] if only.name.is_none() && only.ty.as_ref().is_some_and(CType::is_void) => &[][..],
        params => params,
    };

    let mut used: HashSet<&str> = declared.iter().filter_map(|p| p.name.as_deref()).collect();
    used.insert(decl.original_name.as_str());

    let mut seen: HashSet<String> = HashSet::new();
    let mut params = Vec::with_capacity(declared.len());
    for (index, param) in declared.iter().enumerate() {
        let ty = match &param.ty {
            Some(ty) => ty.clone(),
            None => return Err(RejectReason::UntypedMacro(param.name.clone())),
        };
        if ty.is_void() {
            return Err(RejectReason::InvalidParameter {
                index,
                detail: "'void' is only valid as the sole unnamed parameter".to_string(),
            });
        }

        /* A parameter named like the primitive would shadow it inside the forwarder body */
        let name = match param.name.as_deref() {
            Some(name) if name != decl.original_name => name.to_string(),
            _ => fresh_name(index, &used, &seen),
        };
        if !seen.insert(name.clone()) {
            return Err(RejectReason::InvalidParameter {
                index,
                detail: format!("duplicate parameter name '{}'", name),
            });
        }

        params.push(PreservedParam {
            name,
            class: conventions.classify(&ty),
            direction: param.direction,
            ownership: param.ownership,
            ty,
        });
    }

    Ok(PreservedSignature {
        original_name: decl.original_name.clone(),
        linkage: decl.linkage_kind,
        header: decl.header.clone(),
        return_type,
        params,
    })
}

fn fresh_name(index: usize, used: &HashSet<&str>, seen: &HashSet<String>) -> String {
    let mut name = format!("arg{}", index);
    while used.contains(name.as_str()) || seen.contains(&name) {
        name.push('_');
    }
    name
}
