use crate::codegen::c_gen::Forwarder;
use crate::errors::GenerateError;
use shim_loader::header::lexer::Token;
use shim_loader::{parse_source, ScanOptions};
use shim_types::{LinkageKind, TypeConventions};
use tracing::debug;

/// Re-read an emitted translation unit and check that every definition is a
/// pure pass-through of the forwarder it was rendered from.
///
/// The unit is parsed with the same scanner that reads library headers, so
/// anything the emitter got wrong (or anyone edited by hand) shows up as a
/// signature or body that no longer matches.
pub fn verify_translation_unit(
    unit: &str,
    forwarders: &[Forwarder],
    conventions: &TypeConventions,
) -> Result<(), GenerateError> {
    let options = ScanOptions {
        attribute_macros: Vec::new(),
        inline_markers: Vec::new(),
        include_macros: true,
    };
    let parsed = parse_source(unit, &options, conventions).map_err(|e| GenerateError::SemanticDrift {
        name: "<translation unit>".to_string(),
        detail: e.to_string(),
    })?;

    if let Some(def) = parsed.macros.first() {
        return Err(drift(&def.name, "the unit defines a macro"));
    }
    if let Some(proto) = parsed.functions.iter().find(|f| f.body.is_none()) {
        return Err(drift(&proto.declaration.original_name, "declaration without a body"));
    }
    if parsed.functions.len() != forwarders.len() {
        return Err(drift(
            "<translation unit>",
            &format!(
                "{} definitions for {} forwarders",
                parsed.functions.len(),
                forwarders.len()
            ),
        ));
    }

    for (function, forwarder) in parsed.functions.iter().zip(forwarders) {
        let decl = &function.declaration;
        let sig = &forwarder.signature;
        let name = forwarder.exported_name.as_str();

        if decl.original_name != name {
            return Err(drift(name, &format!("found '{}' in its place", decl.original_name)));
        }
        if decl.linkage_kind != LinkageKind::Extern {
            return Err(drift(name, "definition has no external linkage"));
        }
        if let Some(reason) = &decl.unsupported {
            return Err(drift(name, reason));
        }
        if decl.is_variadic {
            return Err(drift(name, "definition is variadic"));
        }

        let found_return = decl.return_type.as_ref().map(|t| t.render()).unwrap_or_default();
        if found_return != sig.return_type.render() {
            return Err(drift(
                name,
                &format!("returns '{}', expected '{}'", found_return, sig.return_type.render()),
            ));
        }

        if decl.parameters.len() != sig.params.len() {
            return Err(drift(
                name,
                &format!("{} parameters, expected {}", decl.parameters.len(), sig.params.len()),
            ));
        }
        for (index, (found, expected)) in decl.parameters.iter().zip(&sig.params).enumerate() {
            let found_ty = found.ty.as_ref().map(|t| t.render()).unwrap_or_default();
            if found.name.as_deref() != Some(expected.name.as_str()) || found_ty != expected.ty.render() {
                return Err(drift(
                    name,
                    &format!(
                        "parameter {} is '{}', expected '{}'",
                        index,
                        found.ty
                            .as_ref()
                            .map(|t| t.declare(found.name.as_deref().unwrap_or("")))
                            .unwrap_or_default(),
                        expected.ty.declare(&expected.name)
                    ),
                ));
            }
        }

        let body = function.body.as_deref().unwrap_or_default();
        let expected = expected_body(forwarder);
        let found: Vec<&str> = body.iter().map(|t: &Token| t.text.as_str()).collect();
        if found != expected {
            return Err(drift(
                name,
                &format!("body is `{}`, expected `{}`", found.join(" "), expected.join(" ")),
            ));
        }
    }

    debug!(forwarders = forwarders.len(), "translation unit verified");
    Ok(())
}

/* `[return] primitive ( a , b ) ;` */
fn expected_body(forwarder: &Forwarder) -> Vec<&str> {
    let sig = &forwarder.signature;
    let mut tokens = Vec::new();
    if !sig.returns_void() {
        tokens.push("return");
    }
    tokens.push(sig.original_name.as_str());
    tokens.push("(");
    for (idx, param) in sig.params.iter().enumerate() {
        if idx > 0 {
            tokens.push(",");
        }
        tokens.push(param.name.as_str());
    }
    tokens.push(")");
    tokens.push(";");
    tokens
}

fn drift(name: &str, detail: &str) -> GenerateError {
    GenerateError::SemanticDrift {
        name: name.to_string(),
        detail: detail.to_string(),
    }
}
