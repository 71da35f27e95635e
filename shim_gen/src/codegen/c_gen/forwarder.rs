use super::helpers::{format_arg_list, format_param_list};
use crate::signature::PreservedSignature;

/* A preserved signature together with the name it is exported under */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarder {
    pub exported_name: String,
    pub signature: PreservedSignature,
}

impl Forwarder {
    pub fn forwards_to(&self) -> &str {
        &self.signature.original_name
    }
}

/// One-line definition whose body is a single call to the primitive.
///
/// The call is the whole body: no checks, conversions or branches, and a
/// `return` exactly when the primitive returns a value.
pub fn emit_forwarder(forwarder: &Forwarder) -> String {
    let sig = &forwarder.signature;
    let call = format!("{}({})", sig.original_name, format_arg_list(&sig.params));
    let body = if sig.returns_void() {
        format!("{};", call)
    } else {
        format!("return {};", call)
    };

    format!(
        "{}{}({}) {{ {} }}\n",
        sig.return_type.return_prefix(),
        forwarder.exported_name,
        format_param_list(&sig.params),
        body
    )
}
