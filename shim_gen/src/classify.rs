use rayon::prelude::*;
use shim_types::{Declaration, LinkageKind};
use thiserror::Error;

/// Why a declaration cannot be given a forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// `...` cannot be forwarded without a `va_list` twin
    #[error("variadic")]
    Variadic,

    /// The header scanner could not keep the declarator verbatim
    #[error("unsupported declarator: {0}")]
    Unsupported(String),

    /// A text macro whose result or parameter carries no type
    #[error("untyped macro {}", describe_untyped(.0))]
    UntypedMacro(Option<String>),

    #[error("invalid parameter {index}: {detail}")]
    InvalidParameter { index: usize, detail: String },

    #[error("invalid return type '{0}'")]
    InvalidReturn(String),
}

fn describe_untyped(parameter: &Option<String>) -> String {
    match parameter {
        Some(name) => format!("parameter '{}'", name),
        None => "result".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Already has linkage; nothing to emit
    Skip,
    Shim,
    Reject(RejectReason),
}

/* Decided from linkage and declarator shape alone */
pub fn classify(decl: &Declaration) -> Classification {
    if decl.linkage_kind == LinkageKind::Extern {
        return Classification::Skip;
    }
    if let Some(reason) = &decl.unsupported {
        return Classification::Reject(RejectReason::Unsupported(reason.clone()));
    }
    if decl.is_variadic {
        return Classification::Reject(RejectReason::Variadic);
    }
    Classification::Shim
}

/* The three buckets, each in input order */
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub shim: Vec<&'a Declaration>,
    pub skip: Vec<&'a Declaration>,
    pub reject: Vec<(&'a Declaration, RejectReason)>,
}

pub fn partition(declarations: &[Declaration], parallel: bool) -> Partition<'_> {
    let classes: Vec<Classification> = if parallel {
        declarations.par_iter().map(classify).collect()
    } else {
        declarations.iter().map(classify).collect()
    };

    let mut out = Partition::default();
    for (decl, class) in declarations.iter().zip(classes) {
        match class {
            Classification::Skip => out.skip.push(decl),
            Classification::Shim => out.shim.push(decl),
            Classification::Reject(reason) => out.reject.push((decl, reason)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shim_types::{CType, Parameter};

    fn decl(name: &str, linkage: LinkageKind) -> Declaration {
        Declaration::new(name, linkage).returning(CType::void())
    }

    #[test]
    fn linkage_decides() {
        assert_eq!(classify(&decl("fmpz_add", LinkageKind::Extern)), Classification::Skip);
        assert_eq!(classify(&decl("fmpz_zero", LinkageKind::Inline)), Classification::Shim);
        assert_eq!(classify(&decl("FLINT_ABS", LinkageKind::Macro)), Classification::Shim);
    }

    #[test]
    fn variadic_and_unsupported_reject() {
        let mut printf = decl("flint_printf", LinkageKind::Inline);
        printf.is_variadic = true;
        assert_eq!(classify(&printf), Classification::Reject(RejectReason::Variadic));

        let mut callback = decl("thread_pool_wake", LinkageKind::Inline);
        callback.unsupported = Some("function pointer parameter".to_string());
        assert!(matches!(
            classify(&callback),
            Classification::Reject(RejectReason::Unsupported(_))
        ));

        /* Existing symbols are never rejected, whatever their shape */
        let mut extern_printf = decl("flint_printf", LinkageKind::Extern);
        extern_printf.is_variadic = true;
        assert_eq!(classify(&extern_printf), Classification::Skip);
    }

    #[test]
    fn classification_is_idempotent() {
        let d = decl("n_randint", LinkageKind::Inline)
            .with_param(Parameter::typed(Some("state"), "flint_rand_t".parse().unwrap()));
        assert_eq!(classify(&d), classify(&d));
    }

    #[test]
    fn partition_keeps_order() {
        let mut variadic = decl("v", LinkageKind::Macro);
        variadic.is_variadic = true;
        let decls = vec![
            decl("a", LinkageKind::Inline),
            decl("b", LinkageKind::Extern),
            variadic,
            decl("c", LinkageKind::Macro),
            decl("d", LinkageKind::Extern),
        ];
        for parallel in [false, true] {
            let p = partition(&decls, parallel);
            let shim: Vec<_> = p.shim.iter().map(|d| d.original_name.as_str()).collect();
            let skip: Vec<_> = p.skip.iter().map(|d| d.original_name.as_str()).collect();
            assert_eq!(shim, vec!["a", "c"]);
            assert_eq!(skip, vec!["b", "d"]);
            assert_eq!(p.reject.len(), 1);
            assert_eq!(p.reject[0].1, RejectReason::Variadic);
        }
    }

    #[test]
    fn reasons_read_well() {
        assert_eq!(RejectReason::UntypedMacro(None).to_string(), "untyped macro result");
        assert_eq!(
            RejectReason::UntypedMacro(Some("x".to_string())).to_string(),
            "untyped macro parameter 'x'"
        );
    }
}
