use crate::ctype::{is_type_keyword, CType};
use crate::types::{Direction, Ownership};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;

/* What a pointer parameter points at, as far as a binding layer cares */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Pointee {
    /* Limbs, counters, doubles: plain memory */
    Scalar,
    /* Opaque number representation (integer, ball, polynomial, matrix, ...) */
    Record,
    /* Ring/field descriptor, modulus or precision carrier, random state */
    Context,
    /* `void *` */
    Untyped,
}

/* `srcptr` is a shared view, `ptr` may be written through */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Aliasing {
    Srcptr,
    Ptr,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TypeClass {
    Void,
    Value,
    Pointer { pointee: Pointee, aliasing: Aliasing },
}

/// Naming conventions that decide how a header type is passed.
///
/// The library hides most pointers behind typedefs: `fmpz_t` is a one
/// element array (so it decays to a pointer), `arb_srcptr` is a const
/// pointer, `gr_ptr` a mutable one. These rules only label parameters for
/// the manifest; the emitted C never depends on them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TypeConventions {
    /* Integer/float typedefs; values when passed directly, scalars behind pointers */
    pub scalar_types: BTreeSet<String>,

    /* `*_t` typedefs that are passed by value rather than being array typedefs */
    pub by_value_types: BTreeSet<String>,

    /* Exact context type names */
    pub context_types: BTreeSet<String>,

    /* Suffixes marking context types (`_ctx_t`, `_ctx_struct`) */
    pub context_suffixes: Vec<String>,

    /* Pointer aliases onto limb arrays */
    pub scalar_pointer_aliases: BTreeSet<String>,

    pub array_typedef_suffix: String,
    pub const_alias_suffix: String,
    pub mutable_alias_suffix: String,
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for TypeConventions {
    fn default() -> Self {
        Self {
            scalar_types: set(&[
                "slong",
                "ulong",
                "mp_limb_t",
                "mp_limb_signed_t",
                "mp_size_t",
                "mp_bitcnt_t",
                "flint_bitcnt_t",
                "truth_t",
                "ordering_t",
                "size_t",
                "ssize_t",
                "int8_t",
                "int16_t",
                "int32_t",
                "int64_t",
                "uint8_t",
                "uint16_t",
                "uint32_t",
                "uint64_t",
                "intptr_t",
                "uintptr_t",
            ]),
            by_value_types: set(&["nmod_t", "di_t", "fmpz", "n_primes_t"]),
            context_types: set(&["gr_ctx_t", "flint_rand_t", "flint_rand_s", "thread_pool_handle"]),
            context_suffixes: vec!["_ctx_t".to_string(), "_ctx_struct".to_string()],
            scalar_pointer_aliases: set(&["nn_ptr", "nn_srcptr", "mp_ptr", "mp_srcptr"]),
            array_typedef_suffix: "_t".to_string(),
            const_alias_suffix: "_srcptr".to_string(),
            mutable_alias_suffix: "_ptr".to_string(),
        }
    }
}

impl TypeConventions {
    fn base_is_context(&self, base: &str) -> bool {
        let bare = base.strip_prefix("struct ").unwrap_or(base);
        self.context_types.contains(bare)
            || self.context_suffixes.iter().any(|s| bare.ends_with(s.as_str()))
    }

    fn base_is_scalar(&self, base: &str) -> bool {
        base.split(' ').all(is_type_keyword) || self.scalar_types.contains(base)
    }

    fn pointee_of(&self, base: &str) -> Pointee {
        if base == "void" {
            Pointee::Untyped
        } else if self.base_is_context(base) {
            Pointee::Context
        } else if self.base_is_scalar(base) {
            Pointee::Scalar
        } else {
            Pointee::Record
        }
    }

    pub fn classify(&self, ty: &CType) -> TypeClass {
        let base = ty.base_name();

        if ty.pointer_depth() > 0 {
            let aliasing = if ty.is_const_pointee() {
                Aliasing::Srcptr
            } else {
                Aliasing::Ptr
            };
            return TypeClass::Pointer {
                pointee: self.pointee_of(&base),
                aliasing,
            };
        }

        if ty.is_void() {
            return TypeClass::Void;
        }

        /* Pointer aliases hidden behind typedef names */
        if self.scalar_pointer_aliases.contains(&base) {
            let aliasing = if base.ends_with(&self.const_alias_suffix) || ty.is_const_pointee() {
                Aliasing::Srcptr
            } else {
                Aliasing::Ptr
            };
            return TypeClass::Pointer {
                pointee: Pointee::Scalar,
                aliasing,
            };
        }
        if let Some(stem) = base.strip_suffix(&self.const_alias_suffix) {
            return TypeClass::Pointer {
                pointee: self.alias_pointee(stem),
                aliasing: Aliasing::Srcptr,
            };
        }
        if let Some(stem) = base.strip_suffix(&self.mutable_alias_suffix) {
            let aliasing = if ty.is_const_pointee() {
                Aliasing::Srcptr
            } else {
                Aliasing::Ptr
            };
            return TypeClass::Pointer {
                pointee: self.alias_pointee(stem),
                aliasing,
            };
        }

        let array_typedef = base.ends_with(&self.array_typedef_suffix)
            && !self.scalar_types.contains(&base)
            && !self.by_value_types.contains(&base)
            && !base.contains(' ');
        if array_typedef || self.context_types.contains(&base) {
            let aliasing = if ty.is_const_pointee() {
                Aliasing::Srcptr
            } else {
                Aliasing::Ptr
            };
            let pointee = if self.base_is_context(&base) {
                Pointee::Context
            } else {
                Pointee::Record
            };
            return TypeClass::Pointer { pointee, aliasing };
        }

        TypeClass::Value
    }

    fn alias_pointee(&self, stem: &str) -> Pointee {
        if stem.ends_with("_ctx") {
            Pointee::Context
        } else {
            Pointee::Record
        }
    }

    pub fn default_direction(&self, ty: &CType) -> Direction {
        match self.classify(ty) {
            TypeClass::Pointer {
                aliasing: Aliasing::Ptr,
                ..
            } => Direction::InOut,
            _ => Direction::In,
        }
    }

    pub fn default_ownership(&self, ty: &CType) -> Ownership {
        match self.classify(ty) {
            TypeClass::Pointer { .. } => Ownership::Borrowed,
            TypeClass::Void | TypeClass::Value => Ownership::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(s: &str) -> TypeClass {
        TypeConventions::default().classify(&s.parse().unwrap())
    }

    fn ptr(pointee: Pointee, aliasing: Aliasing) -> TypeClass {
        TypeClass::Pointer { pointee, aliasing }
    }

    #[test]
    fn array_typedefs_decay_to_record_pointers() {
        assert_eq!(class("fmpz_t"), ptr(Pointee::Record, Aliasing::Ptr));
        assert_eq!(class("const fmpz_t"), ptr(Pointee::Record, Aliasing::Srcptr));
        assert_eq!(class("fmpz_mod_poly_factor_t"), ptr(Pointee::Record, Aliasing::Ptr));
    }

    #[test]
    fn contexts_are_recognised() {
        assert_eq!(class("const fmpz_mod_ctx_t"), ptr(Pointee::Context, Aliasing::Srcptr));
        assert_eq!(class("gr_ctx_t"), ptr(Pointee::Context, Aliasing::Ptr));
        assert_eq!(class("flint_rand_t"), ptr(Pointee::Context, Aliasing::Ptr));
        assert_eq!(class("gr_ctx_struct *"), ptr(Pointee::Context, Aliasing::Ptr));
    }

    #[test]
    fn aliases_carry_their_aliasing_class() {
        assert_eq!(class("arb_srcptr"), ptr(Pointee::Record, Aliasing::Srcptr));
        assert_eq!(class("gr_ptr"), ptr(Pointee::Record, Aliasing::Ptr));
        assert_eq!(class("nn_srcptr"), ptr(Pointee::Scalar, Aliasing::Srcptr));
        assert_eq!(class("nn_ptr"), ptr(Pointee::Scalar, Aliasing::Ptr));
    }

    #[test]
    fn values_and_plain_pointers() {
        assert_eq!(class("slong"), TypeClass::Value);
        assert_eq!(class("nmod_t"), TypeClass::Value);
        assert_eq!(class("unsigned long"), TypeClass::Value);
        assert_eq!(class("double"), TypeClass::Value);
        assert_eq!(class("void"), TypeClass::Void);
        assert_eq!(class("ulong *"), ptr(Pointee::Scalar, Aliasing::Ptr));
        assert_eq!(class("const fmpz *"), ptr(Pointee::Record, Aliasing::Srcptr));
        assert_eq!(class("void *"), ptr(Pointee::Untyped, Aliasing::Ptr));
        assert_eq!(class("ulong[2]"), ptr(Pointee::Scalar, Aliasing::Ptr));
    }

    #[test]
    fn default_direction_and_ownership() {
        let conv = TypeConventions::default();
        let out: CType = "fmpz_t".parse().unwrap();
        let input: CType = "const fmpz_t".parse().unwrap();
        let value: CType = "slong".parse().unwrap();
        assert_eq!(conv.default_direction(&out), Direction::InOut);
        assert_eq!(conv.default_direction(&input), Direction::In);
        assert_eq!(conv.default_direction(&value), Direction::In);
        assert_eq!(conv.default_ownership(&out), Ownership::Borrowed);
        assert_eq!(conv.default_ownership(&value), Ownership::None);
    }
}
