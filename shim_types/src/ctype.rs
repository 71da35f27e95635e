use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/* Builtin C type words. None of these can be a parameter name. */
pub const TYPE_KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "_Complex", "bool",
];

/* Qualifiers that may appear anywhere in a type without changing its base */
pub const QUALIFIERS: &[&str] = &["const", "volatile", "restrict", "__restrict", "__restrict__"];

/* Tag keywords; the word following one of these is part of the type */
pub const TAG_KEYWORDS: &[&str] = &["struct", "union", "enum"];

pub fn is_type_keyword(word: &str) -> bool {
    TYPE_KEYWORDS.contains(&word)
}

pub fn is_qualifier(word: &str) -> bool {
    QUALIFIERS.contains(&word)
}

pub fn is_tag_keyword(word: &str) -> bool {
    TAG_KEYWORDS.contains(&word)
}

pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CTypeError {
    #[error("empty type")]
    Empty,

    #[error("unexpected character '{0}' in type '{1}'")]
    UnexpectedChar(char, String),

    #[error("unbalanced brackets in type '{0}'")]
    UnbalancedBrackets(String),

    #[error("type '{0}' has no base type before its first '*'")]
    MissingBase(String),

    #[error("unexpected token '{token}' in type '{ty}'")]
    UnexpectedToken { token: String, ty: String },
}

/// A C type kept as the exact token sequence it was written with.
///
/// Nothing is normalised: `fmpz const *` and `const fmpz *` stay distinct, so
/// a forwarder declared with the rendered form compiles against the same
/// header without any implicit conversion. Array parameters keep their
/// bracket suffix separately because the declarator name sits between the
/// two halves (`ulong x[2]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CType {
    tokens: Vec<String>,
    array_suffix: Option<String>,
}

impl CType {
    /* Build a type from already lexed tokens (words, '*', and bracket groups) */
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, CTypeError> {
        let spelled = tokens.iter().map(|t| t.as_ref()).collect::<Vec<_>>().join(" ");
        let mut words: Vec<String> = Vec::new();
        let mut array_suffix = String::new();
        let mut idx = 0;

        while idx < tokens.len() {
            let tok = tokens[idx].as_ref();
            if tok == "[" {
                /* Gather a bracket group spread over several tokens */
                let mut inner: Vec<&str> = Vec::new();
                idx += 1;
                loop {
                    match tokens.get(idx).map(|t| t.as_ref()) {
                        Some("]") => break,
                        Some("[") | None => return Err(CTypeError::UnbalancedBrackets(spelled)),
                        Some(t) => inner.push(t),
                    }
                    idx += 1;
                }
                array_suffix.push('[');
                array_suffix.push_str(&join_bracket_contents(&inner));
                array_suffix.push(']');
            } else if tok.starts_with('[') {
                if !tok.ends_with(']') {
                    return Err(CTypeError::UnbalancedBrackets(spelled));
                }
                array_suffix.push_str(tok);
            } else if !array_suffix.is_empty() {
                /* Nothing may follow the array suffix */
                return Err(CTypeError::UnexpectedToken {
                    token: tok.to_string(),
                    ty: spelled,
                });
            } else if tok == "*" || is_identifier(tok) {
                words.push(tok.to_string());
            } else {
                return Err(CTypeError::UnexpectedToken {
                    token: tok.to_string(),
                    ty: spelled,
                });
            }
            idx += 1;
        }

        if words.is_empty() {
            return Err(CTypeError::Empty);
        }

        let has_base = words
            .iter()
            .take_while(|w| *w != "*")
            .any(|w| !is_qualifier(w));
        if !has_base {
            return Err(CTypeError::MissingBase(spelled));
        }

        Ok(Self {
            tokens: words,
            array_suffix: if array_suffix.is_empty() {
                None
            } else {
                Some(array_suffix)
            },
        })
    }

    pub fn void() -> Self {
        Self {
            tokens: vec!["void".to_string()],
            array_suffix: None,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn array_suffix(&self) -> Option<&str> {
        self.array_suffix.as_deref()
    }

    pub fn is_void(&self) -> bool {
        self.array_suffix.is_none() && self.tokens.len() == 1 && self.tokens[0] == "void"
    }

    /* Number of explicit indirections, counting an array suffix as one */
    pub fn pointer_depth(&self) -> usize {
        let stars = self.tokens.iter().filter(|t| *t == "*").count();
        stars + usize::from(self.array_suffix.is_some())
    }

    /* True when `const` qualifies the innermost pointee (before the first '*') */
    pub fn is_const_pointee(&self) -> bool {
        self.tokens
            .iter()
            .take_while(|t| *t != "*")
            .any(|t| t == "const")
    }

    /* The unqualified base type words, e.g. `unsigned long` or `struct foo` */
    pub fn base_name(&self) -> String {
        self.tokens
            .iter()
            .take_while(|t| *t != "*")
            .filter(|t| !is_qualifier(t))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /* Render the type without a declarator name */
    pub fn render(&self) -> String {
        let mut out = render_words(&self.tokens);
        if let Some(suffix) = &self.array_suffix {
            out.push_str(suffix);
        }
        out
    }

    /* Render a declaration of `name` with this type, e.g. `ulong *seed1` */
    pub fn declare(&self, name: &str) -> String {
        let base = render_words(&self.tokens);
        let suffix = self.array_suffix.as_deref().unwrap_or("");
        if base.ends_with('*') {
            format!("{}{}{}", base, name, suffix)
        } else {
            format!("{} {}{}", base, name, suffix)
        }
    }

    /* Text placed before a function name when this is a return type */
    pub fn return_prefix(&self) -> String {
        format!("{} ", render_words(&self.tokens))
    }
}

fn render_words(words: &[String]) -> String {
    let mut out = String::new();
    for word in words {
        if out.is_empty() {
            out.push_str(word);
        } else if word == "*" {
            if out.ends_with('*') {
                out.push('*');
            } else {
                out.push_str(" *");
            }
        } else {
            out.push(' ');
            out.push_str(word);
        }
    }
    out
}

fn join_bracket_contents(inner: &[&str]) -> String {
    let mut out = String::new();
    let mut prev_word = false;
    for tok in inner {
        let word = tok.chars().all(|c| c == '_' || c.is_ascii_alphanumeric());
        if word && prev_word {
            out.push(' ');
        }
        out.push_str(tok);
        prev_word = word;
    }
    out
}

/* Split a type string into words, '*', and whole bracket groups */
fn lex_type(text: &str) -> Result<Vec<String>, CTypeError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '*' {
            tokens.push("*".to_string());
            chars.next();
        } else if c == '[' {
            let mut depth = 0usize;
            let mut end = None;
            for (idx, ch) in chars.by_ref() {
                match ch {
                    '[' => depth += 1,
                    ']' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(idx);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            let end = end.ok_or_else(|| CTypeError::UnbalancedBrackets(text.to_string()))?;
            let inner = text[start + 1..end].split_whitespace().collect::<Vec<_>>();
            tokens.push(format!("[{}]", join_bracket_contents(&inner)));
        } else if c == '_' || c.is_ascii_alphanumeric() {
            let mut end = start;
            while let Some(&(idx, ch)) = chars.peek() {
                if ch == '_' || ch.is_ascii_alphanumeric() {
                    end = idx + ch.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(text[start..end].to_string());
        } else {
            return Err(CTypeError::UnexpectedChar(c, text.to_string()));
        }
    }

    Ok(tokens)
}

impl FromStr for CType {
    type Err = CTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = lex_type(s)?;
        Self::from_tokens(&tokens)
    }
}

impl TryFrom<String> for CType {
    type Error = CTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CType> for String {
    fn from(ty: CType) -> Self {
        ty.render()
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> CType {
        s.parse().unwrap()
    }

    #[test]
    fn renders_pointers_like_the_header() {
        assert_eq!(ty("const fmpz*").render(), "const fmpz *");
        assert_eq!(ty("n_poly_struct * *").render(), "n_poly_struct **");
        assert_eq!(ty("fmpz const * const").render(), "fmpz const * const");
        assert_eq!(ty("unsigned   long").render(), "unsigned long");
    }

    #[test]
    fn declares_names_next_to_stars() {
        assert_eq!(ty("ulong *").declare("seed1"), "ulong *seed1");
        assert_eq!(ty("const fmpz_mod_ctx_t").declare("ctx"), "const fmpz_mod_ctx_t ctx");
        assert_eq!(ty("ulong[2]").declare("x"), "ulong x[2]");
        assert_eq!(ty("const fmpz *").return_prefix(), "const fmpz * ");
    }

    #[test]
    fn pointer_shape_queries() {
        let t = ty("const fmpz *");
        assert_eq!(t.pointer_depth(), 1);
        assert!(t.is_const_pointee());
        assert_eq!(t.base_name(), "fmpz");

        let t = ty("fmpz * const");
        assert!(!t.is_const_pointee());

        let t = ty("ulong [FLINT_BITS]");
        assert_eq!(t.pointer_depth(), 1);
        assert_eq!(t.array_suffix(), Some("[FLINT_BITS]"));

        assert!(ty("void").is_void());
        assert!(!ty("void *").is_void());
        assert_eq!(ty("struct la_col_t *").base_name(), "struct la_col_t");
    }

    #[test]
    fn header_tokens_with_split_brackets() {
        let t = CType::from_tokens(&["ulong", "[", "2", "]"]).unwrap();
        assert_eq!(t.declare("a"), "ulong a[2]");
    }

    #[test]
    fn rejects_malformed_types() {
        assert_eq!("".parse::<CType>(), Err(CTypeError::Empty));
        assert!(matches!("const *".parse::<CType>(), Err(CTypeError::MissingBase(_))));
        assert!(matches!("int (*)(void)".parse::<CType>(), Err(CTypeError::UnexpectedChar('(', _))));
        assert!(matches!("ulong [2".parse::<CType>(), Err(CTypeError::UnbalancedBrackets(_))));
        assert!(matches!(
            "ulong [2] x".parse::<CType>(),
            Err(CTypeError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn serializes_as_rendered_string() {
        let t = ty("const fmpz_t");
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"const fmpz_t\"");
        let back: CType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
