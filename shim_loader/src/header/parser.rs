use super::errors::ParseError;
use super::lexer::{Token, TokenKind};
use super::preprocess::MacroDef;
use super::ScanOptions;
use shim_types::ctype::{is_qualifier, is_tag_keyword, is_type_keyword};
use shim_types::{CType, Declaration, LinkageKind, Parameter, TypeConventions};
use tracing::debug;

/* Words that decorate a declaration without being part of its type */
const ATTRIBUTE_WORDS: &[&str] = &[
    "__attribute__",
    "__attribute",
    "__declspec",
    "__asm__",
    "__asm",
    "asm",
];

const IGNORED_SPECIFIERS: &[&str] = &["extern", "_Noreturn", "__extension__", "register"];

const INLINE_WORDS: &[&str] = &["inline", "__inline", "__inline__"];

/* A prototype or definition found at file scope */
#[derive(Debug, Clone)]
pub struct ParsedFunction {
    pub declaration: Declaration,
    /* Tokens between the braces of a definition */
    pub body: Option<Vec<Token>>,
    pub line: usize,
}

/* Index of the delimiter closing the one at `open` */
fn matching(tokens: &[Token], open: usize) -> Result<usize, ParseError> {
    let mut expected: Vec<&str> = Vec::new();
    for (idx, tok) in tokens.iter().enumerate().skip(open) {
        match tok.text.as_str() {
            "(" => expected.push(")"),
            "[" => expected.push("]"),
            "{" => expected.push("}"),
            ")" | "]" | "}" => {
                if expected.pop() != Some(tok.text.as_str()) {
                    return Err(ParseError::Unbalanced {
                        line: tok.line,
                        delimiter: tok.text.chars().next().unwrap_or(')'),
                    });
                }
                if expected.is_empty() {
                    return Ok(idx);
                }
            }
            _ => {}
        }
    }
    let opener = &tokens[open];
    Err(ParseError::Unbalanced {
        line: opener.line,
        delimiter: opener.text.chars().next().unwrap_or('('),
    })
}

/* Position of `text` outside any bracket group */
fn top_level_position(tokens: &[Token], text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, tok) in tokens.iter().enumerate() {
        if depth == 0 && tok.is(text) {
            return Some(idx);
        }
        match tok.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn split_top_level<'t>(tokens: &'t [Token], separator: &str) -> Vec<&'t [Token]> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, tok) in tokens.iter().enumerate() {
        match tok.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth = depth.saturating_sub(1),
            s if depth == 0 && s == separator => {
                groups.push(&tokens[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    groups.push(&tokens[start..]);
    groups
}

/* Drop attributes, attribute macros and linkage strings (`extern "C"`) */
fn strip_decorations(tokens: &[Token], options: &ScanOptions) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut idx = 0;
    while idx < tokens.len() {
        let tok = &tokens[idx];
        let decoration = tok.is_ident()
            && (ATTRIBUTE_WORDS.contains(&tok.text.as_str())
                || options.attribute_macros.iter().any(|m| *m == tok.text));
        if decoration {
            idx += 1;
            if idx < tokens.len() && tokens[idx].is("(") {
                idx = matching(tokens, idx).map(|close| close + 1).unwrap_or(tokens.len());
            }
            continue;
        }
        if tok.kind != TokenKind::Str {
            out.push(tok.clone());
        }
        idx += 1;
    }
    out
}

fn is_extern_c(stmt: &[Token]) -> bool {
    stmt.len() == 2 && stmt[0].is("extern") && stmt[1].kind == TokenKind::Str
}

/* `ret name(params)` with nothing after the parameter list */
fn looks_like_function(stmt: &[Token], options: &ScanOptions) -> bool {
    let toks = strip_decorations(stmt, options);
    if toks.is_empty() || toks[0].is("typedef") || !toks.last().is_some_and(|t| t.is(")")) {
        return false;
    }
    match top_level_position(&toks, "(") {
        Some(open) => open > 0 && toks[open - 1].is_ident(),
        None => false,
    }
}

/* Split a parameter into its type tokens and optional name */
fn split_param(tokens: &[Token]) -> (Vec<String>, Option<String>) {
    let array_start = tokens.iter().position(|t| t.is("[")).unwrap_or(tokens.len());
    let core = &tokens[..array_start];

    let named = match core.split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            last.is_ident()
                && !is_type_keyword(&last.text)
                && !is_qualifier(&last.text)
                && !rest.last().is_some_and(|t| is_tag_keyword(&t.text))
                && rest.iter().any(|t| t.is_ident() && !is_qualifier(&t.text))
        }
        _ => false,
    };

    let (type_core, name) = if named {
        (&core[..core.len() - 1], Some(core[core.len() - 1].text.clone()))
    } else {
        (core, None)
    };

    let mut ty: Vec<String> = type_core.iter().map(|t| t.text.clone()).collect();
    ty.extend(tokens[array_start..].iter().map(|t| t.text.clone()));
    (ty, name)
}

fn mark_unsupported(decl: &mut Declaration, reason: String) {
    if decl.unsupported.is_none() {
        decl.unsupported = Some(reason);
    }
}

fn parse_params(decl: &mut Declaration, tokens: &[Token], conventions: &TypeConventions) {
    let groups = split_top_level(tokens, ",");
    if groups.len() == 1 && (groups[0].is_empty() || (groups[0].len() == 1 && groups[0][0].is("void"))) {
        return;
    }

    let last = groups.len() - 1;
    for (idx, group) in groups.iter().enumerate() {
        if group.len() == 1 && group[0].is("...") {
            if idx != last {
                mark_unsupported(decl, "'...' before the last parameter".to_string());
            }
            decl.is_variadic = true;
            continue;
        }
        if group.is_empty() {
            mark_unsupported(decl, format!("empty parameter {}", idx));
            decl.parameters.push(Parameter {
                name: None,
                ty: None,
                direction: Default::default(),
                ownership: Default::default(),
            });
            continue;
        }
        if group.iter().any(|t| t.is("(")) {
            let spelled: Vec<&str> = group.iter().map(|t| t.text.as_str()).collect();
            mark_unsupported(decl, format!("function-pointer parameter '{}'", spelled.join(" ")));
            decl.parameters.push(Parameter {
                name: None,
                ty: None,
                direction: Default::default(),
                ownership: Default::default(),
            });
            continue;
        }

        let (ty_tokens, name) = split_param(group);
        match CType::from_tokens(&ty_tokens) {
            Ok(ty) => decl.parameters.push(Parameter {
                name,
                direction: conventions.default_direction(&ty),
                ownership: conventions.default_ownership(&ty),
                ty: Some(ty),
            }),
            Err(err) => {
                mark_unsupported(decl, format!("parameter {}: {}", idx, err));
                decl.parameters.push(Parameter {
                    name,
                    ty: None,
                    direction: Default::default(),
                    ownership: Default::default(),
                });
            }
        }
    }
}

/* `static`, `inline` or an inline marker ahead of the declarator */
fn declares_local(specifiers: &[Token], options: &ScanOptions) -> bool {
    specifiers.iter().any(|t| {
        let word = t.text.as_str();
        word == "static" || INLINE_WORDS.contains(&word) || options.is_inline_marker(word)
    })
}

fn declares_inline(specifiers: &[Token], options: &ScanOptions) -> bool {
    specifiers
        .iter()
        .any(|t| INLINE_WORDS.contains(&t.text.as_str()) || options.is_inline_marker(&t.text))
}

/* A local definition `looks_like_function` refuses, e.g. one with tokens after its parameters */
fn looks_like_local_function(stmt: &[Token], options: &ScanOptions) -> bool {
    let toks = strip_decorations(stmt, options);
    if toks.is_empty() || toks[0].is("typedef") || top_level_position(&toks, "=").is_some() {
        return false;
    }
    match top_level_position(&toks, "(") {
        Some(open) => declares_local(&toks[..open], options),
        None => false,
    }
}

/* First identifier called like a function that is not a keyword or specifier */
fn declarator_name<'t>(toks: &'t [Token], options: &ScanOptions) -> Option<&'t Token> {
    toks.windows(2)
        .find(|pair| {
            let word = pair[0].text.as_str();
            pair[0].is_ident()
                && pair[1].is("(")
                && !is_type_keyword(word)
                && !is_qualifier(word)
                && word != "static"
                && !INLINE_WORDS.contains(&word)
                && !IGNORED_SPECIFIERS.contains(&word)
                && !options.is_inline_marker(word)
        })
        .map(|pair| &pair[0])
}

/* A local function the scanner cannot spell back stays in the set as unsupported */
fn unrepresentable(
    toks: &[Token],
    body: Option<Vec<Token>>,
    options: &ScanOptions,
    reason: String,
) -> Result<Option<ParsedFunction>, ParseError> {
    let line = toks[0].line;
    let name = declarator_name(toks, options).ok_or(ParseError::UnnamedFunction { line })?;
    debug!(line, name = %name.text, %reason, "local function cannot be represented");
    let mut decl = Declaration::new(&name.text, LinkageKind::Inline);
    mark_unsupported(&mut decl, reason);
    Ok(Some(ParsedFunction {
        declaration: decl,
        body,
        line,
    }))
}

fn spell(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ")
}

fn parse_statement(
    stmt: &[Token],
    body: Option<Vec<Token>>,
    options: &ScanOptions,
    conventions: &TypeConventions,
) -> Result<Option<ParsedFunction>, ParseError> {
    let toks = strip_decorations(stmt, options);
    if toks.is_empty() || toks[0].is("typedef") || top_level_position(&toks, "=").is_some() {
        return Ok(None);
    }
    let line = toks[0].line;

    let Some(open) = top_level_position(&toks, "(") else {
        return Ok(None);
    };
    if open == 0 {
        return Ok(None);
    }
    let local = declares_local(&toks[..open], options);
    /* A bodiless `static` declaration may be data, so only inline ones are kept */
    let keep_unrepresentable = local && (body.is_some() || declares_inline(&toks[..open], options));

    let name_tok = &toks[open - 1];
    if !name_tok.is_ident() || is_type_keyword(&name_tok.text) || is_qualifier(&name_tok.text) {
        if keep_unrepresentable {
            return unrepresentable(
                &toks,
                body,
                options,
                format!("declarator '{}' is not a plain function name", spell(&toks[open..])),
            );
        }
        debug!(line, "skipping declaration without a plain function name");
        return Ok(None);
    }
    let close = matching(&toks, open)?;
    if close + 1 != toks.len() {
        if keep_unrepresentable {
            return unrepresentable(
                &toks,
                body,
                options,
                format!("tokens after the parameter list: '{}'", spell(&toks[close + 1..])),
            );
        }
        debug!(line, name = %name_tok.text, "skipping declarator with trailing tokens");
        return Ok(None);
    }

    let mut ret_tokens: Vec<String> = Vec::new();
    for tok in &toks[..open - 1] {
        let word = tok.text.as_str();
        let specifier = word == "static"
            || INLINE_WORDS.contains(&word)
            || options.is_inline_marker(word)
            || IGNORED_SPECIFIERS.contains(&word);
        if !specifier {
            ret_tokens.push(tok.text.clone());
        }
    }
    if ret_tokens.is_empty() {
        if keep_unrepresentable {
            return unrepresentable(&toks, body, options, "no return type".to_string());
        }
        debug!(line, name = %name_tok.text, "skipping declaration without a return type");
        return Ok(None);
    }

    let linkage = if local {
        LinkageKind::Inline
    } else {
        LinkageKind::Extern
    };
    let mut decl = Declaration::new(&name_tok.text, linkage);
    match CType::from_tokens(&ret_tokens) {
        Ok(ty) => decl.return_type = Some(ty),
        Err(err) => mark_unsupported(&mut decl, format!("return type: {}", err)),
    }
    parse_params(&mut decl, &toks[open + 1..close], conventions);

    Ok(Some(ParsedFunction {
        declaration: decl,
        body,
        line,
    }))
}

/// Collect every file-scope function prototype and definition.
///
/// Aggregate bodies (`struct`, `enum`, initializers) are kept inside their
/// statement and discarded with it; function bodies are captured verbatim.
pub fn parse_functions(
    tokens: &[Token],
    options: &ScanOptions,
    conventions: &TypeConventions,
) -> Result<Vec<ParsedFunction>, ParseError> {
    let mut out = Vec::new();
    let mut stmt: Vec<Token> = Vec::new();
    let mut linkage_blocks = 0usize;
    let mut idx = 0;

    while idx < tokens.len() {
        let tok = &tokens[idx];
        match tok.text.as_str() {
            ";" => {
                if let Some(func) = parse_statement(&stmt, None, options, conventions)? {
                    out.push(func);
                }
                stmt.clear();
                idx += 1;
            }
            "{" => {
                if is_extern_c(&stmt) {
                    linkage_blocks += 1;
                    stmt.clear();
                    idx += 1;
                    continue;
                }
                let close = matching(tokens, idx)?;
                if looks_like_function(&stmt, options) || looks_like_local_function(&stmt, options) {
                    let body = tokens[idx + 1..close].to_vec();
                    if let Some(func) = parse_statement(&stmt, Some(body), options, conventions)? {
                        out.push(func);
                    }
                    stmt.clear();
                } else {
                    stmt.extend_from_slice(&tokens[idx..=close]);
                }
                idx = close + 1;
            }
            "}" => {
                if linkage_blocks == 0 {
                    return Err(ParseError::Unbalanced {
                        line: tok.line,
                        delimiter: '}',
                    });
                }
                linkage_blocks -= 1;
                stmt.clear();
                idx += 1;
            }
            "(" | "[" => {
                let close = matching(tokens, idx)?;
                stmt.extend_from_slice(&tokens[idx..=close]);
                idx = close + 1;
            }
            ")" | "]" => {
                return Err(ParseError::Unbalanced {
                    line: tok.line,
                    delimiter: tok.text.chars().next().unwrap_or(')'),
                });
            }
            _ => {
                stmt.push(tok.clone());
                idx += 1;
            }
        }
    }

    if !stmt.is_empty() {
        debug!(line = stmt[0].line, "ignoring trailing tokens without ';'");
    }

    Ok(out)
}

/* A text macro: parameter names only, no types */
pub fn macro_declaration(def: &MacroDef) -> Declaration {
    let mut decl = Declaration::new(&def.name, LinkageKind::Macro);
    decl.parameters = def.params.iter().map(|p| Parameter::untyped(p)).collect();
    decl.is_variadic = def.variadic;
    decl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::lexer::tokenize;
    use shim_types::{Direction, Ownership};

    fn parse(src: &str) -> Vec<ParsedFunction> {
        let lines: Vec<(usize, String)> = src
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.to_string()))
            .collect();
        let tokens = tokenize(&lines).unwrap();
        parse_functions(&tokens, &ScanOptions::default(), &TypeConventions::default()).unwrap()
    }

    fn only(src: &str) -> Declaration {
        let mut funcs = parse(src);
        assert_eq!(funcs.len(), 1, "expected exactly one function in {src}");
        funcs.remove(0).declaration
    }

    #[test]
    fn inline_definition_with_marker() {
        let decl = only("FLINT_INLINE void fmpz_init(fmpz_t f) { (*f) = WORD(0); }");
        assert_eq!(decl.original_name, "fmpz_init");
        assert_eq!(decl.linkage_kind, LinkageKind::Inline);
        assert!(decl.return_type.as_ref().unwrap().is_void());
        assert_eq!(decl.parameters.len(), 1);
        assert_eq!(decl.parameters[0].name.as_deref(), Some("f"));
        assert_eq!(decl.parameters[0].ty.as_ref().unwrap().render(), "fmpz_t");
        assert_eq!(decl.parameters[0].direction, Direction::InOut);
        assert_eq!(decl.parameters[0].ownership, Ownership::Borrowed);
    }

    #[test]
    fn static_inline_and_plain_prototypes() {
        let funcs = parse(
            "static inline slong fmpz_mod_bpoly_degree0(const fmpz_mod_bpoly_t A, const fmpz_mod_ctx_t UNUSED_ctx)\n{\n    return A->length - 1;\n}\nFLINT_DLL void fmpz_add(fmpz_t f, const fmpz_t g, const fmpz_t h);\n",
        );
        assert_eq!(funcs.len(), 2);
        assert_eq!(funcs[0].declaration.linkage_kind, LinkageKind::Inline);
        assert!(funcs[0].body.is_some());
        assert_eq!(funcs[0].line, 1);
        assert_eq!(funcs[1].declaration.linkage_kind, LinkageKind::Extern);
        assert!(funcs[1].body.is_none());
        assert_eq!(funcs[1].line, 5);
        assert_eq!(
            funcs[0].declaration.signature_key(),
            "slong fmpz_mod_bpoly_degree0(const fmpz_mod_bpoly_t, const fmpz_mod_ctx_t)"
        );
    }

    #[test]
    fn pointer_returns_and_unnamed_params() {
        let decl = only("FLINT_INLINE const fmpz * fmpz_mod_mpolyn_leadcoeff(const fmpz_mod_mpolyn_t);");
        assert_eq!(decl.return_type.unwrap().render(), "const fmpz *");
        assert_eq!(decl.parameters[0].name, None);
        assert_eq!(decl.parameters[0].ty.as_ref().unwrap().render(), "const fmpz_mod_mpolyn_t");
    }

    #[test]
    fn void_list_and_arrays() {
        let decl = only("static inline slong gr_ctx_sizeof_ctx(void) { return sizeof(gr_ctx_struct); }");
        assert!(decl.parameters.is_empty());

        let decl = only("static inline void limbs_copy(ulong dst[2], const ulong src[]) { dst[0] = src[0]; }");
        assert_eq!(decl.parameters[0].ty.as_ref().unwrap().declare("dst"), "ulong dst[2]");
        assert_eq!(decl.parameters[1].ty.as_ref().unwrap().declare("src"), "const ulong src[]");
    }

    #[test]
    fn variadic_and_function_pointers() {
        let decl = only("int flint_printf(const char * str, ...);");
        assert!(decl.is_variadic);
        assert_eq!(decl.parameters.len(), 1);

        let decl = only("static inline void apply(void (*fn)(void *), void * arg) { fn(arg); }");
        assert!(decl.unsupported.unwrap().contains("function-pointer"));
    }

    #[test]
    fn attributes_and_linkage_blocks_are_ignored() {
        let funcs = parse(
            "extern \"C\" {\nFLINT_WARN_UNUSED int f(slong x) __attribute__((pure));\n}\nstatic __inline__ ulong g(ulong x) { return x; }\n",
        );
        assert_eq!(funcs.len(), 2);
        assert_eq!(funcs[0].declaration.original_name, "f");
        assert_eq!(funcs[1].declaration.original_name, "g");
        assert_eq!(funcs[1].declaration.linkage_kind, LinkageKind::Inline);
    }

    #[test]
    fn types_and_data_are_skipped() {
        let funcs = parse(
            "typedef struct { slong alloc; slong length; } fmpz_poly_struct;\ntypedef fmpz_poly_struct fmpz_poly_t[1];\nstruct node { int (*cb)(void); };\nstatic const int table[] = { 1, 2, 3 };\ntypedef int (*cmp_fn)(const void *, const void *);\nstruct la_col_t * col_alloc(slong n);\n",
        );
        let names: Vec<_> = funcs.iter().map(|f| f.declaration.original_name.as_str()).collect();
        assert_eq!(names, vec!["col_alloc"]);
        assert_eq!(funcs[0].declaration.return_type.as_ref().unwrap().render(), "struct la_col_t *");
    }

    #[test]
    fn function_returning_function_pointer_is_skipped() {
        assert!(parse("int (*get_handler(int sig))(int);").is_empty());
    }

    #[test]
    fn unrepresentable_local_functions_are_kept_unsupported() {
        let funcs = parse(
            "static inline int (*get_handler(int sig))(int) { return handlers[sig]; }\nFLINT_INLINE void fmpz_one(fmpz_t f) FLINT_NONNULL { *f = 1; }\nstatic inline counter(slong x) { return x; }\nstatic inline void ok_fn(slong x) { }\n",
        );
        let names: Vec<_> = funcs.iter().map(|f| f.declaration.original_name.as_str()).collect();
        assert_eq!(names, vec!["get_handler", "fmpz_one", "counter", "ok_fn"]);

        for func in &funcs[..3] {
            assert_eq!(func.declaration.linkage_kind, LinkageKind::Inline);
            assert!(func.declaration.unsupported.is_some(), "{}", func.declaration.original_name);
            assert!(func.body.is_some());
        }
        assert!(funcs[0].declaration.unsupported.as_ref().unwrap().contains("not a plain function name"));
        assert!(funcs[1].declaration.unsupported.as_ref().unwrap().contains("FLINT_NONNULL"));
        assert_eq!(funcs[2].declaration.unsupported.as_deref(), Some("no return type"));
        assert!(funcs[3].declaration.unsupported.is_none());
    }

    #[test]
    fn static_data_is_not_a_function() {
        assert!(parse("static const slong limit = compute_limit(3);\nstatic ulong (*hooks[4])(ulong);\n").is_empty());
    }

    #[test]
    fn unbalanced_braces_fail() {
        let lines = vec![(3, "static inline void f(void) {".to_string())];
        let tokens = tokenize(&lines).unwrap();
        let err = parse_functions(&tokens, &ScanOptions::default(), &TypeConventions::default()).unwrap_err();
        assert_eq!(err, ParseError::Unbalanced { line: 3, delimiter: '{' });
    }

    #[test]
    fn macro_declarations_are_untyped() {
        let decl = macro_declaration(&MacroDef {
            name: "FLINT_BIT_COUNT".to_string(),
            params: vec!["x".to_string()],
            variadic: false,
            line: 1,
        });
        assert_eq!(decl.linkage_kind, LinkageKind::Macro);
        assert!(decl.has_untyped_parts());
    }
}
