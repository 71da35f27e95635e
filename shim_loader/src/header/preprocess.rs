use super::errors::ParseError;
use shim_types::ctype::is_identifier;

/* A function-like macro definition (`#define NAME(a, b) ...`) */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub variadic: bool,
    pub line: usize,
}

/* Header text after comment removal and directive processing */
#[derive(Debug, Default)]
pub struct Preprocessed {
    /* Code lines that survive conditional filtering, with 1-based line numbers */
    pub lines: Vec<(usize, String)>,
    pub macros: Vec<MacroDef>,
}

/* Replace comments with whitespace, keeping every newline in place */
pub fn strip_comments(text: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start = line;
                let mut closed = false;
                while let Some(next) = chars.next() {
                    if next == '\n' {
                        line += 1;
                        out.push('\n');
                    } else if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ParseError::Unterminated {
                        line: start,
                        what: "comment",
                    });
                }
                out.push(' ');
            }
            '"' | '\'' => {
                out.push(c);
                let mut closed = false;
                while let Some(next) = chars.next() {
                    out.push(next);
                    if next == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if next == c {
                        closed = true;
                        break;
                    } else if next == '\n' {
                        break;
                    }
                }
                if !closed {
                    return Err(ParseError::Unterminated {
                        line,
                        what: if c == '"' { "string literal" } else { "character literal" },
                    });
                }
            }
            '\n' => {
                line += 1;
                out.push('\n');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/* Join backslash-continued lines; each logical line keeps its first line number */
pub fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_end();
        let (content, continued) = match trimmed.strip_suffix('\\') {
            Some(head) => (head, true),
            None => (trimmed, false),
        };

        let entry = pending.get_or_insert_with(|| (idx + 1, String::new()));
        if !entry.1.is_empty() {
            entry.1.push(' ');
        }
        entry.1.push_str(content);

        if !continued {
            if let Some(done) = pending.take() {
                lines.push(done);
            }
        }
    }

    if let Some(done) = pending.take() {
        lines.push(done);
    }
    lines
}

/* One open `#if` group. Only groups that test `__cplusplus` ever hide code. */
struct Conditional {
    cplusplus: bool,
    skipping: bool,
}

fn tests_cplusplus(directive: &str, rest: &str) -> Option<bool> {
    let rest = rest.trim();
    match directive {
        "ifdef" if rest == "__cplusplus" => Some(true),
        "ifndef" if rest == "__cplusplus" => Some(false),
        "if" => {
            let compact: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
            match compact.as_str() {
                "defined(__cplusplus)" | "defined__cplusplus" | "__cplusplus" => Some(true),
                "!defined(__cplusplus)" | "!defined__cplusplus" | "!__cplusplus" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}

fn parse_define(line: usize, rest: &str) -> Result<Option<MacroDef>, ParseError> {
    let rest = rest.trim_start();
    let name_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let name = &rest[..name_len];

    /* Object-like macros have a space (or nothing) before any parenthesis */
    if name.is_empty() || !rest[name_len..].starts_with('(') {
        return Ok(None);
    }

    let after = &rest[name_len + 1..];
    let close = after.find(')').ok_or_else(|| ParseError::MalformedMacro {
        line,
        name: name.to_string(),
    })?;

    let mut params = Vec::new();
    let mut variadic = false;
    let list = after[..close].trim();
    if !list.is_empty() {
        for param in list.split(',').map(str::trim) {
            if param == "..." {
                variadic = true;
            } else if let Some(named) = param.strip_suffix("...") {
                /* GNU named variadic parameter: `args...` */
                if !is_identifier(named.trim()) {
                    return Err(ParseError::MalformedMacro {
                        line,
                        name: name.to_string(),
                    });
                }
                variadic = true;
            } else if is_identifier(param) {
                params.push(param.to_string());
            } else {
                return Err(ParseError::MalformedMacro {
                    line,
                    name: name.to_string(),
                });
            }
        }
    }

    Ok(Some(MacroDef {
        name: name.to_string(),
        params,
        variadic,
        line,
    }))
}

/// Remove comments, process directives and keep the lines a C compiler sees.
///
/// Conditionals are not evaluated except for `__cplusplus` tests, whose C++
/// branch is dropped (that is where `extern "C" {` lives). Everything else is
/// kept from every branch; the merge step folds the resulting redeclarations.
pub fn preprocess(text: &str) -> Result<Preprocessed, ParseError> {
    let stripped = strip_comments(text)?;
    let mut result = Preprocessed::default();
    let mut stack: Vec<Conditional> = Vec::new();

    for (line, content) in logical_lines(&stripped) {
        let trimmed = content.trim_start();
        let skipping = stack.iter().any(|c| c.skipping);

        let Some(directive_text) = trimmed.strip_prefix('#') else {
            if !skipping && !trimmed.is_empty() {
                result.lines.push((line, content));
            }
            continue;
        };

        let directive_text = directive_text.trim_start();
        let split = directive_text
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(directive_text.len());
        let (directive, rest) = directive_text.split_at(split);

        match directive {
            "if" | "ifdef" | "ifndef" => {
                let group = match tests_cplusplus(directive, rest) {
                    Some(cplusplus_branch) => Conditional {
                        cplusplus: true,
                        skipping: cplusplus_branch,
                    },
                    None => Conditional {
                        cplusplus: false,
                        skipping: false,
                    },
                };
                stack.push(group);
            }
            "else" | "elif" => {
                let group = stack.last_mut().ok_or_else(|| ParseError::StrayConditional {
                    line,
                    directive: directive.to_string(),
                })?;
                if group.cplusplus {
                    group.skipping = directive == "else" && !group.skipping;
                }
            }
            "endif" => {
                stack.pop().ok_or_else(|| ParseError::StrayConditional {
                    line,
                    directive: directive.to_string(),
                })?;
            }
            "define" if !skipping => {
                if let Some(def) = parse_define(line, rest)? {
                    result.macros.push(def);
                }
            }
            _ => {}
        }
    }

    Ok(result)
}
