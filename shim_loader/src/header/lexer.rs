use super::errors::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

/* Tokenize preprocessed code lines. Only the shapes declarations need are distinguished. */
pub fn tokenize(lines: &[(usize, String)]) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();

    for (line, content) in lines {
        let line = *line;
        let bytes: Vec<char> = content.chars().collect();
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            if c.is_whitespace() {
                i += 1;
            } else if c == '_' || c.is_ascii_alphabetic() {
                let start = i;
                while i < bytes.len() && (bytes[i] == '_' || bytes[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident,
                    text: bytes[start..i].iter().collect(),
                    line,
                });
            } else if c.is_ascii_digit() {
                let start = i;
                while i < bytes.len() && (bytes[i] == '.' || bytes[i] == '_' || bytes[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Number,
                    text: bytes[start..i].iter().collect(),
                    line,
                });
            } else if c == '"' || c == '\'' {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != c {
                    if bytes[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(ParseError::Unterminated {
                        line,
                        what: if c == '"' { "string literal" } else { "character literal" },
                    });
                }
                i += 1;
                tokens.push(Token {
                    kind: if c == '"' { TokenKind::Str } else { TokenKind::Char },
                    text: bytes[start..i].iter().collect(),
                    line,
                });
            } else if c == '.' && bytes.get(i + 1) == Some(&'.') && bytes.get(i + 2) == Some(&'.') {
                tokens.push(Token {
                    kind: TokenKind::Punct,
                    text: "...".to_string(),
                    line,
                });
                i += 3;
            } else {
                tokens.push(Token {
                    kind: TokenKind::Punct,
                    text: c.to_string(),
                    line,
                });
                i += 1;
            }
        }
    }

    Ok(tokens)
}
