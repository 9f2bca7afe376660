//! Tokenizer for the mailflow rule language.

/// A token with the 1-based source line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    If,
    Else,
    And,
    Or,
    Not,
    True,
    False,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    EqEq,
    NotEq,
}

impl Token {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::Str(_) => "string literal".to_string(),
            Token::If => "`if`".to_string(),
            Token::Else => "`else`".to_string(),
            Token::And => "`and`".to_string(),
            Token::Or => "`or`".to_string(),
            Token::Not => "`not`".to_string(),
            Token::True => "`true`".to_string(),
            Token::False => "`false`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Semi => "`;`".to_string(),
            Token::EqEq => "`==`".to_string(),
            Token::NotEq => "`!=`".to_string(),
        }
    }
}

/// Tokenize a rule body. `#` starts a comment running to end of line.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Comment to end of line
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '(' => push_simple(&mut tokens, &mut chars, Token::LParen, line),
            ')' => push_simple(&mut tokens, &mut chars, Token::RParen, line),
            '{' => push_simple(&mut tokens, &mut chars, Token::LBrace, line),
            '}' => push_simple(&mut tokens, &mut chars, Token::RBrace, line),
            ',' => push_simple(&mut tokens, &mut chars, Token::Comma, line),
            ';' => push_simple(&mut tokens, &mut chars, Token::Semi, line),
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(SpannedToken { token: Token::EqEq, line });
                } else {
                    return Err(format!("line {line}: expected `==`, found lone `=`"));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(SpannedToken { token: Token::NotEq, line });
                } else {
                    return Err(format!("line {line}: expected `!=`, found lone `!`"));
                }
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('"') => value.push('"'),
                            Some('\\') => value.push('\\'),
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(other) => {
                                return Err(format!(
                                    "line {line}: unknown escape `\\{other}` in string"
                                ));
                            }
                            None => break,
                        },
                        '\n' => {
                            return Err(format!("line {line}: unterminated string literal"));
                        }
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(format!("line {line}: unterminated string literal"));
                }
                tokens.push(SpannedToken {
                    token: Token::Str(value),
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let token = match ident.as_str() {
                    "if" => Token::If,
                    "else" => Token::Else,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(ident),
                };
                tokens.push(SpannedToken { token, line });
            }
            other => {
                return Err(format!("line {line}: unexpected character `{other}`"));
            }
        }
    }

    Ok(tokens)
}

fn push_simple(
    tokens: &mut Vec<SpannedToken>,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    token: Token,
    line: usize,
) {
    chars.next();
    tokens.push(SpannedToken { token, line });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn tokenizes_call_with_string() {
        assert_eq!(
            kinds(r#"contains(subject, "newsletter")"#),
            vec![
                Token::Ident("contains".into()),
                Token::LParen,
                Token::Ident("subject".into()),
                Token::Comma,
                Token::Str("newsletter".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn keywords_and_operators() {
        assert_eq!(
            kinds(r#"if not a == b and c != d { } else { }"#),
            vec![
                Token::If,
                Token::Not,
                Token::Ident("a".into()),
                Token::EqEq,
                Token::Ident("b".into()),
                Token::And,
                Token::Ident("c".into()),
                Token::NotEq,
                Token::Ident("d".into()),
                Token::LBrace,
                Token::RBrace,
                Token::Else,
                Token::LBrace,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"\n""#),
            vec![Token::Str("say \"hi\"\n".into())]
        );
    }

    #[test]
    fn comments_are_skipped_and_lines_counted() {
        let tokens = tokenize("# archive newsletters\narchive()").unwrap();
        assert_eq!(tokens[0].token, Token::Ident("archive".into()));
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(tokenize(r#"contains(subject, "oops"#).is_err());
    }

    #[test]
    fn lone_equals_errors() {
        let err = tokenize("subject = \"x\"").unwrap_err();
        assert!(err.contains("`==`"));
    }
}
