use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    Ident(String),
    /// Backquoted identifier; never treated as a keyword.
    QuotedIdent(String),
    Number(String),
    Str(String),
    Symbol(&'static str),
}

impl Token {
    pub(super) fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    pub(super) fn is_symbol(&self, sym: &str) -> bool {
        matches!(self, Token::Symbol(s) if *s == sym)
    }
}

const SYMBOLS: [&'static str; 15] = [
    "||", "<=", ">=", "!=", "<>", "(", ")", ",", "+", "-", "*", "/", "=", "<", ">",
];

pub(super) fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,

            '\'' | '"' => {
                let (text, next) = read_quoted(&chars, i, ch)?;
                tokens.push(Token::Str(text));
                i = next;
            }

            '`' => {
                let (text, next) = read_quoted(&chars, i, '`')?;
                if text.is_empty() {
                    return Err(Error::Expression("Empty quoted identifier".to_string()));
                }
                tokens.push(Token::QuotedIdent(text));
                i = next;
            }

            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }

            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }

            _ => {
                let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
                let sym = SYMBOLS
                    .iter()
                    .copied()
                    .find(|sym| rest.starts_with(*sym))
                    .ok_or_else(|| {
                        Error::Expression(format!("Unexpected character '{ch}' in expression"))
                    })?;
                tokens.push(Token::Symbol(sym));
                i += sym.len();
            }
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &[char], start: usize, quote: char) -> Result<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => match chars.get(i + 1).copied() {
                Some(c) if c == quote || c == '\\' => {
                    text.push(c);
                    i += 2;
                }
                _ => {
                    return Err(Error::Expression(format!(
                        "Invalid escape sequence in quotes. Use \\{quote} for a quote or \\\\ for a backslash."
                    )));
                }
            },
            c if c == quote => return Ok((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(Error::Expression(format!("Unclosed quote ({quote}) in expression")))
}
