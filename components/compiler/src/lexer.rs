//! Lexer - tokenizes class definition source into tokens.

use core_types::{ParseError, SourcePosition};
use num_bigint::BigInt;

/// Characters that may form binary selectors.
const OPERATOR_CHARS: &str = "~&|*/\\+=<>,@%-";

/// Token kinds of the class-definition grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Plain identifier, also unary selectors and reserved words
    Identifier(String),
    /// Identifier with trailing colon, e.g. `at:`
    Keyword(String),
    /// Run of operator characters, e.g. `+`, `<=`, `//`
    Operator(String),
    /// Machine-word integer literal
    Integer(i64),
    /// Integer literal too large for a machine word
    BigInteger(BigInt),
    /// Double literal
    Double(f64),
    /// Single-quoted string literal
    Str(String),
    /// `#...` symbol literal
    Symbol(String),
    /// `#(`, opening a literal array
    ArrayStart,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:` introducing a block parameter
    Colon,
    /// `.` statement separator
    Period,
    /// `^` return marker
    Caret,
    /// `:=` assignment
    Assign,
    /// `----` instance/class side separator
    Separator,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Compact description for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(s) => format!("identifier '{}'", s),
            TokenKind::Keyword(s) => format!("keyword '{}'", s),
            TokenKind::Operator(s) => format!("operator '{}'", s),
            TokenKind::Integer(n) => format!("integer {}", n),
            TokenKind::BigInteger(n) => format!("integer {}", n),
            TokenKind::Double(d) => format!("double {}", d),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Symbol(s) => format!("symbol #{}", s),
            TokenKind::ArrayStart => "'#('".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Period => "'.'".to_string(),
            TokenKind::Caret => "'^'".to_string(),
            TokenKind::Assign => "':='".to_string(),
            TokenKind::Separator => "'----'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was lexed
    pub kind: TokenKind,
    /// Where it started
    pub position: SourcePosition,
}

/// Tokenizer over class definition source.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    position: SourcePosition,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            position: SourcePosition::start(),
        }
    }

    /// Tokenize the whole input, ending with an [`TokenKind::Eof`] token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn error(&self, message: impl Into<String>, found: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.position,
            expected: "a token".to_string(),
            found: found.into(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('"') => {
                    let start = self.position;
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('"') => break,
                            Some(_) => {}
                            None => {
                                return Err(ParseError {
                                    message: "unterminated comment".to_string(),
                                    position: start,
                                    expected: "'\"'".to_string(),
                                    found: "end of input".to_string(),
                                })
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments()?;
        let position = self.position;
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(),
            Some(c) if c.is_ascii_digit() => self.lex_number(false)?,
            Some('\'') => self.lex_string()?,
            Some('#') => self.lex_symbol_or_array()?,
            Some('(') => {
                self.bump();
                TokenKind::LParen
            }
            Some(')') => {
                self.bump();
                TokenKind::RParen
            }
            Some('[') => {
                self.bump();
                TokenKind::LBracket
            }
            Some(']') => {
                self.bump();
                TokenKind::RBracket
            }
            Some('.') => {
                self.bump();
                TokenKind::Period
            }
            Some('^') => {
                self.bump();
                TokenKind::Caret
            }
            Some(':') => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            Some('-') => self.lex_minus()?,
            Some(c) if OPERATOR_CHARS.contains(c) => self.lex_operator(),
            Some(c) => return Err(self.error("unexpected character", format!("'{}'", c))),
        };
        Ok(Token { kind, position })
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // `at:` is one keyword token; `x := 1` keeps the colon out of
        // the identifier.
        if self.peek() == Some(':') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek() != Some(&'=') {
                self.bump();
                text.push(':');
                return TokenKind::Keyword(text);
            }
        }
        TokenKind::Identifier(text)
    }

    fn lex_number(&mut self, negative: bool) -> Result<TokenKind, ParseError> {
        let mut digits = String::new();
        if negative {
            digits.push('-');
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        // A fraction only when a digit follows the dot; `3.` is the
        // integer three ending a statement.
        if self.peek() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.peek(), Some(c) if c.is_ascii_digit()) {
                digits.push('.');
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                let value: f64 = digits
                    .parse()
                    .map_err(|_| self.error("malformed double literal", digits.clone()))?;
                return Ok(TokenKind::Double(value));
            }
        }
        match digits.parse::<i64>() {
            Ok(value) => Ok(TokenKind::Integer(value)),
            Err(_) => {
                let value: BigInt = digits
                    .parse()
                    .map_err(|_| self.error("malformed integer literal", digits.clone()))?;
                Ok(TokenKind::BigInteger(value))
            }
        }
    }

    fn lex_minus(&mut self) -> Result<TokenKind, ParseError> {
        // Negative literal when a digit follows directly; otherwise an
        // operator run, with four or more dashes forming the class-side
        // separator.
        let mut lookahead = self.chars.clone();
        lookahead.next();
        if matches!(lookahead.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
            return self.lex_number(true);
        }
        let mut dashes = 0usize;
        let mut probe = self.chars.clone();
        while probe.peek() == Some(&'-') {
            dashes += 1;
            probe.next();
        }
        if dashes >= 4 {
            for _ in 0..dashes {
                self.bump();
            }
            return Ok(TokenKind::Separator);
        }
        Ok(self.lex_operator())
    }

    fn lex_operator(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if OPERATOR_CHARS.contains(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Operator(text)
    }

    fn lex_string(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.position;
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(TokenKind::Str(text)),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('\\') => text.push('\\'),
                    Some('\'') => text.push('\''),
                    Some('0') => text.push('\0'),
                    Some(c) => {
                        return Err(ParseError {
                            message: "unknown escape sequence".to_string(),
                            position: self.position,
                            expected: "one of n, t, \\, ', 0".to_string(),
                            found: format!("'{}'", c),
                        })
                    }
                    None => {
                        return Err(ParseError {
                            message: "unterminated string literal".to_string(),
                            position: start,
                            expected: "'''".to_string(),
                            found: "end of input".to_string(),
                        })
                    }
                },
                Some(c) => text.push(c),
                None => {
                    return Err(ParseError {
                        message: "unterminated string literal".to_string(),
                        position: start,
                        expected: "'''".to_string(),
                        found: "end of input".to_string(),
                    })
                }
            }
        }
    }

    fn lex_symbol_or_array(&mut self) -> Result<TokenKind, ParseError> {
        self.bump(); // '#'
        match self.peek() {
            Some('(') => {
                self.bump();
                Ok(TokenKind::ArrayStart)
            }
            Some('\'') => match self.lex_string()? {
                TokenKind::Str(text) => Ok(TokenKind::Symbol(text)),
                _ => unreachable!("lex_string returns a string token"),
            },
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                // Selector symbols swallow every keyword part: #at:put:
                let mut text = String::new();
                loop {
                    match self.peek() {
                        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                            text.push(c);
                            self.bump();
                        }
                        Some(':') => {
                            text.push(':');
                            self.bump();
                        }
                        _ => break,
                    }
                }
                Ok(TokenKind::Symbol(text))
            }
            Some(c) if OPERATOR_CHARS.contains(c) => match self.lex_operator() {
                TokenKind::Operator(text) => Ok(TokenKind::Symbol(text)),
                _ => unreachable!("lex_operator returns an operator token"),
            },
            other => Err(self.error(
                "malformed symbol literal",
                other.map_or("end of input".to_string(), |c| format!("'{}'", c)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("lexes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            kinds("foo at:put: bar"),
            vec![
                TokenKind::Identifier("foo".to_string()),
                TokenKind::Keyword("at:".to_string()),
                TokenKind::Keyword("put:".to_string()),
                TokenKind::Identifier("bar".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_assignment_is_not_a_keyword() {
        assert_eq!(
            kinds("x := 1"),
            vec![
                TokenKind::Identifier("x".to_string()),
                TokenKind::Assign,
                TokenKind::Integer(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 -7 3.25 3."),
            vec![
                TokenKind::Integer(42),
                TokenKind::Integer(-7),
                TokenKind::Double(3.25),
                TokenKind::Integer(3),
                TokenKind::Period,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_big_integer_literal() {
        let toks = kinds("123456789123456789123456789");
        assert!(matches!(toks[0], TokenKind::BigInteger(_)));
    }

    #[test]
    fn test_operators_and_separator() {
        assert_eq!(
            kinds("+ <= // ----"),
            vec![
                TokenKind::Operator("+".to_string()),
                TokenKind::Operator("<=".to_string()),
                TokenKind::Operator("//".to_string()),
                TokenKind::Separator,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_with_escapes() {
        assert_eq!(
            kinds("'a\\nb'"),
            vec![TokenKind::Str("a\nb".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_symbols() {
        assert_eq!(
            kinds("#foo #at:put: #+ #'spaced name'"),
            vec![
                TokenKind::Symbol("foo".to_string()),
                TokenKind::Symbol("at:put:".to_string()),
                TokenKind::Symbol("+".to_string()),
                TokenKind::Symbol("spaced name".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 \"a comment\" 2"),
            vec![TokenKind::Integer(1), TokenKind::Integer(2), TokenKind::Eof]
        );
    }

    #[test]
    fn test_block_tokens() {
        assert_eq!(
            kinds("[:a | a]"),
            vec![
                TokenKind::LBracket,
                TokenKind::Colon,
                TokenKind::Identifier("a".to_string()),
                TokenKind::Operator("|".to_string()),
                TokenKind::Identifier("a".to_string()),
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_errors() {
        let err = Lexer::new("'oops").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_position_tracking() {
        let tokens = Lexer::new("a\n  b").tokenize().expect("lexes");
        assert_eq!(tokens[0].position.line, 1);
        assert_eq!(tokens[1].position.line, 2);
        assert_eq!(tokens[1].position.column, 3);
    }
}
