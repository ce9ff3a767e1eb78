use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    /// Numbers keep their raw text so default values round-trip unchanged.
    Num(String),
    /// Backtick expression, e.g. `now()`.
    Expr(String),
    /// Hex color literal, e.g. #3498DB (table header settings).
    Color(String),

    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    LParen,   // (
    RParen,   // )
    Comma,    // ,
    Colon,    // :
    Dot,      // .
    Lt,       // <
    Gt,       // >
    Dash,     // -
    LtGt,     // <>

    Eof,
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character: {0}")]
    UnexpectedChar(char),
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Unterminated expression")]
    UnterminatedExpression,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('/') => {
                    // Only a `//` pair starts a comment; a lone slash falls
                    // through to next_token and errors there.
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() == Some(&'/') {
                        while let Some(&c) = self.chars.peek() {
                            self.chars.next();
                            if c == '\n' {
                                break;
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn read_ident(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => return Ok(s),
                Some('\\') => {
                    if let Some(c) = self.chars.next() {
                        match c {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            'r' => s.push('\r'),
                            _ => s.push(c),
                        }
                    }
                }
                Some(c) => s.push(c),
                None => return Err(LexError::UnterminatedString),
            }
        }
    }

    fn read_expr(&mut self) -> Result<String, LexError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some('`') => return Ok(s),
                Some(c) => s.push(c),
                None => return Err(LexError::UnterminatedExpression),
            }
        }
    }

    fn read_number(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_color(&mut self) -> String {
        let mut s = String::from('#');
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_hexdigit() {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        let c = match self.chars.next() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let tok = match c {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '.' => Token::Dot,
            '>' => Token::Gt,
            '-' => Token::Dash,
            '<' => {
                if self.chars.peek() == Some(&'>') {
                    self.chars.next();
                    Token::LtGt
                } else {
                    Token::Lt
                }
            }
            '"' => Token::Str(self.read_string('"')?),
            '\'' => Token::Str(self.read_string('\'')?),
            '`' => Token::Expr(self.read_expr()?),
            '#' => Token::Color(self.read_color()),
            c if c.is_ascii_digit() => Token::Num(self.read_number(c)),
            c if c.is_alphabetic() || c == '_' => Token::Ident(self.read_ident(c)),
            _ => return Err(LexError::UnexpectedChar(c)),
        };

        Ok(tok)
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            if tok == Token::Eof {
                tokens.push(tok);
                break;
            }
            tokens.push(tok);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens() {
        let tokens = Lexer::new("Table users { }").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("Table".into()),
                Token::Ident("users".into()),
                Token::LBrace,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_field_settings_tokens() {
        let tokens = Lexer::new("[pk, not null]").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LBracket,
                Token::Ident("pk".into()),
                Token::Comma,
                Token::Ident("not".into()),
                Token::Ident("null".into()),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_relation_operators() {
        let tokens = Lexer::new("< > - <>").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![Token::Lt, Token::Gt, Token::Dash, Token::LtGt, Token::Eof]
        );
    }

    #[test]
    fn test_quoted_strings() {
        let tokens = Lexer::new(r#"'single' "double""#).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Str("single".into()),
                Token::Str("double".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_backtick_expression() {
        let tokens = Lexer::new("default: `now()`").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("default".into()),
                Token::Colon,
                Token::Expr("now()".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_line_comments() {
        let input = "// leading\nTable t { // trailing\n}";
        let tokens = Lexer::new(input).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("Table".into()),
                Token::Ident("t".into()),
                Token::LBrace,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_number_keeps_raw_text() {
        let tokens = Lexer::new("0.5 10").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![Token::Num("0.5".into()), Token::Num("10".into()), Token::Eof]
        );
    }

    #[test]
    fn test_color_literal() {
        let tokens = Lexer::new("#3498DB").tokenize().unwrap();
        assert_eq!(tokens, vec![Token::Color("#3498DB".into()), Token::Eof]);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            Lexer::new("'oops").tokenize(),
            Err(LexError::UnterminatedString)
        ));
    }
}
