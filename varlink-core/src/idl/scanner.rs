//! Hand-written lexer for the Varlink interface definition language (§4.1).
//!
//! Tokenizes the whole input up front into a flat `Vec<Lexeme>`; the parser
//! then drives a cursor over it with [`TokenStream::get`]/[`TokenStream::expect`]/
//! [`TokenStream::end`], matching the `get`/`expect`/`end` contract the spec
//! describes for the scanner itself.

use crate::error::{Error, Result};

/// A single lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    KwInterface,
    KwType,
    KwMethod,
    KwError,
    KwBool,
    KwInt,
    KwFloat,
    KwString,
    KwObject,
    Colon,
    Comma,
    LParen,
    RParen,
    Arrow,
    ArrayOp,
    Question,
    MapOp,
    SetOp,
    InterfaceName(String),
    MemberName(String),
    Identifier(String),
}

impl Token {
    /// A human-readable name for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::KwInterface => "'interface'".into(),
            Token::KwType => "'type'".into(),
            Token::KwMethod => "'method'".into(),
            Token::KwError => "'error'".into(),
            Token::KwBool => "'bool'".into(),
            Token::KwInt => "'int'".into(),
            Token::KwFloat => "'float'".into(),
            Token::KwString => "'string'".into(),
            Token::KwObject => "'object'".into(),
            Token::Colon => "':'".into(),
            Token::Comma => "','".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::Arrow => "'->'".into(),
            Token::ArrayOp => "'[]'".into(),
            Token::Question => "'?'".into(),
            Token::MapOp => "'[string]'".into(),
            Token::SetOp => "'[string]()'".into(),
            Token::InterfaceName(n) => format!("interface name '{n}'"),
            Token::MemberName(n) => format!("'{n}'"),
            Token::Identifier(n) => format!("'{n}'"),
        }
    }
}

/// A token plus the doc-comment that immediately preceded it (if any) and
/// its source position, for diagnostics.
#[derive(Debug, Clone)]
pub struct Lexeme {
    pub token: Token,
    pub doc: Option<String>,
    pub line: usize,
    pub col: usize,
}

struct Scanner<'a> {
    chars: Vec<char>,
    src: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    pending_doc: Vec<String>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner {
            chars: src.chars().collect(),
            src,
            pos: 0,
            line: 1,
            col: 1,
            pending_doc: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, msg: impl Into<String>) -> Error {
        Error::Syntax(format!("{} at line {}, column {}", msg.into(), self.line, self.col))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    let start = self.pos;
                    while !matches!(self.peek(), Some('\n') | None) {
                        self.bump();
                    }
                    let line: String = self.chars[start..self.pos].iter().collect();
                    let trimmed = line.trim_start_matches('#').trim();
                    self.pending_doc.push(trimmed.to_string());
                }
                _ => break,
            }
        }
    }

    fn take_doc(&mut self) -> Option<String> {
        if self.pending_doc.is_empty() {
            None
        } else {
            Some(self.pending_doc.drain(..).collect::<Vec<_>>().join("\n"))
        }
    }

    fn lex_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            self.bump();
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn next_lexeme(&mut self) -> Result<Option<Lexeme>> {
        self.skip_whitespace_and_comments();
        let (line, col) = (self.line, self.col);
        let doc = self.take_doc();
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            ':' => {
                self.bump();
                Token::Colon
            }
            ',' => {
                self.bump();
                Token::Comma
            }
            '(' => {
                self.bump();
                Token::LParen
            }
            ')' => {
                self.bump();
                Token::RParen
            }
            '?' => {
                self.bump();
                if self.peek() == Some('?') {
                    return Err(self.error("double '??'"));
                }
                Token::Question
            }
            '-' if self.peek_at(1) == Some('>') => {
                self.bump();
                self.bump();
                Token::Arrow
            }
            '[' => self.lex_bracket()?,
            c if c.is_ascii_alphabetic() => self.lex_word()?,
            other => return Err(self.error(format!("unexpected character '{other}'"))),
        };

        Ok(Some(Lexeme { token, doc, line, col }))
    }

    /// `[]`, `[string]`, or `[string]()`.
    fn lex_bracket(&mut self) -> Result<Token> {
        self.bump(); // '['
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Token::ArrayOp);
        }
        let word = self.lex_name();
        if word != "string" {
            return Err(self.error(format!("'[{word}' is not a valid type; expected '[]' or '[string]'")));
        }
        if self.peek() != Some(']') {
            return Err(self.error("unterminated '[string'; expected ']'"));
        }
        self.bump(); // ']'
        if self.peek() == Some('(') && self.peek_at(1) == Some(')') {
            self.bump();
            self.bump();
            return Ok(Token::SetOp);
        }
        Ok(Token::MapOp)
    }

    fn lex_word(&mut self) -> Result<Token> {
        let start_pos = self.pos;
        let word = self.lex_name();
        match word.as_str() {
            "interface" => return Ok(Token::KwInterface),
            "type" => return Ok(Token::KwType),
            "method" => return Ok(Token::KwMethod),
            "error" => return Ok(Token::KwError),
            "bool" => return Ok(Token::KwBool),
            "int" => return Ok(Token::KwInt),
            "float" => return Ok(Token::KwFloat),
            "string" => return Ok(Token::KwString),
            "object" => return Ok(Token::KwObject),
            _ => {}
        }

        if word.contains('.') {
            return if is_interface_name(&word) {
                Ok(Token::InterfaceName(word))
            } else {
                Err(self.error(format!("'{word}' is not a valid interface name")))
            };
        }

        let first = word.chars().next().unwrap();
        if first.is_ascii_uppercase() {
            if !word.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(self.error(format!("'{word}' is not a valid member name")));
            }
            return Ok(Token::MemberName(word));
        }

        if !is_identifier(&word) {
            let _ = start_pos;
            return Err(self.error(format!("'{word}' is not a valid identifier")));
        }
        Ok(Token::Identifier(word))
    }
}

/// §4.1: `[A-Za-z]([A-Za-z0-9])*([.][A-Za-z0-9]([-]*[A-Za-z0-9])*)+`, at
/// least two labels, no leading/trailing hyphen in any label, top-level
/// label starts with a letter.
fn is_interface_name(s: &str) -> bool {
    let labels: Vec<&str> = s.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    for (i, label) in labels.iter().enumerate() {
        if label.is_empty() {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        let mut chars = label.chars();
        let first = chars.next().unwrap();
        if i == 0 {
            if !first.is_ascii_alphabetic() {
                return false;
            }
        } else if !(first.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }
    true
}

/// §4.1: `[A-Za-z]([_]?[A-Za-z0-9])*`.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    let mut prev_underscore = false;
    for c in chars {
        if c == '_' {
            if prev_underscore {
                return false;
            }
            prev_underscore = true;
        } else if c.is_ascii_alphanumeric() {
            prev_underscore = false;
        } else {
            return false;
        }
    }
    true
}

/// A cursor over the lexed token stream, exposing the `get`/`expect`/`end`
/// contract the spec describes for the scanner.
#[derive(Debug)]
pub struct TokenStream {
    lexemes: Vec<Lexeme>,
    pos: usize,
}

impl TokenStream {
    pub fn tokenize(src: &str) -> Result<Self> {
        let mut scanner = Scanner::new(src);
        let mut lexemes = Vec::new();
        while let Some(lexeme) = scanner.next_lexeme()? {
            lexemes.push(lexeme);
        }
        let _ = scanner.src;
        Ok(TokenStream { lexemes, pos: 0 })
    }

    pub fn peek(&self) -> Option<&Token> {
        self.lexemes.get(self.pos).map(|l| &l.token)
    }

    pub fn peek_doc(&self) -> Option<&str> {
        self.lexemes.get(self.pos).and_then(|l| l.doc.as_deref())
    }

    fn pos_desc(&self) -> String {
        match self.lexemes.get(self.pos) {
            Some(l) => format!("line {}, column {}", l.line, l.col),
            None => "end of input".to_string(),
        }
    }

    /// Consumes and returns the current token if it matches `pred`; leaves
    /// the cursor untouched and returns `None` otherwise.
    pub fn get(&mut self, pred: impl Fn(&Token) -> bool) -> Option<Token> {
        if self.lexemes.get(self.pos).is_some_and(|l| pred(&l.token)) {
            let lexeme = self.lexemes[self.pos].clone();
            self.pos += 1;
            Some(lexeme.token)
        } else {
            None
        }
    }

    /// Consumes the current token if it equals `expected`; otherwise fails
    /// with a `SyntaxError` naming the expected token.
    pub fn expect(&mut self, expected: Token) -> Result<()> {
        match self.get(|t| *t == expected) {
            Some(_) => Ok(()),
            None => Err(Error::Syntax(format!(
                "expected {} at {}",
                expected.describe(),
                self.pos_desc()
            ))),
        }
    }

    pub fn expect_member_name(&mut self) -> Result<String> {
        match self.get(|t| matches!(t, Token::MemberName(_))) {
            Some(Token::MemberName(n)) => Ok(n),
            _ => Err(Error::Syntax(format!("expected a member name at {}", self.pos_desc()))),
        }
    }

    pub fn expect_identifier(&mut self) -> Result<String> {
        match self.get(|t| matches!(t, Token::Identifier(_))) {
            Some(Token::Identifier(n)) => Ok(n),
            _ => Err(Error::Syntax(format!("expected an identifier at {}", self.pos_desc()))),
        }
    }

    pub fn expect_interface_name(&mut self) -> Result<String> {
        match self.get(|t| matches!(t, Token::InterfaceName(_))) {
            Some(Token::InterfaceName(n)) => Ok(n),
            _ => Err(Error::Syntax(format!(
                "expected a dotted interface name at {}",
                self.pos_desc()
            ))),
        }
    }

    /// Asserts there is no trailing input left.
    pub fn end(&self) -> Result<()> {
        if self.pos == self.lexemes.len() {
            Ok(())
        } else {
            Err(Error::Syntax(format!("unexpected trailing input at {}", self.pos_desc())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_name_validation() {
        for good in ["a.b", "org.varlink.service", "com.example.0example"] {
            assert!(is_interface_name(good), "{good} should be valid");
        }
        for bad in [".a.b.c", "a..b", "com.-example.x", "ab", "1.b.c"] {
            assert!(!is_interface_name(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn idn_interface_name_validation() {
        assert!(is_interface_name("xn--lgbbat1ad8j.example.algeria"));
    }

    #[test]
    fn double_question_mark_is_a_syntax_error() {
        let err = TokenStream::tokenize("??").unwrap_err();
        assert!(matches!(err, Error::Syntax(msg) if msg.contains("double '??'")));
    }

    #[test]
    fn brackets_tokenize_to_array_map_set() {
        let ts = TokenStream::tokenize("[] [string] [string]()").unwrap();
        assert_eq!(
            ts.lexemes.iter().map(|l| l.token.clone()).collect::<Vec<_>>(),
            vec![Token::ArrayOp, Token::MapOp, Token::SetOp]
        );
    }

    #[test]
    fn doc_comment_attaches_to_following_token() {
        let ts = TokenStream::tokenize("# does a thing\nmethod").unwrap();
        assert_eq!(ts.lexemes[0].doc.as_deref(), Some("does a thing"));
        assert_eq!(ts.lexemes[0].token, Token::KwMethod);
    }
}
