//! SQL tokenization
//!
//! A total, single-pass tokenizer. Every byte of the input ends up in
//! exactly one token or in skipped whitespace/comments, so the clause
//! scanner can slice the original text between token spans. Unknown
//! characters produce `TokenKind::Unknown` instead of an error.

use std::collections::HashMap;

use lazy_static::lazy_static;

// ============================================================================
// Token Types
// ============================================================================

/// Token kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Integer,
    Float,
    String,
    Blob,

    // Identifiers
    Identifier,
    /// `"name"`, `` `name` `` or `[name]`
    QuotedIdentifier,

    // Keywords (alphabetical)
    All,
    And,
    As,
    Asc,
    Between,
    By,
    Cross,
    Delete,
    Desc,
    Distinct,
    Exists,
    False,
    From,
    Full,
    Group,
    Having,
    Ignore,
    In,
    Inner,
    Insert,
    Into,
    Is,
    Join,
    Left,
    Like,
    Limit,
    Natural,
    Not,
    Null,
    Offset,
    On,
    Or,
    Order,
    Outer,
    Over,
    Right,
    Select,
    Set,
    True,
    Union,
    Update,
    Using,
    Values,
    Where,
    With,

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    Eq,           // =
    EqEq,         // ==
    Ne,           // <>
    BangEq,       // !=
    Lt,           // <
    Le,           // <=
    Gt,           // >
    Ge,           // >=
    Ampersand,    // &
    Pipe,         // |
    DoublePipe,   // ||
    Tilde,        // ~
    Bang,         // !

    // Punctuation
    LParen,       // (
    RParen,       // )
    Comma,        // ,
    Semicolon,    // ;
    Dot,          // .
    Colon,        // :
    Question,     // ?
    At,           // @
    Dollar,       // $

    // Special
    Unknown,
    Eof,
}

impl TokenKind {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        KEYWORDS.values().any(|k| k == self)
    }

    /// Plain or quoted identifier
    pub fn is_identifier(&self) -> bool {
        matches!(self, TokenKind::Identifier | TokenKind::QuotedIdentifier)
    }

    /// Comparison operator usable in a condition leaf
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::EqEq
                | TokenKind::Ne
                | TokenKind::BangEq
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Gt
                | TokenKind::Ge
        )
    }
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("ALL", TokenKind::All);
        map.insert("AND", TokenKind::And);
        map.insert("AS", TokenKind::As);
        map.insert("ASC", TokenKind::Asc);
        map.insert("BETWEEN", TokenKind::Between);
        map.insert("BY", TokenKind::By);
        map.insert("CROSS", TokenKind::Cross);
        map.insert("DELETE", TokenKind::Delete);
        map.insert("DESC", TokenKind::Desc);
        map.insert("DISTINCT", TokenKind::Distinct);
        map.insert("EXISTS", TokenKind::Exists);
        map.insert("FALSE", TokenKind::False);
        map.insert("FROM", TokenKind::From);
        map.insert("FULL", TokenKind::Full);
        map.insert("GROUP", TokenKind::Group);
        map.insert("HAVING", TokenKind::Having);
        map.insert("IGNORE", TokenKind::Ignore);
        map.insert("IN", TokenKind::In);
        map.insert("INNER", TokenKind::Inner);
        map.insert("INSERT", TokenKind::Insert);
        map.insert("INTO", TokenKind::Into);
        map.insert("IS", TokenKind::Is);
        map.insert("JOIN", TokenKind::Join);
        map.insert("LEFT", TokenKind::Left);
        map.insert("LIKE", TokenKind::Like);
        map.insert("LIMIT", TokenKind::Limit);
        map.insert("NATURAL", TokenKind::Natural);
        map.insert("NOT", TokenKind::Not);
        map.insert("NULL", TokenKind::Null);
        map.insert("OFFSET", TokenKind::Offset);
        map.insert("ON", TokenKind::On);
        map.insert("OR", TokenKind::Or);
        map.insert("ORDER", TokenKind::Order);
        map.insert("OUTER", TokenKind::Outer);
        map.insert("OVER", TokenKind::Over);
        map.insert("RIGHT", TokenKind::Right);
        map.insert("SELECT", TokenKind::Select);
        map.insert("SET", TokenKind::Set);
        map.insert("TRUE", TokenKind::True);
        map.insert("UNION", TokenKind::Union);
        map.insert("UPDATE", TokenKind::Update);
        map.insert("USING", TokenKind::Using);
        map.insert("VALUES", TokenKind::Values);
        map.insert("WHERE", TokenKind::Where);
        map.insert("WITH", TokenKind::With);
        map
    };
}

// ============================================================================
// Token
// ============================================================================

/// A token from the SQL source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Token type
    pub kind: TokenKind,
    /// Start position in source
    pub start: usize,
    /// End position in source (exclusive)
    pub end: usize,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Token { kind, start, end }
    }

    /// Get the text of this token from the source
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

/// SQL tokenizer
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the entire source. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        if self.is_eof() {
            return Token::new(TokenKind::Eof, self.pos, self.pos);
        }

        let start = self.pos;
        let kind = self.scan_token();
        Token::new(kind, start, self.pos)
    }

    /// Scan a single token
    fn scan_token(&mut self) -> TokenKind {
        let c = self.current();

        if c.is_ascii_digit() {
            return self.scan_number();
        }

        // Blob literals must be checked before identifiers
        if (c == b'x' || c == b'X') && self.peek() == Some(b'\'') {
            return self.scan_blob();
        }

        if is_identifier_start(c) {
            return self.scan_identifier();
        }

        if c == b'"' || c == b'`' || c == b'[' {
            self.scan_quoted(if c == b'[' { b']' } else { c });
            return TokenKind::QuotedIdentifier;
        }

        if c == b'\'' {
            self.scan_quoted(b'\'');
            return TokenKind::String;
        }

        self.scan_operator()
    }

    /// Scan a number (integer or float)
    fn scan_number(&mut self) -> TokenKind {
        if self.current() == b'0' && matches!(self.peek(), Some(b'x') | Some(b'X')) {
            self.advance();
            self.advance();
            while !self.is_eof() && self.current().is_ascii_hexdigit() {
                self.advance();
            }
            return TokenKind::Integer;
        }

        self.skip_digits();
        let mut kind = TokenKind::Integer;

        if !self.is_eof() && self.current() == b'.' {
            if let Some(next) = self.peek() {
                if next.is_ascii_digit() {
                    self.advance();
                    self.skip_digits();
                    kind = TokenKind::Float;
                }
            }
        }

        if !self.is_eof() && matches!(self.current(), b'e' | b'E') {
            let saved_pos = self.pos;
            self.advance();
            if !self.is_eof() && matches!(self.current(), b'+' | b'-') {
                self.advance();
            }
            if !self.is_eof() && self.current().is_ascii_digit() {
                self.skip_digits();
                return TokenKind::Float;
            }
            // Not a valid exponent, restore position
            self.pos = saved_pos;
        }

        kind
    }

    fn skip_digits(&mut self) {
        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while !self.is_eof() && is_identifier_part(self.current()) {
            self.advance();
        }

        keyword_or_identifier(&self.source[start..self.pos])
    }

    /// Scan a quoted run up to `close`. Doubled closing quotes and
    /// backslash escapes stay inside the token. An unterminated quote
    /// runs to the end of input.
    fn scan_quoted(&mut self, close: u8) {
        let open = self.current();
        self.advance();

        while !self.is_eof() {
            let c = self.current();
            if c == b'\\' && open != b'[' {
                self.advance();
                if !self.is_eof() {
                    self.advance();
                }
            } else if c == close {
                if open != b'[' && self.peek() == Some(close) {
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    break;
                }
            } else {
                self.advance();
            }
        }
    }

    /// Scan a blob literal (X'...')
    fn scan_blob(&mut self) -> TokenKind {
        self.advance(); // consume 'x' or 'X'
        self.advance(); // consume opening quote

        let mut valid = true;
        while !self.is_eof() && self.current() != b'\'' {
            if !self.current().is_ascii_hexdigit() {
                valid = false;
            }
            self.advance();
        }

        // Unterminated blobs are not blobs
        if self.is_eof() {
            return TokenKind::Unknown;
        }
        self.advance(); // consume closing quote

        if valid {
            TokenKind::Blob
        } else {
            TokenKind::Unknown
        }
    }

    /// Scan an operator or punctuation
    fn scan_operator(&mut self) -> TokenKind {
        let c = self.current();
        self.advance();

        match c {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'=' => self.follow(b'=', TokenKind::EqEq, TokenKind::Eq),
            b'<' => {
                if !self.is_eof() && self.current() == b'>' {
                    self.advance();
                    TokenKind::Ne
                } else {
                    self.follow(b'=', TokenKind::Le, TokenKind::Lt)
                }
            }
            b'>' => self.follow(b'=', TokenKind::Ge, TokenKind::Gt),
            b'!' => self.follow(b'=', TokenKind::BangEq, TokenKind::Bang),
            b'&' => TokenKind::Ampersand,
            b'|' => self.follow(b'|', TokenKind::DoublePipe, TokenKind::Pipe),
            b'~' => TokenKind::Tilde,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' => TokenKind::Dot,
            b':' => TokenKind::Colon,
            b'?' => TokenKind::Question,
            b'@' => TokenKind::At,
            b'$' => TokenKind::Dollar,
            _ => TokenKind::Unknown,
        }
    }

    /// Consume `next` if it follows, choosing between two kinds
    fn follow(&mut self, next: u8, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if !self.is_eof() && self.current() == next {
            self.advance();
            matched
        } else {
            otherwise
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.is_eof() && self.current().is_ascii_whitespace() {
                self.advance();
            }

            if self.is_eof() {
                break;
            }

            // -- comments
            if self.current() == b'-' && self.peek() == Some(b'-') {
                while !self.is_eof() && self.current() != b'\n' {
                    self.advance();
                }
                continue;
            }

            // /* */ comments
            if self.current() == b'/' && self.peek() == Some(b'*') {
                self.advance();
                self.advance();
                while !self.is_eof() {
                    if self.current() == b'*' && self.peek() == Some(b'/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            break;
        }
    }

    /// Check if at end of input
    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Get current byte
    fn current(&self) -> u8 {
        self.bytes[self.pos]
    }

    /// Peek at next byte
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

// Non-ASCII bytes are treated as identifier characters, which also keeps
// every token boundary on a UTF-8 character boundary.
fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_identifier_part(c: u8) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

/// Map a text to a keyword or identifier token
fn keyword_or_identifier(text: &str) -> TokenKind {
    KEYWORDS
        .get(text.to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(TokenKind::Identifier)
}

// ============================================================================
// Public API
// ============================================================================

/// Tokenize a SQL string
pub fn tokenize(source: &str) -> Vec<Token> {
    Tokenizer::new(source).tokenize()
}

/// Strip the quoting from an identifier token text.
///
/// `` `users` `` → `users`, `"users"` → `users`, `[users]` → `users`.
/// Unquoted text is returned unchanged.
pub fn unquote_identifier(text: &str) -> String {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (open, close) = (bytes[0], bytes[bytes.len() - 1]);
        let quoted = matches!((open, close), (b'"', b'"') | (b'`', b'`') | (b'[', b']'));
        if quoted {
            let inner = &text[1..text.len() - 1];
            return match open {
                b'"' => inner.replace("\"\"", "\""),
                b'`' => inner.replace("``", "`"),
                _ => inner.to_string(),
            };
        }
    }
    text.to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<TokenKind> {
        tokenize(sql).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_keywords() {
        assert_eq!(
            kinds("SELECT FROM WHERE"),
            vec![TokenKind::Select, TokenKind::From, TokenKind::Where, TokenKind::Eof]
        );
    }

    #[test]
    fn test_tokenize_case_insensitive() {
        let k = kinds("select FROM Where");
        assert_eq!(k[0], TokenKind::Select);
        assert_eq!(k[1], TokenKind::From);
        assert_eq!(k[2], TokenKind::Where);
    }

    #[test]
    fn test_tokenize_numbers() {
        let k = kinds("42 3.14 1e10 0x1F");
        assert_eq!(
            &k[..4],
            &[TokenKind::Integer, TokenKind::Float, TokenKind::Float, TokenKind::Integer]
        );
    }

    #[test]
    fn test_tokenize_strings_with_escapes() {
        let sql = r"'it''s' 'don\'t' x";
        let tokens = tokenize(sql);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text(sql), "'it''s'");
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].text(sql), r"'don\'t'");
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_tokenize_unterminated_string_runs_to_end() {
        let tokens = tokenize("'abc, def");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::String);
    }

    #[test]
    fn test_tokenize_operators() {
        let k = kinds("= <> != <= >= < > == ||");
        assert_eq!(
            &k[..9],
            &[
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::BangEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::EqEq,
                TokenKind::DoublePipe,
            ]
        );
    }

    #[test]
    fn test_tokenize_comments() {
        assert_eq!(
            kinds("SELECT -- comment\nFROM /* x */ t"),
            vec![TokenKind::Select, TokenKind::From, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_tokenize_quoted_identifier() {
        let k = kinds("\"my table\" `another` [bracketed]");
        assert!(k[..3].iter().all(|k| *k == TokenKind::QuotedIdentifier));
    }

    #[test]
    fn test_tokenize_blob() {
        assert_eq!(kinds("X'48656C6C6F'")[0], TokenKind::Blob);
        assert_eq!(kinds("X'zz'")[0], TokenKind::Unknown);
        assert_eq!(kinds("X'41")[0], TokenKind::Unknown);
    }

    #[test]
    fn test_unknown_characters_do_not_fail() {
        let sql = "a # b é";
        let tokens = tokenize(sql);
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(tokens[3].text(sql), "é");
    }

    #[test]
    fn test_unquote_identifier() {
        assert_eq!(unquote_identifier("`users`"), "users");
        assert_eq!(unquote_identifier("\"a\"\"b\""), "a\"b");
        assert_eq!(unquote_identifier("[x y]"), "x y");
        assert_eq!(unquote_identifier("plain"), "plain");
    }
}
