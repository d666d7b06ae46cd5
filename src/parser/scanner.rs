//! Nesting-aware scanning over a token stream.
//!
//! Every "top-level" split in the parsers goes through here: a separator
//! only counts when it sits at parenthesis depth 0. Quoted text never
//! shows up as separate tokens, so commas or keywords inside string
//! literals and quoted identifiers are never split on.

use crate::parser::tokenizer::{tokenize, unquote_identifier, Token, TokenKind};

/// A tokenized piece of SQL with the nesting depth of each token.
///
/// Parentheses belong to the depth outside them: in `f(a, b)` the `(`
/// and `)` are at depth 0 and `a`, `,`, `b` at depth 1.
#[derive(Debug, Clone)]
pub struct Scanned<'a> {
    pub source: &'a str,
    pub tokens: Vec<Token>,
    pub depths: Vec<usize>,
}

impl<'a> Scanned<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut tokens = tokenize(source);
        tokens.pop(); // Eof

        let mut depths = Vec::with_capacity(tokens.len());
        let mut depth = 0usize;
        for token in &tokens {
            match token.kind {
                TokenKind::LParen => {
                    depths.push(depth);
                    depth += 1;
                }
                TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    depths.push(depth);
                }
                _ => depths.push(depth),
            }
        }

        Scanned {
            source,
            tokens,
            depths,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    pub fn text(&self, index: usize) -> &'a str {
        self.tokens[index].text(self.source)
    }

    /// True when the token at `index` exists, is at depth 0 and has `kind`
    pub fn is_top(&self, index: usize, kind: TokenKind) -> bool {
        self.kind(index) == Some(kind) && self.depths[index] == 0
    }

    /// Index of the first depth-0 token of `kind` at or after `from`
    pub fn find_top(&self, from: usize, kind: TokenKind) -> Option<usize> {
        (from..self.len()).find(|&i| self.is_top(i, kind))
    }

    /// Byte offset where token `index` starts; `len()` maps to the end of
    /// the source.
    pub fn offset(&self, index: usize) -> usize {
        self.tokens
            .get(index)
            .map(|t| t.start)
            .unwrap_or(self.source.len())
    }

    /// Trimmed source text covering tokens `from..to`
    pub fn slice(&self, from: usize, to: usize) -> &'a str {
        if from >= to || from >= self.len() {
            return "";
        }
        let end = if to >= self.len() {
            self.source.len()
        } else {
            self.tokens[to - 1].end
        };
        self.source[self.tokens[from].start..end].trim()
    }

    /// Split at every depth-0 token accepted by `is_separator`. The
    /// separators themselves are dropped.
    pub fn split_where<F>(&self, mut is_separator: F) -> Vec<&'a str>
    where
        F: FnMut(usize) -> bool,
    {
        if self.source.trim().is_empty() {
            return Vec::new();
        }

        let mut parts = Vec::new();
        let mut seg_start = 0usize;
        for i in 0..self.len() {
            if self.depths[i] == 0 && is_separator(i) {
                parts.push(
                    self.source[seg_start..self.tokens[i].start].trim(),
                );
                seg_start = self.tokens[i].end;
            }
        }
        parts.push(self.source[seg_start..].trim());
        parts
    }

    /// Index of the `)` matching the `(` at `open`
    pub fn matching_paren(&self, open: usize) -> Option<usize> {
        if self.kind(open) != Some(TokenKind::LParen) {
            return None;
        }
        let depth = self.depths[open];
        (open + 1..self.len())
            .find(|&i| self.tokens[i].kind == TokenKind::RParen && self.depths[i] == depth)
    }
}

/// Split on commas at depth 0, outside quotes.
pub fn split_top_level_commas(text: &str) -> Vec<String> {
    split_on_kind(text, TokenKind::Comma)
}

/// Split on a keyword or punctuation token at depth 0.
pub fn split_on_kind(text: &str, kind: TokenKind) -> Vec<String> {
    let scanned = Scanned::new(text);
    scanned
        .split_where(|i| scanned.tokens[i].kind == kind)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Split a boolean expression on top-level AND.
///
/// The AND closing a `BETWEEN x AND y` is not a conjunction, so an AND
/// seen while the current segment has an open BETWEEN is skipped.
pub fn split_conjunction(text: &str) -> Vec<String> {
    let scanned = Scanned::new(text);
    let mut open_between = false;
    scanned
        .split_where(|i| match scanned.tokens[i].kind {
            TokenKind::Between => {
                open_between = true;
                false
            }
            TokenKind::And if open_between => {
                open_between = false;
                false
            }
            TokenKind::And => true,
            _ => false,
        })
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Strip one pair of parentheses that wraps the whole text.
///
/// `(a OR b)` → `a OR b`, but `(a) OR (b)` is left alone since the first
/// `(` closes before the end.
pub fn strip_outer_parens(text: &str) -> Option<String> {
    let scanned = Scanned::new(text);
    if scanned.is_empty() || scanned.kind(0) != Some(TokenKind::LParen) {
        return None;
    }
    let close = scanned.matching_paren(0)?;
    if close != scanned.len() - 1 {
        return None;
    }
    Some(scanned.slice(1, close).to_string())
}

/// Split `field = value` on its first top-level `=`.
pub fn split_assignment(text: &str) -> Option<(String, String)> {
    let scanned = Scanned::new(text);
    let eq = scanned.find_top(0, TokenKind::Eq)?;
    let field = scanned.slice(0, eq);
    let value = scanned.source[scanned.tokens[eq].end..].trim();
    if field.is_empty() {
        return None;
    }
    Some((field.to_string(), value.to_string()))
}

/// Drop `qualifier.` from every column reference `qualifier.column`.
/// Matching ignores case and quoting; literals are left alone.
pub fn strip_qualifier(text: &str, qualifier: &str) -> String {
    let scanned = Scanned::new(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i + 1 < scanned.len() {
        let token = scanned.tokens[i];
        let is_qualifier = token.kind.is_identifier()
            && scanned.kind(i + 1) == Some(TokenKind::Dot)
            && (i == 0 || scanned.kind(i - 1) != Some(TokenKind::Dot))
            && unquote_identifier(token.text(text)).eq_ignore_ascii_case(qualifier);
        if is_qualifier {
            out.push_str(&text[copied..token.start]);
            copied = scanned.tokens[i + 1].end;
            i += 2;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[copied..]);
    out
}
