use crate::symbol::{Span, SrcOffset};

/// Marks a full-line comment when it starts the first token of a line.
pub const COMMENT_MARKER: char = '#';

/// Represents a single "word" inside the source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token<'a> {
    pub val: &'a str,
    pub span: Span,
}

/// A non-empty, non-comment source line split into tokens.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SourceLine<'a> {
    /// 1-based line number inside the source
    pub line: usize,
    /// Never empty
    pub tokens: Vec<Token<'a>>,
}

impl<'a> SourceLine<'a> {
    pub fn first(&self) -> Token<'a> {
        self.tokens[0]
    }

    /// Span from the start of the first token to the end of the last one.
    pub fn span(&self) -> Span {
        let start = self.tokens[0].span.offs();
        let last = self.tokens[self.tokens.len() - 1].span;
        Span::new(SrcOffset(start), last.offs() + last.len() - start)
    }
}

/// Turn source into a list of token lines. Blank lines and comment lines are dropped, so
/// the index of each returned line is its memory address.
///
/// Only the space character separates tokens and only `'\n'` separates lines, so a `'\r'`
/// left by CRLF line endings stays part of the last token on its line.
pub fn tokenize(src: &str) -> Vec<SourceLine<'_>> {
    let mut lines = Vec::new();
    let mut line_offs = 0;

    for (i, line) in src.split('\n').enumerate() {
        let tokens = split_tokens(line, line_offs);
        line_offs += line.len() + 1;

        match tokens.first() {
            None => continue,
            Some(tok) if tok.val.starts_with(COMMENT_MARKER) => continue,
            Some(_) => lines.push(SourceLine { line: i + 1, tokens }),
        }
    }
    lines
}

fn split_tokens(line: &str, line_offs: usize) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut col = 0;
    for word in line.split(' ') {
        if !word.is_empty() {
            tokens.push(Token {
                val: word,
                span: Span::new(SrcOffset(line_offs + col), word.len()),
            });
        }
        col += word.len() + 1;
    }
    tokens
}
