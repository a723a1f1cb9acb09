//! Selector tokenizer.
//!
//! Like the wikitext lexers elsewhere in the workspace, every byte lands in
//! some token: characters Logos does not recognize become [`TokenKind::Unknown`]
//! so that pseudo-class arguments such as `-n+3` can still be read back from
//! their spans. The parser decides whether an unknown token is an error.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    /// Type names, attribute keys, pseudo-class names, unquoted values
    #[regex(r"[A-Za-z_][A-Za-z0-9_-]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Number,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    Quoted,

    #[token("*")]
    Star,

    #[token(">")]
    Gt,

    #[token("+")]
    Plus,

    #[token("~")]
    Tilde,

    #[token(",")]
    Comma,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(":")]
    Colon,

    #[token("=")]
    Eq,

    #[token("!=")]
    NotEq,

    #[token("^=")]
    PrefixEq,

    #[token("$=")]
    SuffixEq,

    #[token("*=")]
    ContainsEq,

    /// Anything Logos rejected
    Unknown,
}

impl TokenKind {
    /// How the token is named in error messages.
    pub(crate) fn describe(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Ident => "identifier",
            TokenKind::Number => "number",
            TokenKind::Quoted => "string",
            TokenKind::Star => "`*`",
            TokenKind::Gt => "`>`",
            TokenKind::Plus => "`+`",
            TokenKind::Tilde => "`~`",
            TokenKind::Comma => "`,`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::Colon => "`:`",
            TokenKind::Eq => "`=`",
            TokenKind::NotEq => "`!=`",
            TokenKind::PrefixEq => "`^=`",
            TokenKind::SuffixEq => "`$=`",
            TokenKind::ContainsEq => "`*=`",
            TokenKind::Unknown => "unexpected character",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
    pub(crate) span: Range<usize>,
}

pub(crate) fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);
    while let Some(result) = lexer.next() {
        let kind = result.unwrap_or(TokenKind::Unknown);
        tokens.push(Token {
            kind,
            text: lexer.slice(),
            span: lexer.span(),
        });
    }
    tokens
}

/// The content of a quoted token with backslash escapes resolved.
pub(crate) fn unquote(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
