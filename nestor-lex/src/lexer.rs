#![forbid(unsafe_code)]

use nestor_ast::{span_between, Span};
use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(nestor::lex))]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
enum RawToken {
    #[token("class")]
    KwClass,
    #[token("static")]
    KwStatic,
    #[token("final")]
    KwFinal,
    #[token("extends")]
    KwExtends,
    #[token("new")]
    KwNew,
    #[token("this")]
    KwThis,
    #[token("super")]
    KwSuper,
    #[token("return")]
    KwReturn,
    #[token("if")]
    KwIf,
    #[token("else")]
    KwElse,
    #[token("while")]
    KwWhile,
    #[token("var")]
    KwVar,
    #[token("int")]
    KwInt,
    #[token("boolean")]
    KwBoolean,
    #[token("void")]
    KwVoid,
    #[token("null")]
    KwNull,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,

    #[token("==")]
    EqEq,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[regex(r"0x[0-9a-fA-F_]+", |lex| parse_int_prefixed(lex.slice(), 16, 2))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_int_decimal(lex.slice()))]
    Int(Option<u64>),

    // String literals: "..." with \n, \t, \r, \", \\ escapes.
    #[regex(r#"\"([^\"\\\n]|\\.)*\""#, parse_string)]
    String(Option<String>),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn parse_int_decimal(s: &str) -> Option<u64> {
    let digits = strip_underscores(s)?;
    digits.parse::<u64>().ok()
}

fn parse_int_prefixed(s: &str, radix: u32, prefix_len: usize) -> Option<u64> {
    let rest = s.get(prefix_len..)?;
    let digits = strip_underscores(rest)?;
    u64::from_str_radix(&digits, radix).ok()
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

fn parse_string(lex: &mut logos::Lexer<RawToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len().saturating_sub(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            _ => return None,
        }
    }

    Some(out)
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = RawToken::lexer(self.src);

        while let Some(raw) = lex.next() {
            let range = lex.span();
            let span = span_between(range.start, range.end);

            let kind = match raw {
                Ok(RawToken::KwClass) => TokenKind::KwClass,
                Ok(RawToken::KwStatic) => TokenKind::KwStatic,
                Ok(RawToken::KwFinal) => TokenKind::KwFinal,
                Ok(RawToken::KwExtends) => TokenKind::KwExtends,
                Ok(RawToken::KwNew) => TokenKind::KwNew,
                Ok(RawToken::KwThis) => TokenKind::KwThis,
                Ok(RawToken::KwSuper) => TokenKind::KwSuper,
                Ok(RawToken::KwReturn) => TokenKind::KwReturn,
                Ok(RawToken::KwIf) => TokenKind::KwIf,
                Ok(RawToken::KwElse) => TokenKind::KwElse,
                Ok(RawToken::KwWhile) => TokenKind::KwWhile,
                Ok(RawToken::KwVar) => TokenKind::KwVar,
                Ok(RawToken::KwInt) => TokenKind::KwInt,
                Ok(RawToken::KwBoolean) => TokenKind::KwBoolean,
                Ok(RawToken::KwVoid) => TokenKind::KwVoid,
                Ok(RawToken::KwNull) => TokenKind::KwNull,
                Ok(RawToken::KwTrue) => TokenKind::KwTrue,
                Ok(RawToken::KwFalse) => TokenKind::KwFalse,

                Ok(RawToken::EqEq) => TokenKind::EqEq,
                Ok(RawToken::Neq) => TokenKind::Neq,
                Ok(RawToken::Le) => TokenKind::Le,
                Ok(RawToken::Ge) => TokenKind::Ge,
                Ok(RawToken::Lt) => TokenKind::Lt,
                Ok(RawToken::Gt) => TokenKind::Gt,
                Ok(RawToken::Eq) => TokenKind::Eq,

                Ok(RawToken::AndAnd) => TokenKind::AndAnd,
                Ok(RawToken::OrOr) => TokenKind::OrOr,
                Ok(RawToken::Bang) => TokenKind::Bang,

                Ok(RawToken::Plus) => TokenKind::Plus,
                Ok(RawToken::Minus) => TokenKind::Minus,
                Ok(RawToken::Star) => TokenKind::Star,
                Ok(RawToken::Slash) => TokenKind::Slash,

                Ok(RawToken::Dot) => TokenKind::Dot,
                Ok(RawToken::Comma) => TokenKind::Comma,
                Ok(RawToken::Semi) => TokenKind::Semi,

                Ok(RawToken::LParen) => TokenKind::LParen,
                Ok(RawToken::RParen) => TokenKind::RParen,
                Ok(RawToken::LBrace) => TokenKind::LBrace,
                Ok(RawToken::RBrace) => TokenKind::RBrace,

                Ok(RawToken::Int(Some(n))) => TokenKind::Int(n),
                Ok(RawToken::Int(None)) => {
                    return Err(LexError {
                        message: format!("invalid integer literal '{}'", lex.slice()),
                        span,
                    });
                }

                Ok(RawToken::String(Some(s))) => TokenKind::String(s),
                Ok(RawToken::String(None)) => {
                    return Err(LexError {
                        message: format!("invalid string literal {}", lex.slice()),
                        span,
                    });
                }

                Ok(RawToken::Ident(name)) => TokenKind::Ident(name),

                Err(()) => {
                    return Err(LexError {
                        message: format!("unexpected character '{}'", lex.slice()),
                        span,
                    });
                }
            };

            tokens.push(Token { kind, span });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(self.src.len(), self.src.len()),
        });

        Ok(tokens)
    }
}
