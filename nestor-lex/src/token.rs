#![forbid(unsafe_code)]

use nestor_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwClass,
    KwStatic,
    KwFinal,
    KwExtends,
    KwNew,
    KwThis,
    KwSuper,
    KwReturn,
    KwIf,
    KwElse,
    KwWhile,
    KwVar,
    KwInt,
    KwBoolean,
    KwVoid,
    KwNull,
    KwTrue,
    KwFalse,

    // Operators / punctuation
    EqEq,
    Neq,
    Le,
    Ge,
    Lt,
    Gt,
    Eq,

    AndAnd,
    OrOr,
    Bang,

    Plus,
    Minus,
    Star,
    Slash,

    Dot,
    Comma,
    Semi,

    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,

    // Literals / identifiers
    Ident(String),
    Int(u64),
    String(String),
}

impl TokenKind {
    /// Short human-readable name for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Int(n) => format!("integer literal {n}"),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }
}
