#![forbid(unsafe_code)]

use std::mem;

use nestor_ast::{
    span_between, AssignExpr, BinOp, BinaryExpr, Block, CallExpr, ClassDecl, CtorDecl, Expr,
    ExprKind, FieldAccess, FieldDecl, Ident, IfStmt, LocalDecl, Member, MethodDecl, NameExpr,
    NamedType, NewExpr, NodeIdGen, Param, Program, QualifiedThis, ReturnStmt, Span, Stmt,
    SuperCall, TypeRef, TypeRefKind, UnaryExpr, UnaryOp, WhileStmt,
};
use nestor_lex::{Token, TokenKind};

use crate::error::ParseError;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    ids: NodeIdGen,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            idx: 0,
            ids: NodeIdGen::new(),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut classes = Vec::new();
        while !self.at(TokenKind::Eof) {
            classes.push(self.parse_class_decl()?);
        }
        Ok(Program { classes })
    }

    fn parse_class_decl(&mut self) -> Result<ClassDecl, ParseError> {
        let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));
        let is_static = if self.at(TokenKind::KwStatic) {
            self.next();
            true
        } else {
            false
        };
        self.parse_class_decl_after_modifiers(start, is_static)
    }

    fn parse_class_decl_after_modifiers(
        &mut self,
        start: Span,
        is_static: bool,
    ) -> Result<ClassDecl, ParseError> {
        self.expect(TokenKind::KwClass)?;
        let name = self.expect_ident()?;

        let extends = if self.at(TokenKind::KwExtends) {
            self.next();
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) {
            members.push(self.parse_member()?);
        }
        let close = self.expect(TokenKind::RBrace)?;

        Ok(ClassDecl {
            id: self.ids.fresh(),
            span: join(start, close.span),
            is_static,
            name,
            extends,
            members,
        })
    }

    fn parse_member(&mut self) -> Result<Member, ParseError> {
        let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));

        let mut is_static = false;
        let mut is_final = false;
        loop {
            if self.at(TokenKind::KwStatic) {
                self.next();
                is_static = true;
            } else if self.at(TokenKind::KwFinal) {
                self.next();
                is_final = true;
            } else {
                break;
            }
        }

        if self.at(TokenKind::KwClass) {
            let decl = self.parse_class_decl_after_modifiers(start, is_static)?;
            return Ok(Member::Class(decl));
        }

        // Constructor: `Name(params) { ... }` with no leading type.
        if self.at_ident() && matches!(self.peek_kind_n(1), Some(TokenKind::LParen)) {
            if is_static || is_final {
                return Err(ParseError {
                    message: "constructors cannot be static or final".to_string(),
                    span: start,
                });
            }
            let name = self.expect_ident()?;
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let span = join(start, body.span);
            return Ok(Member::Ctor(CtorDecl {
                id: self.ids.fresh(),
                span,
                name,
                params,
                body,
            }));
        }

        let ty = self.parse_type()?;
        let name = self.expect_ident()?;

        if self.at(TokenKind::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let span = join(start, body.span);
            return Ok(Member::Method(MethodDecl {
                id: self.ids.fresh(),
                span,
                is_static,
                ret: ty,
                name,
                params,
                body,
            }));
        }

        let init = if self.at(TokenKind::Eq) {
            self.next();
            Some(self.parse_expr()?)
        } else {
            None
        };
        let semi = self.expect(TokenKind::Semi)?;

        Ok(Member::Field(FieldDecl {
            id: self.ids.fresh(),
            span: join(start, semi.span),
            is_static,
            is_final,
            ty,
            name,
            init,
        }))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let name = self.expect_ident()?;
                let span = join(ty.span, name.span);
                params.push(Param { span, ty, name });
                if self.at(TokenKind::Comma) {
                    self.next();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_type(&mut self) -> Result<TypeRef, ParseError> {
        let tok = self.expect_any()?;
        let kind = match tok.kind {
            TokenKind::KwInt => TypeRefKind::Int,
            TokenKind::KwBoolean => TypeRefKind::Boolean,
            TokenKind::KwVoid => TypeRefKind::Void,
            TokenKind::Ident(name) => TypeRefKind::Named(NamedType {
                id: self.ids.fresh(),
                name,
            }),
            other => {
                return Err(ParseError {
                    message: format!("expected a type, found {}", other.describe()),
                    span: tok.span,
                });
            }
        };
        Ok(TypeRef {
            span: tok.span,
            kind,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        let close = self.expect(TokenKind::RBrace)?;
        Ok(Block {
            span: join(open.span, close.span),
            stmts,
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));

        if self.at(TokenKind::KwClass) {
            let decl = self.parse_class_decl_after_modifiers(start, false)?;
            return Ok(Stmt::LocalClass(decl));
        }

        if self.at(TokenKind::KwReturn) {
            self.next();
            let value = if self.at(TokenKind::Semi) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            let semi = self.expect(TokenKind::Semi)?;
            return Ok(Stmt::Return(ReturnStmt {
                span: join(start, semi.span),
                value,
            }));
        }

        if self.at(TokenKind::KwIf) {
            return self.parse_if_stmt();
        }

        if self.at(TokenKind::KwWhile) {
            self.next();
            self.expect(TokenKind::LParen)?;
            let cond = self.parse_expr()?;
            self.expect(TokenKind::RParen)?;
            let body = self.parse_block()?;
            let span = join(start, body.span);
            return Ok(Stmt::While(WhileStmt { span, cond, body }));
        }

        if self.at(TokenKind::LBrace) {
            return Ok(Stmt::Block(self.parse_block()?));
        }

        if self.at(TokenKind::KwVar) {
            self.next();
            let name = self.expect_ident()?;
            self.expect(TokenKind::Eq)?;
            let init = self.parse_expr()?;
            let semi = self.expect(TokenKind::Semi)?;
            return Ok(Stmt::Local(LocalDecl {
                span: join(start, semi.span),
                ty: None,
                name,
                init: Some(init),
            }));
        }

        // `int x ...`, `boolean x ...`, `Foo x ...` are local declarations;
        // anything else is an expression statement.
        let is_local_decl = match self.peek_kind() {
            Some(TokenKind::KwInt) | Some(TokenKind::KwBoolean) => true,
            Some(TokenKind::Ident(_)) => {
                matches!(self.peek_kind_n(1), Some(TokenKind::Ident(_)))
            }
            _ => false,
        };

        if is_local_decl {
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            let init = if self.at(TokenKind::Eq) {
                self.next();
                Some(self.parse_expr()?)
            } else {
                None
            };
            let semi = self.expect(TokenKind::Semi)?;
            return Ok(Stmt::Local(LocalDecl {
                span: join(start, semi.span),
                ty: Some(ty),
                name,
                init,
            }));
        }

        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(TokenKind::KwIf)?.span;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_block()?;

        let else_branch = if self.at(TokenKind::KwElse) {
            self.next();
            if self.at(TokenKind::KwIf) {
                // `else if` chains become a single-statement else block.
                let nested = self.parse_if_stmt()?;
                let span = match &nested {
                    Stmt::If(s) => s.span,
                    _ => then_branch.span,
                };
                Some(Block {
                    span,
                    stmts: vec![nested],
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        let end = else_branch
            .as_ref()
            .map(|b| b.span)
            .unwrap_or(then_branch.span);
        Ok(Stmt::If(IfStmt {
            span: join(start, end),
            cond,
            then_branch,
            else_branch,
        }))
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_or()?;
        if self.at(TokenKind::Eq) {
            self.next();
            let rhs = self.parse_assign()?;
            let span = join(lhs.span, rhs.span);
            return Ok(Expr {
                span,
                kind: ExprKind::Assign(Box::new(AssignExpr { lhs, rhs })),
            });
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.at(TokenKind::OrOr) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.at(TokenKind::AndAnd) {
            self.next();
            let rhs = self.parse_equality()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinOp::Eq,
                Some(TokenKind::Neq) => BinOp::Neq,
                _ => break,
            };
            self.next();
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Lt) => BinOp::Lt,
                Some(TokenKind::Gt) => BinOp::Gt,
                Some(TokenKind::Le) => BinOp::Le,
                Some(TokenKind::Ge) => BinOp::Ge,
                _ => break,
            };
            self.next();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                _ => break,
            };
            self.next();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Bang) => Some(UnaryOp::Not),
            Some(TokenKind::Minus) => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.expect_any()?.span;
            let expr = self.parse_unary()?;
            let span = join(start, expr.span);
            return Ok(Expr {
                span,
                kind: ExprKind::Unary(UnaryExpr {
                    op,
                    expr: Box::new(expr),
                }),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        while self.at(TokenKind::Dot) {
            self.next();

            if self.at(TokenKind::KwThis) {
                let this_tok = self.expect_any()?;
                let outer = match expr.kind {
                    ExprKind::Name(name) => name.name,
                    _ => {
                        return Err(ParseError {
                            message: "qualified 'this' must name an enclosing type".to_string(),
                            span: this_tok.span,
                        });
                    }
                };
                let span = join(expr.span, this_tok.span);
                expr = Expr {
                    span,
                    kind: ExprKind::QualifiedThis(QualifiedThis {
                        id: self.ids.fresh(),
                        outer,
                    }),
                };
                continue;
            }

            let name = self.expect_ident()?;
            if self.at(TokenKind::LParen) {
                let args = self.parse_args()?;
                let end = self.prev_span();
                let span = join(expr.span, end);
                expr = Expr {
                    span,
                    kind: ExprKind::Call(CallExpr {
                        id: self.ids.fresh(),
                        recv: Some(Box::new(expr)),
                        name,
                        args,
                    }),
                };
            } else {
                let span = join(expr.span, name.span);
                expr = Expr {
                    span,
                    kind: ExprKind::Field(FieldAccess {
                        recv: Box::new(expr),
                        name,
                    }),
                };
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.expect_any()?;
        let expr = match tok.kind {
            TokenKind::Int(n) => Expr {
                span: tok.span,
                kind: ExprKind::Int(n),
            },
            TokenKind::String(s) => Expr {
                span: tok.span,
                kind: ExprKind::Str(s),
            },
            TokenKind::KwTrue => Expr {
                span: tok.span,
                kind: ExprKind::Bool(true),
            },
            TokenKind::KwFalse => Expr {
                span: tok.span,
                kind: ExprKind::Bool(false),
            },
            TokenKind::KwNull => Expr {
                span: tok.span,
                kind: ExprKind::Null,
            },
            TokenKind::KwThis => Expr {
                span: tok.span,
                kind: ExprKind::This,
            },
            TokenKind::KwSuper => {
                if !self.at(TokenKind::LParen) {
                    return Err(ParseError {
                        message: "expected '(' after 'super'".to_string(),
                        span: tok.span,
                    });
                }
                let args = self.parse_args()?;
                let span = join(tok.span, self.prev_span());
                Expr {
                    span,
                    kind: ExprKind::SuperCall(SuperCall {
                        id: self.ids.fresh(),
                        args,
                    }),
                }
            }
            TokenKind::KwNew => {
                let class = self.parse_type()?;
                if class.named().is_none() {
                    return Err(ParseError {
                        message: "'new' requires a class type".to_string(),
                        span: class.span,
                    });
                }
                let args = self.parse_args()?;
                let body = if self.at(TokenKind::LBrace) {
                    self.next();
                    let mut members = Vec::new();
                    while !self.at(TokenKind::RBrace) {
                        members.push(self.parse_member()?);
                    }
                    self.expect(TokenKind::RBrace)?;
                    Some(members)
                } else {
                    None
                };
                let span = join(tok.span, self.prev_span());
                Expr {
                    span,
                    kind: ExprKind::New(NewExpr {
                        id: self.ids.fresh(),
                        class,
                        args,
                        body,
                    }),
                }
            }
            TokenKind::Ident(name) => {
                let ident = Ident::new(tok.span, name);
                if self.at(TokenKind::LParen) {
                    let args = self.parse_args()?;
                    let span = join(tok.span, self.prev_span());
                    Expr {
                        span,
                        kind: ExprKind::Call(CallExpr {
                            id: self.ids.fresh(),
                            recv: None,
                            name: ident,
                            args,
                        }),
                    }
                } else {
                    Expr {
                        span: tok.span,
                        kind: ExprKind::Name(NameExpr {
                            id: self.ids.fresh(),
                            name: ident,
                        }),
                    }
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                inner
            }
            other => {
                return Err(ParseError {
                    message: format!("expected an expression, found {}", other.describe()),
                    span: tok.span,
                });
            }
        };
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.at(TokenKind::Comma) {
                    self.next();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident::new(tok.span, name)),
            other => Err(ParseError {
                message: format!("expected identifier, found {}", other.describe()),
                span: tok.span,
            }),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError {
                message: format!(
                    "expected {}, found {}",
                    expected.describe(),
                    tok.kind.describe()
                ),
                span: tok.span,
            })
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        self.next().ok_or_else(|| ParseError {
            message: "unexpected end of input".to_string(),
            span: span_between(0, 0),
        })
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn at_ident(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Ident(_)))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn peek_kind_n(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.idx + n).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.idx).map(|t| t.span)
    }

    fn prev_span(&self) -> Span {
        self.tokens
            .get(self.idx.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or_else(|| span_between(0, 0))
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = join(lhs.span, rhs.span);
    Expr {
        span,
        kind: ExprKind::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }),
    }
}

fn join(a: Span, b: Span) -> Span {
    let a0: usize = a.offset();
    let b0: usize = b.offset();
    let b1 = b0 + b.len();
    if b1 >= a0 {
        span_between(a0, b1)
    } else {
        a
    }
}
