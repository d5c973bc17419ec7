#![forbid(unsafe_code)]

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

pub type Ident = Spanned<String>;

/// Identity of an AST node that name resolution can be asked about.
///
/// The binder records resolutions in a side table keyed by `NodeId`, so the
/// tree itself stays immutable and the analysis reads symbols through the
/// table only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

impl Default for NodeIdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub id: NodeId,
    pub span: Span,
    pub is_static: bool,
    pub name: Ident,
    pub extends: Option<TypeRef>,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Ctor(CtorDecl),
    Class(ClassDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub span: Span,
    pub is_static: bool,
    pub is_final: bool,
    pub ty: TypeRef,
    pub name: Ident,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub span: Span,
    pub is_static: bool,
    pub ret: TypeRef,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CtorDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    pub ty: TypeRef,
    pub name: Ident,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Local(LocalDecl),
    LocalClass(ClassDecl),
    Expr(Expr),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    Block(Block),
}

/// `Type name = init;` or `var name = init;` (no type annotation).
#[derive(Clone, Debug, PartialEq)]
pub struct LocalDecl {
    pub span: Span,
    pub ty: Option<TypeRef>,
    pub name: Ident,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub span: Span,
    pub cond: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub span: Span,
    pub cond: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Int(u64),
    Str(String),
    Bool(bool),
    Null,
    /// Unqualified identifier occurrence.
    Name(NameExpr),
    This,
    /// `Outer.this`
    QualifiedThis(QualifiedThis),
    /// `recv.name` with an explicit receiver expression.
    Field(FieldAccess),
    /// `name(args)` or `recv.name(args)`.
    Call(CallExpr),
    /// `new Type(args)`, optionally with an anonymous class body.
    New(NewExpr),
    /// `super(args)` constructor delegation.
    SuperCall(SuperCall),
    Assign(Box<AssignExpr>),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NameExpr {
    pub id: NodeId,
    pub name: Ident,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QualifiedThis {
    pub id: NodeId,
    pub outer: Ident,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldAccess {
    pub recv: Box<Expr>,
    pub name: Ident,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub id: NodeId,
    pub recv: Option<Box<Expr>>,
    pub name: Ident,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewExpr {
    pub id: NodeId,
    pub class: TypeRef,
    pub args: Vec<Expr>,
    /// Present for anonymous class creations: `new Base() { members }`.
    pub body: Option<Vec<Member>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SuperCall {
    pub id: NodeId,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignExpr {
    pub lhs: Expr,
    pub rhs: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub span: Span,
    pub kind: TypeRefKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeRefKind {
    Int,
    Boolean,
    Void,
    Named(NamedType),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedType {
    pub id: NodeId,
    pub name: String,
}

impl TypeRef {
    pub fn named(&self) -> Option<&NamedType> {
        match &self.kind {
            TypeRefKind::Named(n) => Some(n),
            _ => None,
        }
    }
}
