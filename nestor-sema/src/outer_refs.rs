#![forbid(unsafe_code)]

use std::fmt;

use nestor_ast::{
    Block, CallExpr, Expr, ExprKind, Member, NameExpr, NewExpr, QualifiedThis, Stmt, TypeRef,
};

use crate::symbols::{
    enclosing_chain, member_of_enclosing, SymbolId, SymbolKind, SymbolTable,
};
use crate::Candidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceVerdict {
    NoOuterReference,
    OuterReference(OuterRefReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OuterRefReason {
    /// An unqualified name resolved to an instance member of an enclosing
    /// class.
    InstanceMemberAccess,
    /// `Outer.this` naming an enclosing class.
    QualifiedThis,
    /// A constructor invocation threads an enclosing instance.
    ConstructorRequiresOuter,
    /// A name could not be resolved; conversion cannot be proven safe.
    UnresolvedSymbol,
}

impl fmt::Display for OuterRefReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            OuterRefReason::InstanceMemberAccess => {
                "reads or calls an instance member of an enclosing class"
            }
            OuterRefReason::QualifiedThis => "captures an enclosing instance via qualified this",
            OuterRefReason::ConstructorRequiresOuter => {
                "constructs an inner class of an enclosing class"
            }
            OuterRefReason::UnresolvedSymbol => "contains names that could not be resolved",
        };
        f.write_str(msg)
    }
}

/// Walk the candidate's declaration subtree and report the first construct
/// that needs an instance of an enclosing class.
///
/// Bodies of further-nested *member* classes are skipped (they bind their own
/// outer instance and are analyzed as candidates in their own right); local
/// and anonymous class bodies share the candidate's outer slot and are
/// traversed.
pub fn references_outer<T: SymbolTable + ?Sized>(
    table: &T,
    candidate: &Candidate<'_>,
) -> ReferenceVerdict {
    let chain = enclosing_chain(table, candidate.symbol);
    let cand_supers = table.super_classes(candidate.symbol);

    let mut sites = RefSites::new(&candidate.decl.members, candidate.decl.extends.as_ref());
    match sites.find_map(|site| judge(table, candidate.symbol, &cand_supers, &chain, site)) {
        Some(reason) => ReferenceVerdict::OuterReference(reason),
        None => ReferenceVerdict::NoOuterReference,
    }
}

/// One node kind the outer-reference predicate has an opinion about.
enum RefSite<'a> {
    Name(&'a NameExpr),
    /// Unqualified call (implicit receiver).
    Call(&'a CallExpr),
    QualifiedThis(&'a QualifiedThis),
    New(&'a NewExpr),
    /// Super-constructor delegation to the `extends` clause of the class
    /// whose constructor runs it. Explicit `super(...)` and the implicit
    /// delegation of a class declared inside the candidate both count.
    Super(Option<&'a TypeRef>),
}

/// Lazy, restartable sequence of reference-candidate nodes. The verdict is a
/// disjunction over all sites, so consumers may short-circuit freely.
struct RefSites<'a> {
    stack: Vec<Work<'a>>,
}

enum Work<'a> {
    Members(&'a [Member], Option<&'a TypeRef>),
    Block(&'a Block, Option<&'a TypeRef>),
    Stmt(&'a Stmt, Option<&'a TypeRef>),
    Expr(&'a Expr, Option<&'a TypeRef>),
    /// Implicit super delegation owed by a class declared in the subtree.
    Extends(Option<&'a TypeRef>),
}

impl<'a> RefSites<'a> {
    fn new(members: &'a [Member], extends: Option<&'a TypeRef>) -> Self {
        Self {
            stack: vec![Work::Members(members, extends)],
        }
    }
}

impl<'a> Iterator for RefSites<'a> {
    type Item = RefSite<'a>;

    fn next(&mut self) -> Option<RefSite<'a>> {
        while let Some(work) = self.stack.pop() {
            match work {
                Work::Members(members, extends) => {
                    for member in members {
                        match member {
                            Member::Field(field) => {
                                if let Some(init) = &field.init {
                                    self.stack.push(Work::Expr(init, extends));
                                }
                            }
                            Member::Method(method) => {
                                self.stack.push(Work::Block(&method.body, extends));
                            }
                            Member::Ctor(ctor) => {
                                self.stack.push(Work::Block(&ctor.body, extends));
                            }
                            // Nested member classes bind their own outer
                            // instance, so their bodies are not this
                            // candidate's problem; their supertype still
                            // is, because constructing them delegates
                            // through it.
                            Member::Class(nested) => {
                                self.stack.push(Work::Extends(nested.extends.as_ref()));
                            }
                        }
                    }
                }
                Work::Block(block, extends) => {
                    for stmt in &block.stmts {
                        self.stack.push(Work::Stmt(stmt, extends));
                    }
                }
                Work::Stmt(stmt, extends) => match stmt {
                    Stmt::Local(local) => {
                        if let Some(init) = &local.init {
                            self.stack.push(Work::Expr(init, extends));
                        }
                    }
                    Stmt::LocalClass(decl) => {
                        self.stack
                            .push(Work::Members(&decl.members, decl.extends.as_ref()));
                        self.stack.push(Work::Extends(decl.extends.as_ref()));
                    }
                    Stmt::Expr(expr) => self.stack.push(Work::Expr(expr, extends)),
                    Stmt::Return(ret) => {
                        if let Some(value) = &ret.value {
                            self.stack.push(Work::Expr(value, extends));
                        }
                    }
                    Stmt::If(if_stmt) => {
                        self.stack.push(Work::Expr(&if_stmt.cond, extends));
                        self.stack.push(Work::Block(&if_stmt.then_branch, extends));
                        if let Some(else_branch) = &if_stmt.else_branch {
                            self.stack.push(Work::Block(else_branch, extends));
                        }
                    }
                    Stmt::While(while_stmt) => {
                        self.stack.push(Work::Expr(&while_stmt.cond, extends));
                        self.stack.push(Work::Block(&while_stmt.body, extends));
                    }
                    Stmt::Block(inner) => self.stack.push(Work::Block(inner, extends)),
                },
                Work::Expr(expr, extends) => match &expr.kind {
                    ExprKind::Int(_)
                    | ExprKind::Str(_)
                    | ExprKind::Bool(_)
                    | ExprKind::Null
                    | ExprKind::This => {}
                    ExprKind::Name(name) => return Some(RefSite::Name(name)),
                    ExprKind::QualifiedThis(q) => return Some(RefSite::QualifiedThis(q)),
                    ExprKind::Field(field) => {
                        self.stack.push(Work::Expr(&field.recv, extends));
                    }
                    ExprKind::Call(call) => {
                        for arg in &call.args {
                            self.stack.push(Work::Expr(arg, extends));
                        }
                        match &call.recv {
                            Some(recv) => self.stack.push(Work::Expr(recv, extends)),
                            None => return Some(RefSite::Call(call)),
                        }
                    }
                    ExprKind::New(new_expr) => {
                        for arg in &new_expr.args {
                            self.stack.push(Work::Expr(arg, extends));
                        }
                        if let Some(body) = &new_expr.body {
                            // Anonymous classes extend the named base type.
                            self.stack
                                .push(Work::Members(body, Some(&new_expr.class)));
                        }
                        return Some(RefSite::New(new_expr));
                    }
                    ExprKind::SuperCall(super_call) => {
                        for arg in &super_call.args {
                            self.stack.push(Work::Expr(arg, extends));
                        }
                        return Some(RefSite::Super(extends));
                    }
                    ExprKind::Assign(assign) => {
                        self.stack.push(Work::Expr(&assign.lhs, extends));
                        self.stack.push(Work::Expr(&assign.rhs, extends));
                    }
                    ExprKind::Binary(binary) => {
                        self.stack.push(Work::Expr(&binary.lhs, extends));
                        self.stack.push(Work::Expr(&binary.rhs, extends));
                    }
                    ExprKind::Unary(unary) => {
                        self.stack.push(Work::Expr(&unary.expr, extends));
                    }
                },
                Work::Extends(ty) => return Some(RefSite::Super(ty)),
            }
        }
        None
    }
}

fn judge<T: SymbolTable + ?Sized>(
    table: &T,
    candidate: SymbolId,
    cand_supers: &[SymbolId],
    chain: &[SymbolId],
    site: RefSite<'_>,
) -> Option<OuterRefReason> {
    match site {
        RefSite::Name(name) => {
            let Some(sym) = table.symbol_at(name.id) else {
                return Some(OuterRefReason::UnresolvedSymbol);
            };
            member_use(table, candidate, cand_supers, chain, sym)
        }
        RefSite::Call(call) => {
            let Some(sym) = table.symbol_at(call.id) else {
                return Some(OuterRefReason::UnresolvedSymbol);
            };
            member_use(table, candidate, cand_supers, chain, sym)
        }
        RefSite::QualifiedThis(q) => {
            let Some(sym) = table.symbol_at(q.id) else {
                return Some(OuterRefReason::UnresolvedSymbol);
            };
            if sym == candidate {
                return None;
            }
            if chain.contains(&sym) {
                return Some(OuterRefReason::QualifiedThis);
            }
            None
        }
        RefSite::New(new_expr) => {
            let sym = new_expr
                .class
                .named()
                .and_then(|named| table.symbol_at(named.id));
            let Some(sym) = sym else {
                return Some(OuterRefReason::UnresolvedSymbol);
            };
            constructed_class(table, candidate, cand_supers, sym)
        }
        RefSite::Super(extends) => {
            // No extends clause: delegation to the implicit root, never an
            // outer reference.
            let Some(sup_ref) = extends else {
                return None;
            };
            let sym = sup_ref.named().and_then(|named| table.symbol_at(named.id));
            let Some(sym) = sym else {
                return Some(OuterRefReason::UnresolvedSymbol);
            };
            constructed_class(table, candidate, cand_supers, sym)
        }
    }
}

/// Unqualified use of a resolved symbol: an outer reference when it is an
/// instance member belonging to the enclosing chain rather than to the
/// candidate's own class or superclasses.
fn member_use<T: SymbolTable + ?Sized>(
    table: &T,
    candidate: SymbolId,
    cand_supers: &[SymbolId],
    chain: &[SymbolId],
    sym: SymbolId,
) -> Option<OuterRefReason> {
    match table.kind(sym) {
        // Locals and captured locals need no instance; bare type names are
        // not instance references.
        SymbolKind::Local | SymbolKind::Class => None,
        SymbolKind::Field | SymbolKind::Method => {
            if table.is_static(sym) || table.is_const(sym) {
                return None;
            }
            let Some(owner) = table.owner(sym) else {
                return Some(OuterRefReason::UnresolvedSymbol);
            };
            // The candidate's own members (declared or inherited) bind the
            // candidate's `this`, which survives the conversion.
            if owner == candidate || cand_supers.contains(&owner) {
                return None;
            }
            if member_of_enclosing(table, sym, chain) {
                return Some(OuterRefReason::InstanceMemberAccess);
            }
            None
        }
    }
}

/// Constructing (or delegating to a constructor of) `class_sym`: an outer
/// reference when that class, or anything it inherits from, needs an
/// enclosing instance the candidate cannot supply from its own `this`.
/// Constructor delegation runs the whole superclass chain, so a transitive
/// outer requirement is as binding as a direct one.
fn constructed_class<T: SymbolTable + ?Sized>(
    table: &T,
    candidate: SymbolId,
    cand_supers: &[SymbolId],
    class_sym: SymbolId,
) -> Option<OuterRefReason> {
    // The candidate and its own supertype chain are already known safe: the
    // gate vetted the explicit supertype, and constructing the candidate
    // itself needs no outer instance once the conversion is applied.
    if class_sym == candidate || cand_supers.contains(&class_sym) {
        return None;
    }
    for sym in std::iter::once(class_sym).chain(table.super_classes(class_sym)) {
        if sym == candidate || cand_supers.contains(&sym) {
            continue;
        }
        if !table.has_outer_instance(sym) {
            continue;
        }
        let Some(owner) = table.owner(sym) else {
            return Some(OuterRefReason::UnresolvedSymbol);
        };
        // Owned by the candidate (or its supers): the candidate's own
        // `this` serves as the enclosing instance.
        if owner == candidate || cand_supers.contains(&owner) {
            continue;
        }
        return Some(OuterRefReason::ConstructorRequiresOuter);
    }
    None
}
