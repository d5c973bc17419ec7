#![forbid(unsafe_code)]

mod bind;
mod eligibility;
mod error;
mod outer_refs;
mod symbols;

use nestor_ast::{Block, ClassDecl, Member, Program, Stmt};
use rayon::prelude::*;

pub use bind::bind;
pub use eligibility::{check_eligible, EligibilityVerdict, IneligibleReason};
pub use error::SemaError;
pub use outer_refs::{references_outer, OuterRefReason, ReferenceVerdict};
pub use symbols::{
    enclosing_chain, member_of_enclosing, Bindings, NestingKind, SymbolId, SymbolKind,
    SymbolTable,
};

/// A nested class under evaluation: its declaration subtree plus its class
/// symbol in the table.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub decl: &'a ClassDecl,
    pub symbol: SymbolId,
}

/// Outcome of analyzing one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Analysis {
    Ineligible(IneligibleReason),
    Analyzed(ReferenceVerdict),
}

impl Analysis {
    /// The candidate can be converted to a static declaration.
    pub fn convertible(&self) -> bool {
        matches!(self, Analysis::Analyzed(ReferenceVerdict::NoOuterReference))
    }
}

/// Sole per-candidate entry point: structural gate first, full body traversal
/// only for eligible candidates.
pub fn analyze<T: SymbolTable + ?Sized>(table: &T, candidate: &Candidate<'_>) -> Analysis {
    match check_eligible(table, candidate) {
        EligibilityVerdict::Ineligible(reason) => Analysis::Ineligible(reason),
        EligibilityVerdict::Eligible => Analysis::Analyzed(references_outer(table, candidate)),
    }
}

/// Binds a program once and answers "can this class be static?" for any of
/// its nested classes.
pub struct Sema<'a> {
    program: &'a Program,
    bindings: Bindings,
}

impl<'a> Sema<'a> {
    pub fn new(program: &'a Program) -> Self {
        let bindings = bind(program);
        Self { program, bindings }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn analyze_class(&self, decl: &ClassDecl) -> Analysis {
        match self.bindings.declared_symbol(decl.id) {
            Some(symbol) => analyze(&self.bindings, &Candidate { decl, symbol }),
            // No class symbol means a malformed tree; do not convert.
            None => Analysis::Analyzed(ReferenceVerdict::OuterReference(
                OuterRefReason::UnresolvedSymbol,
            )),
        }
    }

    pub fn can_be_static(&self, decl: &ClassDecl) -> bool {
        self.analyze_class(decl).convertible()
    }

    /// Look up a nested class by its dotted path, e.g. `"Outer.Inner"`.
    pub fn class_named(&self, path: &str) -> Result<&'a ClassDecl, SemaError> {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or_default();
        let mut current = self
            .program
            .classes
            .iter()
            .find(|c| c.name.node == first)
            .ok_or_else(|| SemaError::unknown_class(path))?;
        for part in parts {
            current = current
                .members
                .iter()
                .find_map(|m| match m {
                    Member::Class(c) if c.name.node == part => Some(c),
                    _ => None,
                })
                .ok_or_else(|| SemaError::unknown_class(path))?;
        }
        Ok(current)
    }

    /// Every nested class declaration in the program (member and local),
    /// paired with its dotted path.
    pub fn nested_classes(&self) -> Vec<(String, &'a ClassDecl)> {
        let mut out = Vec::new();
        for class in &self.program.classes {
            collect_nested(class, &class.name.node, &mut out);
        }
        out
    }

    /// Analyze every nested class. Each analysis only reads the shared table,
    /// so candidates run in parallel.
    pub fn analyze_all(&self) -> Vec<(String, Analysis)> {
        self.nested_classes()
            .par_iter()
            .map(|(path, decl)| (path.clone(), self.analyze_class(decl)))
            .collect()
    }
}

fn collect_nested<'a>(class: &'a ClassDecl, path: &str, out: &mut Vec<(String, &'a ClassDecl)>) {
    for member in &class.members {
        match member {
            Member::Class(nested) => {
                let nested_path = format!("{path}.{}", nested.name.node);
                out.push((nested_path.clone(), nested));
                collect_nested(nested, &nested_path, out);
            }
            Member::Method(method) => collect_in_block(&method.body, path, out),
            Member::Ctor(ctor) => collect_in_block(&ctor.body, path, out),
            Member::Field(_) => {}
        }
    }
}

fn collect_in_block<'a>(block: &'a Block, path: &str, out: &mut Vec<(String, &'a ClassDecl)>) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::LocalClass(decl) => {
                let nested_path = format!("{path}.{}", decl.name.node);
                out.push((nested_path.clone(), decl));
                collect_nested(decl, &nested_path, out);
            }
            Stmt::If(if_stmt) => {
                collect_in_block(&if_stmt.then_branch, path, out);
                if let Some(else_branch) = &if_stmt.else_branch {
                    collect_in_block(else_branch, path, out);
                }
            }
            Stmt::While(while_stmt) => collect_in_block(&while_stmt.body, path, out),
            Stmt::Block(inner) => collect_in_block(inner, path, out),
            _ => {}
        }
    }
}
