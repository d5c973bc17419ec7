#![forbid(unsafe_code)]

use std::collections::HashMap;

use nestor_ast::NodeId;

/// Index into the symbol arena built by the binder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Field,
    Method,
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NestingKind {
    TopLevel,
    Member,
    Local,
    Anonymous,
}

/// Read-only view of the resolved program the analysis runs against.
///
/// The production implementation is [`Bindings`]; tests can supply synthetic
/// symbol graphs without going through the frontend.
pub trait SymbolTable {
    /// Symbol a use- or declaration-site node resolved to, if any.
    fn symbol_at(&self, node: NodeId) -> Option<SymbolId>;
    fn kind(&self, sym: SymbolId) -> SymbolKind;
    fn owner(&self, sym: SymbolId) -> Option<SymbolId>;
    fn is_static(&self, sym: SymbolId) -> bool;
    /// Compile-time constant fields (static final with a literal initializer).
    fn is_const(&self, sym: SymbolId) -> bool;
    /// Transitive superclass closure of a class symbol, nearest first.
    fn super_classes(&self, class: SymbolId) -> Vec<SymbolId>;
    fn nesting_kind(&self, class: SymbolId) -> NestingKind;
    /// Whether instances of the class carry an implicit enclosing-instance
    /// reference.
    fn has_outer_instance(&self, class: SymbolId) -> bool;
}

/// Lexically enclosing class symbols, immediate owner first.
pub fn enclosing_chain<T: SymbolTable + ?Sized>(table: &T, class: SymbolId) -> Vec<SymbolId> {
    let mut chain = Vec::new();
    let mut cur = table.owner(class);
    while let Some(sym) = cur {
        if table.kind(sym) != SymbolKind::Class {
            break;
        }
        if chain.contains(&sym) {
            break;
        }
        chain.push(sym);
        cur = table.owner(sym);
    }
    chain
}

/// Whether `sym` is a member of any class in `chain`, counting members
/// inherited from a chain class's superclasses.
pub fn member_of_enclosing<T: SymbolTable + ?Sized>(
    table: &T,
    sym: SymbolId,
    chain: &[SymbolId],
) -> bool {
    let Some(owner) = table.owner(sym) else {
        return false;
    };
    chain
        .iter()
        .any(|&t| t == owner || table.super_classes(t).contains(&owner))
}

#[derive(Clone, Debug)]
pub(crate) struct SymbolInfo {
    pub name: String,
    pub kind: SymbolKind,
    pub owner: Option<SymbolId>,
    pub is_static: bool,
    pub is_const: bool,
    pub class: Option<ClassInfo>,
}

#[derive(Clone, Debug)]
pub(crate) struct ClassInfo {
    pub nesting: NestingKind,
    pub superclass: Option<SymbolId>,
    pub has_outer: bool,
}

/// Symbol table produced by the binder.
///
/// `resolutions` maps use-site nodes (identifiers, unqualified calls,
/// qualified-this, `new` class references) to symbols; `decls` maps
/// declaration nodes (class, field, method declarations and anonymous-class
/// creations) to the symbols they introduce.
#[derive(Debug, Default)]
pub struct Bindings {
    pub(crate) infos: Vec<SymbolInfo>,
    pub(crate) resolutions: HashMap<NodeId, SymbolId>,
    pub(crate) decls: HashMap<NodeId, SymbolId>,
}

impl Bindings {
    fn info(&self, sym: SymbolId) -> Option<&SymbolInfo> {
        self.infos.get(sym.0 as usize)
    }

    /// Symbol introduced by a declaration node.
    pub fn declared_symbol(&self, node: NodeId) -> Option<SymbolId> {
        self.decls.get(&node).copied()
    }

    pub fn symbol_name(&self, sym: SymbolId) -> &str {
        self.info(sym).map(|i| i.name.as_str()).unwrap_or("")
    }
}

impl SymbolTable for Bindings {
    fn symbol_at(&self, node: NodeId) -> Option<SymbolId> {
        self.resolutions
            .get(&node)
            .or_else(|| self.decls.get(&node))
            .copied()
    }

    fn kind(&self, sym: SymbolId) -> SymbolKind {
        self.info(sym).map(|i| i.kind).unwrap_or(SymbolKind::Local)
    }

    fn owner(&self, sym: SymbolId) -> Option<SymbolId> {
        self.info(sym).and_then(|i| i.owner)
    }

    fn is_static(&self, sym: SymbolId) -> bool {
        self.info(sym).is_some_and(|i| i.is_static)
    }

    fn is_const(&self, sym: SymbolId) -> bool {
        self.info(sym).is_some_and(|i| i.is_const)
    }

    fn super_classes(&self, class: SymbolId) -> Vec<SymbolId> {
        let mut out = Vec::new();
        let mut cur = self
            .info(class)
            .and_then(|i| i.class.as_ref())
            .and_then(|c| c.superclass);
        while let Some(sup) = cur {
            if out.contains(&sup) {
                break;
            }
            out.push(sup);
            cur = self
                .info(sup)
                .and_then(|i| i.class.as_ref())
                .and_then(|c| c.superclass);
        }
        out
    }

    fn nesting_kind(&self, class: SymbolId) -> NestingKind {
        self.info(class)
            .and_then(|i| i.class.as_ref())
            .map(|c| c.nesting)
            .unwrap_or(NestingKind::TopLevel)
    }

    fn has_outer_instance(&self, class: SymbolId) -> bool {
        self.info(class)
            .and_then(|i| i.class.as_ref())
            .is_some_and(|c| c.has_outer)
    }
}
