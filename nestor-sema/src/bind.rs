#![forbid(unsafe_code)]

use std::collections::HashMap;

use nestor_ast::{
    Block, ClassDecl, Expr, ExprKind, Member, Program, Stmt, TypeRef,
};

use crate::symbols::{Bindings, ClassInfo, NestingKind, SymbolId, SymbolInfo, SymbolKind};

/// Build the symbol table for a parsed program.
///
/// Binding never fails: names that do not resolve are simply absent from the
/// table, and the analysis treats absent symbols conservatively.
pub fn bind(program: &Program) -> Bindings {
    let mut binder = Binder::new();

    for class in &program.classes {
        binder.declare_class(class, None, NestingKind::TopLevel, false);
    }
    for class in &program.classes {
        let sym = binder.out.decls[&class.id];
        binder.resolve_supertypes(class, sym);
    }
    for class in &program.classes {
        let sym = binder.out.decls[&class.id];
        binder.resolve_members(&class.members, sym);
    }

    binder.out
}

#[derive(Default)]
struct MemberMaps {
    fields: HashMap<String, SymbolId>,
    methods: HashMap<String, SymbolId>,
    types: HashMap<String, SymbolId>,
}

struct Binder {
    out: Bindings,
    members: HashMap<SymbolId, MemberMaps>,
    top_level: HashMap<String, SymbolId>,

    // Resolution context.
    class_stack: Vec<SymbolId>,
    local_values: Vec<HashMap<String, SymbolId>>,
    local_types: Vec<HashMap<String, SymbolId>>,
    static_ctx: bool,
}

impl Binder {
    fn new() -> Self {
        Self {
            out: Bindings::default(),
            members: HashMap::new(),
            top_level: HashMap::new(),
            class_stack: Vec::new(),
            local_values: Vec::new(),
            local_types: Vec::new(),
            static_ctx: false,
        }
    }

    fn alloc(&mut self, info: SymbolInfo) -> SymbolId {
        let sym = SymbolId(self.out.infos.len() as u32);
        self.out.infos.push(info);
        sym
    }

    // -- Declaration ------------------------------------------------------

    /// Declare a class and its member tree (bodies are not entered; local and
    /// anonymous classes inside bodies are declared during resolution, when
    /// their lexical scope is live).
    fn declare_class(
        &mut self,
        decl: &ClassDecl,
        owner: Option<SymbolId>,
        nesting: NestingKind,
        has_outer: bool,
    ) -> SymbolId {
        let sym = self.alloc(SymbolInfo {
            name: decl.name.node.clone(),
            kind: SymbolKind::Class,
            owner,
            is_static: decl.is_static,
            is_const: false,
            class: Some(ClassInfo {
                nesting,
                superclass: None,
                has_outer,
            }),
        });
        self.out.decls.insert(decl.id, sym);
        self.members.insert(sym, MemberMaps::default());
        if owner.is_none() {
            self.top_level.insert(decl.name.node.clone(), sym);
        }
        self.declare_members(&decl.members, sym);
        sym
    }

    fn declare_members(&mut self, members: &[Member], class: SymbolId) {
        for member in members {
            match member {
                Member::Field(field) => {
                    let is_const = field.is_static
                        && field.is_final
                        && field.init.as_ref().is_some_and(is_literal);
                    let sym = self.alloc(SymbolInfo {
                        name: field.name.node.clone(),
                        kind: SymbolKind::Field,
                        owner: Some(class),
                        is_static: field.is_static,
                        is_const,
                        class: None,
                    });
                    self.out.decls.insert(field.id, sym);
                    self.maps_mut(class).fields.insert(field.name.node.clone(), sym);
                }
                Member::Method(method) => {
                    let sym = self.alloc(SymbolInfo {
                        name: method.name.node.clone(),
                        kind: SymbolKind::Method,
                        owner: Some(class),
                        is_static: method.is_static,
                        is_const: false,
                        class: None,
                    });
                    self.out.decls.insert(method.id, sym);
                    self.maps_mut(class).methods.insert(method.name.node.clone(), sym);
                }
                Member::Ctor(_) => {}
                Member::Class(nested) => {
                    let child = self.declare_class(
                        nested,
                        Some(class),
                        NestingKind::Member,
                        !nested.is_static,
                    );
                    self.maps_mut(class).types.insert(nested.name.node.clone(), child);
                }
            }
        }
    }

    fn maps_mut(&mut self, class: SymbolId) -> &mut MemberMaps {
        self.members.entry(class).or_default()
    }

    // -- Supertype resolution ----------------------------------------------

    /// Resolve `extends` clauses for a declared class tree. Lookup is lexical
    /// (enclosing classes' member types, then top-level names); only directly
    /// declared member types participate, which is enough before inheritance
    /// links exist.
    fn resolve_supertypes(&mut self, decl: &ClassDecl, sym: SymbolId) {
        if let Some(sup_ref) = &decl.extends {
            let chain = self.owner_chain(sym);
            if let Some(sup) = self.lookup_type_declared(&chain, sup_ref) {
                self.record_supertype(sym, sup_ref, sup);
            }
        }
        for member in &decl.members {
            if let Member::Class(nested) = member {
                let nested_sym = self.out.decls[&nested.id];
                self.resolve_supertypes(nested, nested_sym);
            }
        }
    }

    fn record_supertype(&mut self, class: SymbolId, sup_ref: &TypeRef, sup: SymbolId) {
        if let Some(named) = sup_ref.named() {
            self.out.resolutions.insert(named.id, sup);
        }
        if let Some(info) = self.out.infos.get_mut(class.0 as usize)
            && let Some(ci) = info.class.as_mut()
        {
            ci.superclass = Some(sup);
        }
    }

    /// The class itself plus its lexical owners, innermost first.
    fn owner_chain(&self, class: SymbolId) -> Vec<SymbolId> {
        let mut chain = vec![class];
        let mut cur = self.out.infos[class.0 as usize].owner;
        while let Some(sym) = cur {
            if chain.contains(&sym) {
                break;
            }
            chain.push(sym);
            cur = self.out.infos[sym.0 as usize].owner;
        }
        chain
    }

    fn lookup_type_declared(&self, scope: &[SymbolId], ty: &TypeRef) -> Option<SymbolId> {
        let named = ty.named()?;
        for &class in scope {
            if let Some(maps) = self.members.get(&class)
                && let Some(&sym) = maps.types.get(&named.name)
            {
                return Some(sym);
            }
        }
        self.top_level.get(&named.name).copied()
    }

    // -- Body resolution ----------------------------------------------------

    fn resolve_members(&mut self, members: &[Member], class: SymbolId) {
        self.class_stack.push(class);
        for member in members {
            match member {
                Member::Field(field) => {
                    if let Some(init) = &field.init {
                        let was_static = self.static_ctx;
                        self.static_ctx = field.is_static;
                        self.resolve_expr(init);
                        self.static_ctx = was_static;
                    }
                }
                Member::Method(method) => {
                    let was_static = self.static_ctx;
                    self.static_ctx = method.is_static;
                    self.local_values.push(HashMap::new());
                    for param in &method.params {
                        self.declare_local(&param.name.node);
                    }
                    self.resolve_block_stmts(&method.body);
                    self.local_values.pop();
                    self.static_ctx = was_static;
                }
                Member::Ctor(ctor) => {
                    let was_static = self.static_ctx;
                    self.static_ctx = false;
                    self.local_values.push(HashMap::new());
                    for param in &ctor.params {
                        self.declare_local(&param.name.node);
                    }
                    self.resolve_block_stmts(&ctor.body);
                    self.local_values.pop();
                    self.static_ctx = was_static;
                }
                Member::Class(nested) => {
                    let nested_sym = self.out.decls[&nested.id];
                    let was_static = self.static_ctx;
                    self.static_ctx = false;
                    self.resolve_members(&nested.members, nested_sym);
                    self.static_ctx = was_static;
                }
            }
        }
        self.class_stack.pop();
    }

    fn declare_local(&mut self, name: &str) -> SymbolId {
        let sym = self.alloc(SymbolInfo {
            name: name.to_string(),
            kind: SymbolKind::Local,
            owner: None,
            is_static: false,
            is_const: false,
            class: None,
        });
        if let Some(scope) = self.local_values.last_mut() {
            scope.insert(name.to_string(), sym);
        }
        sym
    }

    fn resolve_block(&mut self, block: &Block) {
        self.local_values.push(HashMap::new());
        self.local_types.push(HashMap::new());
        self.resolve_block_stmts_inner(block);
        self.local_types.pop();
        self.local_values.pop();
    }

    fn resolve_block_stmts(&mut self, block: &Block) {
        // Method/constructor bodies share the scope holding the parameters.
        self.local_types.push(HashMap::new());
        self.resolve_block_stmts_inner(block);
        self.local_types.pop();
    }

    fn resolve_block_stmts_inner(&mut self, block: &Block) {
        for stmt in &block.stmts {
            match stmt {
                Stmt::Local(local) => {
                    if let Some(init) = &local.init {
                        self.resolve_expr(init);
                    }
                    self.declare_local(&local.name.node);
                }
                Stmt::LocalClass(decl) => {
                    let owner = self.class_stack.last().copied();
                    let sym = self.declare_class(
                        decl,
                        owner,
                        NestingKind::Local,
                        !self.static_ctx,
                    );
                    if let Some(scope) = self.local_types.last_mut() {
                        scope.insert(decl.name.node.clone(), sym);
                    }
                    if let Some(sup_ref) = &decl.extends
                        && let Some(sup) = self.lookup_type(sup_ref)
                    {
                        self.record_supertype(sym, sup_ref, sup);
                    }
                    self.resolve_members(&decl.members, sym);
                }
                Stmt::Expr(expr) => self.resolve_expr(expr),
                Stmt::Return(ret) => {
                    if let Some(value) = &ret.value {
                        self.resolve_expr(value);
                    }
                }
                Stmt::If(if_stmt) => {
                    self.resolve_expr(&if_stmt.cond);
                    self.resolve_block(&if_stmt.then_branch);
                    if let Some(else_branch) = &if_stmt.else_branch {
                        self.resolve_block(else_branch);
                    }
                }
                Stmt::While(while_stmt) => {
                    self.resolve_expr(&while_stmt.cond);
                    self.resolve_block(&while_stmt.body);
                }
                Stmt::Block(inner) => self.resolve_block(inner),
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::This => {}
            ExprKind::Name(name) => {
                let resolved = self
                    .lookup_value(&name.name.node)
                    .or_else(|| self.lookup_type_name(&name.name.node));
                if let Some(sym) = resolved {
                    self.out.resolutions.insert(name.id, sym);
                }
            }
            ExprKind::QualifiedThis(q) => {
                if let Some(sym) = self.lookup_type_name(&q.outer.node) {
                    self.out.resolutions.insert(q.id, sym);
                }
            }
            ExprKind::Field(field) => self.resolve_expr(&field.recv),
            ExprKind::Call(call) => {
                match &call.recv {
                    Some(recv) => self.resolve_expr(recv),
                    None => {
                        if let Some(sym) = self.lookup_method(&call.name.node) {
                            self.out.resolutions.insert(call.id, sym);
                        }
                    }
                }
                for arg in &call.args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::New(new_expr) => {
                for arg in &new_expr.args {
                    self.resolve_expr(arg);
                }
                let base = self.lookup_type(&new_expr.class);
                if let Some(base_sym) = base
                    && let Some(named) = new_expr.class.named()
                {
                    self.out.resolutions.insert(named.id, base_sym);
                }
                if let Some(body) = &new_expr.body {
                    let owner = self.class_stack.last().copied();
                    let anon = self.alloc(SymbolInfo {
                        name: "<anonymous>".to_string(),
                        kind: SymbolKind::Class,
                        owner,
                        is_static: false,
                        is_const: false,
                        class: Some(ClassInfo {
                            nesting: NestingKind::Anonymous,
                            superclass: base,
                            has_outer: !self.static_ctx,
                        }),
                    });
                    self.out.decls.insert(new_expr.id, anon);
                    self.members.insert(anon, MemberMaps::default());
                    self.declare_members(body, anon);
                    let was_static = self.static_ctx;
                    self.static_ctx = false;
                    self.resolve_members(body, anon);
                    self.static_ctx = was_static;
                }
            }
            ExprKind::SuperCall(super_call) => {
                for arg in &super_call.args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Assign(assign) => {
                self.resolve_expr(&assign.lhs);
                self.resolve_expr(&assign.rhs);
            }
            ExprKind::Binary(binary) => {
                self.resolve_expr(&binary.lhs);
                self.resolve_expr(&binary.rhs);
            }
            ExprKind::Unary(unary) => self.resolve_expr(&unary.expr),
        }
    }

    // -- Lookup -------------------------------------------------------------

    fn lookup_value(&self, name: &str) -> Option<SymbolId> {
        for scope in self.local_values.iter().rev() {
            if let Some(&sym) = scope.get(name) {
                return Some(sym);
            }
        }
        for &class in self.class_stack.iter().rev() {
            if let Some(sym) = self.lookup_in_class(class, name, |m| &m.fields) {
                return Some(sym);
            }
        }
        None
    }

    fn lookup_method(&self, name: &str) -> Option<SymbolId> {
        for &class in self.class_stack.iter().rev() {
            if let Some(sym) = self.lookup_in_class(class, name, |m| &m.methods) {
                return Some(sym);
            }
        }
        None
    }

    fn lookup_type(&self, ty: &TypeRef) -> Option<SymbolId> {
        self.lookup_type_name(&ty.named()?.name)
    }

    fn lookup_type_name(&self, name: &str) -> Option<SymbolId> {
        for scope in self.local_types.iter().rev() {
            if let Some(&sym) = scope.get(name) {
                return Some(sym);
            }
        }
        for &class in self.class_stack.iter().rev() {
            if self.out.infos[class.0 as usize].name == name {
                return Some(class);
            }
            if let Some(sym) = self.lookup_in_class(class, name, |m| &m.types) {
                return Some(sym);
            }
        }
        self.top_level.get(name).copied()
    }

    /// Member lookup in a class and its superclass closure.
    fn lookup_in_class(
        &self,
        class: SymbolId,
        name: &str,
        ns: impl Fn(&MemberMaps) -> &HashMap<String, SymbolId>,
    ) -> Option<SymbolId> {
        let mut cur = Some(class);
        let mut seen = Vec::new();
        while let Some(sym) = cur {
            if seen.contains(&sym) {
                break;
            }
            seen.push(sym);
            if let Some(maps) = self.members.get(&sym)
                && let Some(&found) = ns(maps).get(name)
            {
                return Some(found);
            }
            cur = self.out.infos[sym.0 as usize]
                .class
                .as_ref()
                .and_then(|c| c.superclass);
        }
        None
    }
}

fn is_literal(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Bool(_)
    )
}
