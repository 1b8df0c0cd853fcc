//! Symbol binding.
//!
//! Walks the lowered declarations of every file and builds the symbol
//! tables the checker and the model factories query: module locals and
//! exports, namespace scopes, class/interface members, static exports and
//! parameter symbols. Declarations with the same name in one scope merge
//! into one symbol.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use phf::phf_set;

use super::facts::{DeclRef, FileId, ImportedName, ModifierKind, NodeId, SourceFile, SyntaxKind};

/// Library types every program can reference without declaring them.
static BUILTIN_TYPES: phf::Set<&'static str> = phf_set! {
    "Array", "ReadonlyArray", "ArrayLike", "Promise", "PromiseLike",
    "Map", "ReadonlyMap", "WeakMap", "Set", "ReadonlySet", "WeakSet",
    "Record", "Partial", "Required", "Readonly", "Pick", "Omit",
    "Exclude", "Extract", "NonNullable", "ReturnType", "InstanceType", "Parameters",
    "Error", "Date", "RegExp", "Object", "Function", "String", "Number",
    "Boolean", "Symbol", "BigInt", "Iterable", "Iterator", "IterableIterator",
    "AsyncIterable", "Generator", "AsyncGenerator", "JSON", "Math",
};

/// Alias chains longer than this are treated as unresolvable.
const MAX_ALIAS_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    Class,
    Interface,
    Enum,
    EnumMember,
    Namespace,
    Function,
    Method,
    Constructor,
    Property,
    Accessor,
    Parameter,
    TypeParameter,
    TypeAlias,
    Variable,
    Signature,
    Alias,
    Builtin,
}

impl SymbolKind {
    fn from_syntax(kind: SyntaxKind) -> Option<Self> {
        Some(match kind {
            SyntaxKind::ClassDeclaration => SymbolKind::Class,
            SyntaxKind::InterfaceDeclaration => SymbolKind::Interface,
            SyntaxKind::ModuleDeclaration => SymbolKind::Namespace,
            SyntaxKind::EnumDeclaration => SymbolKind::Enum,
            SyntaxKind::EnumMember => SymbolKind::EnumMember,
            SyntaxKind::FunctionDeclaration => SymbolKind::Function,
            SyntaxKind::Constructor => SymbolKind::Constructor,
            SyntaxKind::MethodDeclaration | SyntaxKind::MethodSignature => SymbolKind::Method,
            SyntaxKind::PropertyDeclaration | SyntaxKind::PropertySignature => SymbolKind::Property,
            SyntaxKind::GetAccessor | SyntaxKind::SetAccessor => SymbolKind::Accessor,
            SyntaxKind::Parameter => SymbolKind::Parameter,
            SyntaxKind::TypeParameter => SymbolKind::TypeParameter,
            SyntaxKind::TypeAliasDeclaration => SymbolKind::TypeAlias,
            SyntaxKind::VariableDeclaration => SymbolKind::Variable,
            SyntaxKind::IndexSignature | SyntaxKind::CallSignature | SyntaxKind::ConstructSignature => {
                SymbolKind::Signature
            }
            SyntaxKind::ClassStaticBlock => return None,
        })
    }

    /// Which kind names a merged symbol.
    fn merge_rank(&self) -> u8 {
        match self {
            SymbolKind::Class => 5,
            SymbolKind::Enum => 4,
            SymbolKind::Function => 3,
            SymbolKind::Interface => 2,
            SymbolKind::Namespace => 1,
            _ => 0,
        }
    }
}

/// Where an alias symbol points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// An export of another module; `module` is `None` when resolution failed.
    Module {
        module: Option<FileId>,
        name: ImportedName,
    },
    /// A local of a file (`export { a as b }`, `export default a`).
    Local { file: FileId, name: String },
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub declarations: Vec<DeclRef>,
    pub parent: Option<SymbolId>,
    /// Set when any declaration is a namespace.
    pub is_namespace: bool,
    pub members: IndexMap<String, SymbolId>,
    pub exports: IndexMap<String, SymbolId>,
    pub locals: IndexMap<String, SymbolId>,
    pub alias: Option<AliasTarget>,
}

impl Symbol {
    fn new(name: &str, kind: SymbolKind, parent: Option<SymbolId>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            declarations: Vec::new(),
            parent,
            is_namespace: kind == SymbolKind::Namespace,
            members: IndexMap::new(),
            exports: IndexMap::new(),
            locals: IndexMap::new(),
            alias: None,
        }
    }
}

#[derive(Clone, Copy)]
enum Table {
    Members,
    Exports,
    Locals,
}

/// Symbol tables for a whole program.
#[derive(Debug, Default)]
pub struct Binder {
    symbols: Vec<Symbol>,
    declared: HashMap<DeclRef, SymbolId>,
    parameters: HashMap<DeclRef, SymbolId>,
    modules: HashMap<FileId, SymbolId>,
    star_exports: HashMap<FileId, Vec<FileId>>,
    globals: IndexMap<String, SymbolId>,
    builtins: IndexMap<String, SymbolId>,
}

impl Binder {
    pub fn new() -> Self {
        let mut binder = Self::default();
        let mut names: Vec<&str> = BUILTIN_TYPES.iter().copied().collect();
        names.sort_unstable();
        for name in names {
            let id = binder.push(Symbol::new(name, SymbolKind::Builtin, None));
            binder.builtins.insert(name.to_string(), id);
        }
        binder
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Symbol bound by a named declaration.
    pub fn declared_symbol(&self, decl: DeclRef) -> Option<SymbolId> {
        self.declared.get(&decl).copied()
    }

    /// Parameter symbol for a parameter declaration.
    pub fn parameter_symbol(&self, decl: DeclRef) -> Option<SymbolId> {
        self.parameters.get(&decl).copied()
    }

    pub fn module_symbol(&self, file: FileId) -> Option<SymbolId> {
        self.modules.get(&file).copied()
    }

    pub fn builtin(&self, name: &str) -> Option<SymbolId> {
        self.builtins.get(name).copied()
    }

    /// Bind one file. `resolved` maps the file's module specifiers to files.
    pub fn bind_file(
        &mut self,
        file_id: FileId,
        file: &SourceFile,
        resolved: &HashMap<String, Option<FileId>>,
    ) {
        let module = self.push(Symbol::new(&file.path, SymbolKind::Module, None));
        self.modules.insert(file_id, module);

        for stmt in &file.statements {
            self.bind_statement(file_id, file, *stmt, module, file.is_module);
        }

        let lookup = |specifier: &str| resolved.get(specifier).copied().flatten();

        for import in &file.imports {
            let alias = self.alias_symbol(
                &import.local,
                module,
                AliasTarget::Module {
                    module: lookup(&import.specifier),
                    name: import.imported.clone(),
                },
            );
            self.symbol_mut(module).locals.entry(import.local.clone()).or_insert(alias);
        }

        for export in &file.exports {
            let target = match &export.specifier {
                Some(specifier) => AliasTarget::Module {
                    module: lookup(specifier),
                    name: export.local.clone(),
                },
                None => match &export.local {
                    ImportedName::Named(name) => AliasTarget::Local {
                        file: file_id,
                        name: name.clone(),
                    },
                    _ => continue,
                },
            };
            let alias = self.alias_symbol(&export.exported, module, target);
            self.symbol_mut(module).exports.insert(export.exported.clone(), alias);
        }

        let stars: Vec<FileId> = file.export_stars.iter().filter_map(|s| lookup(s)).collect();
        if !stars.is_empty() {
            self.star_exports.insert(file_id, stars);
        }
    }

    fn alias_symbol(&mut self, name: &str, parent: SymbolId, target: AliasTarget) -> SymbolId {
        let mut symbol = Symbol::new(name, SymbolKind::Alias, Some(parent));
        symbol.alias = Some(target);
        self.push(symbol)
    }

    fn bind_statement(
        &mut self,
        file_id: FileId,
        file: &SourceFile,
        node: NodeId,
        container: SymbolId,
        is_module: bool,
    ) {
        let decl = file.decl(node);
        let Some(name) = decl.name.as_deref() else {
            return;
        };
        let Some(kind) = SymbolKind::from_syntax(decl.kind) else {
            return;
        };
        let decl_ref = DeclRef::new(file_id, node);
        let exported = decl.has_modifier(ModifierKind::Export);
        let is_default = decl.has_modifier(ModifierKind::Default);

        let symbol = self.declare(container, Table::Locals, name, kind, decl_ref);
        if exported {
            let export_name = if is_default { "default" } else { name };
            self.symbol_mut(container)
                .exports
                .insert(export_name.to_string(), symbol);
        }
        if !is_module && self.symbol(container).kind == SymbolKind::Module {
            self.globals.entry(name.to_string()).or_insert(symbol);
        }

        self.bind_type_parameters(file_id, file, &decl.type_parameters, Some(symbol));
        match decl.kind {
            SyntaxKind::ClassDeclaration | SyntaxKind::InterfaceDeclaration => {
                for member in &decl.members {
                    self.bind_member(file_id, file, *member, symbol);
                }
            }
            SyntaxKind::EnumDeclaration => {
                for member in &decl.members {
                    let member_decl = file.decl(*member);
                    if let Some(member_name) = member_decl.name.as_deref() {
                        self.declare(
                            symbol,
                            Table::Exports,
                            member_name,
                            SymbolKind::EnumMember,
                            DeclRef::new(file_id, *member),
                        );
                    }
                }
            }
            SyntaxKind::ModuleDeclaration => {
                for child in &decl.members {
                    self.bind_statement(file_id, file, *child, symbol, true);
                }
            }
            SyntaxKind::FunctionDeclaration => self.bind_function_scope(file_id, file, node),
            _ => {}
        }
    }

    fn bind_member(&mut self, file_id: FileId, file: &SourceFile, node: NodeId, owner: SymbolId) {
        let decl = file.decl(node);
        let Some(kind) = SymbolKind::from_syntax(decl.kind) else {
            return;
        };
        let decl_ref = DeclRef::new(file_id, node);
        let name = match decl.kind {
            SyntaxKind::Constructor => "__constructor".to_string(),
            SyntaxKind::CallSignature => "__call".to_string(),
            SyntaxKind::ConstructSignature => "__new".to_string(),
            SyntaxKind::IndexSignature => "__index".to_string(),
            _ => match &decl.name {
                Some(name) => name.clone(),
                None => return,
            },
        };
        let table = if decl.has_modifier(ModifierKind::Static) {
            Table::Exports
        } else {
            Table::Members
        };
        self.declare(owner, table, &name, kind, decl_ref);

        self.bind_type_parameters(file_id, file, &decl.type_parameters, None);
        self.bind_function_scope(file_id, file, node);

        if decl.kind == SyntaxKind::Constructor {
            for param in &decl.parameters {
                let param_decl = file.decl(*param);
                let is_property = param_decl.modifiers.iter().any(|m| {
                    matches!(
                        m,
                        ModifierKind::Public
                            | ModifierKind::Private
                            | ModifierKind::Protected
                            | ModifierKind::Readonly
                            | ModifierKind::Override
                    )
                });
                if let (true, Some(param_name)) = (is_property, param_decl.name.as_deref()) {
                    self.declare(
                        owner,
                        Table::Members,
                        param_name,
                        SymbolKind::Property,
                        DeclRef::new(file_id, *param),
                    );
                }
            }
        }
    }

    fn bind_type_parameters(
        &mut self,
        file_id: FileId,
        file: &SourceFile,
        params: &[NodeId],
        owner: Option<SymbolId>,
    ) {
        for param in params {
            let Some(name) = file.decl(*param).name.as_deref() else {
                continue;
            };
            let decl_ref = DeclRef::new(file_id, *param);
            // Class and interface type parameters are listed among the members.
            let is_member_owner = owner.map_or(false, |o| {
                matches!(self.symbol(o).kind, SymbolKind::Class | SymbolKind::Interface)
            });
            match owner {
                Some(owner) if is_member_owner => {
                    self.declare(owner, Table::Members, name, SymbolKind::TypeParameter, decl_ref);
                }
                _ => {
                    let mut symbol = Symbol::new(name, SymbolKind::TypeParameter, owner);
                    symbol.declarations.push(decl_ref);
                    let id = self.push(symbol);
                    self.declared.insert(decl_ref, id);
                }
            }
        }
    }

    /// Parameters and body locals of a function-like declaration.
    fn bind_function_scope(&mut self, file_id: FileId, file: &SourceFile, node: NodeId) {
        let decl = file.decl(node);
        self.bind_parameters(file_id, file, &decl.parameters);
        let Some(body) = &decl.body else {
            return;
        };
        for local in &body.locals {
            let Some(name) = file.decl(*local).name.as_deref() else {
                continue;
            };
            let decl_ref = DeclRef::new(file_id, *local);
            let mut symbol = Symbol::new(name, SymbolKind::Variable, None);
            symbol.declarations.push(decl_ref);
            let id = self.push(symbol);
            self.declared.insert(decl_ref, id);
        }
    }

    fn bind_parameters(&mut self, file_id: FileId, file: &SourceFile, params: &[NodeId]) {
        for param in params {
            let Some(name) = file.decl(*param).name.as_deref() else {
                continue;
            };
            let decl_ref = DeclRef::new(file_id, *param);
            let mut symbol = Symbol::new(name, SymbolKind::Parameter, None);
            symbol.declarations.push(decl_ref);
            let id = self.push(symbol);
            self.parameters.insert(decl_ref, id);
        }
    }

    /// Add a declaration to a symbol table, merging with a same-named entry.
    fn declare(
        &mut self,
        container: SymbolId,
        table: Table,
        name: &str,
        kind: SymbolKind,
        decl: DeclRef,
    ) -> SymbolId {
        let existing = {
            let owner = self.symbol(container);
            match table {
                Table::Members => owner.members.get(name),
                Table::Exports => owner.exports.get(name),
                Table::Locals => owner.locals.get(name),
            }
            .copied()
        };

        let id = match existing {
            Some(id) if self.symbol(id).kind != SymbolKind::Alias => {
                let symbol = self.symbol_mut(id);
                if kind.merge_rank() > symbol.kind.merge_rank() {
                    symbol.kind = kind;
                }
                symbol.is_namespace |= kind == SymbolKind::Namespace;
                id
            }
            _ => {
                let id = self.push(Symbol::new(name, kind, Some(container)));
                let owner = self.symbol_mut(container);
                let map = match table {
                    Table::Members => &mut owner.members,
                    Table::Exports => &mut owner.exports,
                    Table::Locals => &mut owner.locals,
                };
                map.insert(name.to_string(), id);
                id
            }
        };
        self.symbol_mut(id).declarations.push(decl);
        self.declared.insert(decl, id);
        id
    }

    /// Look a name up from a declaration outwards: type parameters of the
    /// enclosing declarations, namespace scopes, the file, then globals.
    pub fn resolve_name(&self, files: &[SourceFile], at: DeclRef, name: &str) -> Option<SymbolId> {
        let file = files.get(at.file.0 as usize)?;
        let mut current = Some(at.node);
        while let Some(node) = current {
            let decl = file.decl(node);
            for param in &decl.type_parameters {
                if file.decl(*param).name.as_deref() == Some(name) {
                    if let Some(symbol) = self.declared_symbol(at.sibling(*param)) {
                        return Some(symbol);
                    }
                }
            }
            if decl.kind == SyntaxKind::ModuleDeclaration {
                if let Some(ns) = self.declared_symbol(at.sibling(node)) {
                    let scope = self.symbol(ns);
                    if let Some(found) = scope.locals.get(name).or_else(|| scope.exports.get(name)) {
                        return Some(*found);
                    }
                }
            }
            current = decl.parent;
        }

        if let Some(module) = self.module_symbol(at.file) {
            if let Some(found) = self.symbol(module).locals.get(name) {
                return Some(*found);
            }
        }
        self.globals
            .get(name)
            .or_else(|| self.builtins.get(name))
            .copied()
    }

    /// Look a value name up from a declaration outwards: parameters and body
    /// locals of the enclosing functions shadow the scopes of `resolve_name`.
    pub fn resolve_value_name(&self, files: &[SourceFile], at: DeclRef, name: &str) -> Option<SymbolId> {
        let file = files.get(at.file.0 as usize)?;
        let named = |node: &NodeId| file.decl(*node).name.as_deref() == Some(name);
        let mut current = Some(at.node);
        while let Some(node) = current {
            let decl = file.decl(node);
            let local = decl
                .body
                .iter()
                .flat_map(|body| body.locals.iter())
                .find(|local| named(*local))
                .and_then(|local| self.declared_symbol(at.sibling(*local)));
            let found = local.or_else(|| {
                decl.parameters
                    .iter()
                    .find(|param| named(*param))
                    .and_then(|param| self.parameter_symbol(at.sibling(*param)))
            });
            if found.is_some() {
                return found;
            }
            current = decl.parent;
        }
        self.resolve_name(files, at, name)
    }

    /// Resolve `A.B.C` from a declaration.
    pub fn resolve_entity_name(
        &self,
        files: &[SourceFile],
        at: DeclRef,
        name: &str,
    ) -> Option<SymbolId> {
        let mut segments = name.split('.').map(str::trim);
        let first = segments.next()?;
        let mut symbol = self.resolve_name(files, at, first)?;
        for segment in segments {
            let container = self.resolve_alias(symbol).unwrap_or(symbol);
            symbol = self.export_of(container, segment)?;
        }
        Some(symbol)
    }

    /// An exported member of a module, namespace or enum.
    pub fn export_of(&self, container: SymbolId, name: &str) -> Option<SymbolId> {
        let symbol = self.symbol(container);
        if symbol.kind == SymbolKind::Module {
            let file = self.modules.iter().find(|(_, id)| **id == container).map(|(f, _)| *f)?;
            return self.module_export(file, name, &mut HashSet::new());
        }
        symbol.exports.get(name).copied()
    }

    fn module_export(&self, file: FileId, name: &str, visited: &mut HashSet<FileId>) -> Option<SymbolId> {
        if !visited.insert(file) {
            return None;
        }
        let module = self.module_symbol(file)?;
        if let Some(found) = self.symbol(module).exports.get(name) {
            return Some(*found);
        }
        if name == "default" {
            return None;
        }
        self.star_exports
            .get(&file)?
            .iter()
            .find_map(|star| self.module_export(*star, name, visited))
    }

    /// Follow alias symbols to the declared symbol.
    pub fn resolve_alias(&self, symbol: SymbolId) -> Option<SymbolId> {
        let mut current = symbol;
        for _ in 0..MAX_ALIAS_DEPTH {
            let Some(target) = &self.symbol(current).alias else {
                return Some(current);
            };
            current = match target {
                AliasTarget::Module { module, name } => {
                    let module = (*module)?;
                    match name {
                        ImportedName::Namespace => self.module_symbol(module)?,
                        ImportedName::Default => self.module_export(module, "default", &mut HashSet::new())?,
                        ImportedName::Named(name) => self.module_export(module, name, &mut HashSet::new())?,
                    }
                }
                AliasTarget::Local { file, name } => {
                    let module = self.module_symbol(*file)?;
                    *self.symbol(module).locals.get(name)?
                }
            };
        }
        None
    }
}
