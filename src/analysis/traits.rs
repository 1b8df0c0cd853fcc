//! Core traits for language analysis and type queries.

use std::path::Path;

use super::binder::{Symbol, SymbolId};
use super::facts::{Decl, DeclRef, FileId, SourceFile};
use super::types::{Signature, Type};

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// This is kept separate from [`SourceFile`] so the tree can be dropped as
/// soon as lowering has run.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Language-specific analyzer trait.
///
/// # Thread Safety
///
/// Note: tree_sitter::Parser is not Sync, so implementations should
/// create parsers as needed.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "typescript", "tsx").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Partial parse errors are still returned as a valid tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Lower a parsed tree into declaration facts.
    fn lower(&self, parsed: &ParsedFile) -> anyhow::Result<SourceFile>;

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}

/// Read-only semantic queries over a bound program.
///
/// The model factories only talk to the program through this trait, so a
/// single analysis run is passed around explicitly instead of living in
/// global state.
pub trait TypeQuery {
    /// Origin file name of a loaded file.
    fn file_name(&self, file: FileId) -> &str;

    /// Top-level statements of a file, in source order.
    fn statements(&self, file: FileId) -> Vec<DeclRef>;

    fn declaration(&self, decl: DeclRef) -> &Decl;

    /// Members of a class/interface/enum or body statements of a namespace.
    fn child_declarations(&self, decl: DeclRef) -> Vec<DeclRef>;

    fn symbol(&self, symbol: SymbolId) -> &Symbol;

    /// The symbol a named declaration binds.
    fn symbol_at_declaration(&self, decl: DeclRef) -> Option<SymbolId>;

    /// Resolve a dotted entity name as seen from a declaration.
    fn resolve_entity_name(&self, at: DeclRef, name: &str) -> Option<SymbolId>;

    /// Follow an import/export alias chain to the declared symbol.
    fn aliased_symbol(&self, symbol: SymbolId) -> Option<SymbolId>;

    /// Instance members, including type parameters and the constructor.
    fn members(&self, symbol: SymbolId) -> Vec<SymbolId>;

    /// Static members of a class, members of an enum, exports of a namespace.
    fn exports(&self, symbol: SymbolId) -> Vec<SymbolId>;

    /// Name qualified by the enclosing namespaces.
    fn fully_qualified_name(&self, symbol: SymbolId) -> String;

    /// Declared or inferred type of a symbol as seen from `at`.
    fn type_of_symbol_at_location(&self, symbol: SymbolId, at: DeclRef) -> Type;

    /// The type written on a declaration: annotation, constraint or alias target.
    fn declared_type(&self, decl: DeclRef) -> Option<Type>;

    /// Call signature of a function-like declaration.
    fn signature(&self, decl: DeclRef) -> Signature;

    /// Render a type the way the compiler prints it, relative to `enclosing`.
    fn type_to_string(&self, ty: &Type, enclosing: DeclRef) -> String;

    /// The named symbol behind a type, if any.
    fn type_symbol(&self, ty: &Type) -> Option<SymbolId>;

    /// Type arguments of a reference or array type.
    fn type_arguments(&self, ty: &Type) -> Vec<Type>;
}
