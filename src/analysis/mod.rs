//! AST-backed TypeScript analysis.
//!
//! Sources are parsed with tree-sitter and lowered into declaration facts,
//! bound into symbol tables and queried through the [`TypeQuery`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source Files    │────▶│ Analyzers    │────▶│ SourceFile    │
//! └─────────────────┘     │ (ts, tsx)    │     │ (Decl arena,  │
//!                         └──────────────┘     │  imports)     │
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌───────────────┐
//!                         │ Checker      │◀────│ Binder        │
//!                         │ (TypeQuery)  │     │ (Symbols)     │
//!                         └──────────────┘     └───────────────┘
//! ```

mod binder;
mod checker;
mod context;
mod facts;
mod languages;
mod resolve;
mod traits;
mod types;

pub use binder::{AliasTarget, Binder, Symbol, SymbolId, SymbolKind};
pub use checker::Checker;
pub use context::AnalysisContext;
pub use facts::{
    Body, Decl, DeclRef, ExportSpecifier, Expr, FileId, HeritageClause, HeritageKind,
    HeritageType, ImportBinding, ImportedName, ModifierKind, NodeId, SourceFile, Span, SyntaxKind,
    TypeNode,
};
pub use languages::{get_analyzer, registered_extensions, TypeScriptAnalyzer};
pub use resolve::{normalize_path, DiskHost, MemoryHost, ModuleResolver, SourceHost};
pub use traits::{LanguageAnalyzer, ParsedFile, TypeQuery};
pub use types::{Intrinsic, Signature, Type};
