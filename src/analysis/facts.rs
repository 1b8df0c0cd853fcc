//! Syntax facts lowered from tree-sitter parse trees.
//!
//! Every source file is lowered once into an owned arena of [`Decl`] nodes so
//! the binder and checker can hold plain indices instead of borrowing the
//! tree-sitter tree.

use std::fmt;

/// Index of a loaded source file inside an analysis context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Index of a declaration inside its file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A declaration anywhere in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclRef {
    pub file: FileId,
    pub node: NodeId,
}

impl DeclRef {
    pub fn new(file: FileId, node: NodeId) -> Self {
        Self { file, node }
    }

    /// Another declaration in the same file.
    pub fn sibling(&self, node: NodeId) -> Self {
        Self {
            file: self.file,
            node,
        }
    }
}

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Closed set of declaration kinds the lowering pass produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    ClassDeclaration,
    InterfaceDeclaration,
    ModuleDeclaration,
    EnumDeclaration,
    EnumMember,
    FunctionDeclaration,
    Constructor,
    MethodDeclaration,
    MethodSignature,
    PropertyDeclaration,
    PropertySignature,
    GetAccessor,
    SetAccessor,
    Parameter,
    TypeParameter,
    IndexSignature,
    CallSignature,
    ConstructSignature,
    ClassStaticBlock,
    TypeAliasDeclaration,
    VariableDeclaration,
}

impl SyntaxKind {
    pub const ALL: [SyntaxKind; 21] = [
        SyntaxKind::ClassDeclaration,
        SyntaxKind::InterfaceDeclaration,
        SyntaxKind::ModuleDeclaration,
        SyntaxKind::EnumDeclaration,
        SyntaxKind::EnumMember,
        SyntaxKind::FunctionDeclaration,
        SyntaxKind::Constructor,
        SyntaxKind::MethodDeclaration,
        SyntaxKind::MethodSignature,
        SyntaxKind::PropertyDeclaration,
        SyntaxKind::PropertySignature,
        SyntaxKind::GetAccessor,
        SyntaxKind::SetAccessor,
        SyntaxKind::Parameter,
        SyntaxKind::TypeParameter,
        SyntaxKind::IndexSignature,
        SyntaxKind::CallSignature,
        SyntaxKind::ConstructSignature,
        SyntaxKind::ClassStaticBlock,
        SyntaxKind::TypeAliasDeclaration,
        SyntaxKind::VariableDeclaration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyntaxKind::ClassDeclaration => "class",
            SyntaxKind::InterfaceDeclaration => "interface",
            SyntaxKind::ModuleDeclaration => "namespace",
            SyntaxKind::EnumDeclaration => "enum",
            SyntaxKind::EnumMember => "enum member",
            SyntaxKind::FunctionDeclaration => "function",
            SyntaxKind::Constructor => "constructor",
            SyntaxKind::MethodDeclaration => "method",
            SyntaxKind::MethodSignature => "method signature",
            SyntaxKind::PropertyDeclaration => "property",
            SyntaxKind::PropertySignature => "property signature",
            SyntaxKind::GetAccessor => "get accessor",
            SyntaxKind::SetAccessor => "set accessor",
            SyntaxKind::Parameter => "parameter",
            SyntaxKind::TypeParameter => "type parameter",
            SyntaxKind::IndexSignature => "index signature",
            SyntaxKind::CallSignature => "call signature",
            SyntaxKind::ConstructSignature => "construct signature",
            SyntaxKind::ClassStaticBlock => "static block",
            SyntaxKind::TypeAliasDeclaration => "type alias",
            SyntaxKind::VariableDeclaration => "variable",
        }
    }

    /// Declarations that carry a call signature.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            SyntaxKind::FunctionDeclaration
                | SyntaxKind::Constructor
                | SyntaxKind::MethodDeclaration
                | SyntaxKind::MethodSignature
                | SyntaxKind::GetAccessor
                | SyntaxKind::SetAccessor
                | SyntaxKind::CallSignature
                | SyntaxKind::ConstructSignature
        )
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keyword modifiers attached to a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Export,
    Default,
    Declare,
    Abstract,
    Static,
    Readonly,
    Public,
    Private,
    Protected,
    Async,
    Override,
    Const,
    Accessor,
}

impl ModifierKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "export" => Some(ModifierKind::Export),
            "default" => Some(ModifierKind::Default),
            "declare" => Some(ModifierKind::Declare),
            "abstract" => Some(ModifierKind::Abstract),
            "static" => Some(ModifierKind::Static),
            "readonly" => Some(ModifierKind::Readonly),
            "public" => Some(ModifierKind::Public),
            "private" => Some(ModifierKind::Private),
            "protected" => Some(ModifierKind::Protected),
            "async" => Some(ModifierKind::Async),
            "override" => Some(ModifierKind::Override),
            "const" => Some(ModifierKind::Const),
            "accessor" => Some(ModifierKind::Accessor),
            _ => None,
        }
    }
}

/// A type annotation as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    /// `string`, `number`, `any`, `void`, `null`, `undefined`, ...
    Keyword(String),
    /// A literal type, already in display form (`"a"`, `5`, `true`).
    Literal(String),
    /// `Foo`, `NS.Foo`, `Map<K, V>`.
    Reference { name: String, args: Vec<TypeNode> },
    /// `T[]`, `Array<T>`, `readonly T[]`.
    Array { element: Box<TypeNode>, readonly: bool },
    Tuple(Vec<TupleElementNode>),
    Union(Vec<TypeNode>),
    Intersection(Vec<TypeNode>),
    Function {
        params: Vec<FunctionParam>,
        return_type: Box<TypeNode>,
        is_constructor: bool,
    },
    Object(Vec<ObjectMemberNode>),
    Parenthesized(Box<TypeNode>),
    This,
    /// Syntax the checker does not model; printed verbatim.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleElementNode {
    pub ty: TypeNode,
    pub optional: bool,
    pub rest: bool,
}

/// A parameter of a function type or function expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParam {
    pub name: String,
    pub optional: bool,
    pub rest: bool,
    pub ty: Option<TypeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectMemberNode {
    Property {
        name: String,
        optional: bool,
        readonly: bool,
        ty: Option<TypeNode>,
    },
    Method {
        name: String,
        optional: bool,
        params: Vec<FunctionParam>,
        return_type: Option<TypeNode>,
    },
    Raw(String),
}

/// The subset of expression syntax used for type inference.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(String),
    String(String),
    Template,
    Bool(bool),
    Null,
    Undefined,
    New {
        callee: String,
        type_args: Vec<TypeNode>,
    },
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Function {
        params: Vec<FunctionParam>,
        return_type: Option<TypeNode>,
        expression_body: Option<Box<Expr>>,
        is_async: bool,
    },
    Assertion(TypeNode),
    Unary {
        operator: String,
        operand: Box<Expr>,
    },
    Binary {
        operator: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Member {
        object: String,
        property: String,
    },
    Identifier(String),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeritageKind {
    Extends,
    Implements,
}

/// One `extends`/`implements` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct HeritageClause {
    pub kind: HeritageKind,
    pub types: Vec<HeritageType>,
}

/// One named type inside a heritage clause.
#[derive(Debug, Clone, PartialEq)]
pub struct HeritageType {
    /// The entity name expression (`Base`, `NS.Base`).
    pub expression: String,
    pub type_args: Vec<TypeNode>,
}

/// Facts about a function body relevant to return type inference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    /// Returned expressions of the body itself; `None` for a bare `return;`.
    pub returns: Vec<Option<Expr>>,
    /// `const`/`let`/`var` declarations of the body, outside nested functions.
    pub locals: Vec<NodeId>,
    pub is_generator: bool,
}

/// A declaration node.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: SyntaxKind,
    pub name: Option<String>,
    pub modifiers: Vec<ModifierKind>,
    pub parent: Option<NodeId>,
    pub span: Span,
    pub question_token: bool,
    pub dot_dot_dot_token: bool,
    /// Declared type, return type, constraint or aliased type depending on the kind.
    pub type_annotation: Option<TypeNode>,
    pub initializer: Option<Expr>,
    pub type_parameters: Vec<NodeId>,
    pub parameters: Vec<NodeId>,
    /// Class/interface/enum members or namespace body statements.
    pub members: Vec<NodeId>,
    pub heritage: Vec<HeritageClause>,
    pub body: Option<Body>,
}

impl Decl {
    pub fn new(kind: SyntaxKind, parent: Option<NodeId>, span: Span) -> Self {
        Self {
            kind,
            name: None,
            modifiers: Vec::new(),
            parent,
            span,
            question_token: false,
            dot_dot_dot_token: false,
            type_annotation: None,
            initializer: None,
            type_parameters: Vec::new(),
            parameters: Vec::new(),
            members: Vec::new(),
            heritage: Vec::new(),
            body: None,
        }
    }

    pub fn has_modifier(&self, modifier: ModifierKind) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn heritage_types(&self, kind: HeritageKind) -> impl Iterator<Item = &HeritageType> {
        self.heritage
            .iter()
            .filter(move |c| c.kind == kind)
            .flat_map(|c| c.types.iter())
    }
}

/// Which export of the source module an import binding refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Default,
    Named(String),
    /// `import * as ns` / `import ns = require(...)`.
    Namespace,
}

/// A local name introduced by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub imported: ImportedName,
    pub specifier: String,
    pub span: Span,
}

/// `export { local as exported }`, optionally `from 'specifier'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifier {
    /// Name in this file, or in the source module when `specifier` is set.
    pub local: ImportedName,
    pub exported: String,
    pub specifier: Option<String>,
}

/// All facts lowered from one source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Normalised path, used as the origin file name in the model.
    pub path: String,
    pub is_declaration_file: bool,
    /// True when the file has top-level imports or exports.
    pub is_module: bool,
    pub nodes: Vec<Decl>,
    pub statements: Vec<NodeId>,
    pub imports: Vec<ImportBinding>,
    pub exports: Vec<ExportSpecifier>,
    /// `export * from '...'` specifiers.
    pub export_stars: Vec<String>,
    /// Every module specifier the file depends on, in source order.
    pub module_requests: Vec<String>,
    pub has_parse_errors: bool,
}

impl SourceFile {
    /// Create empty facts for a file.
    pub fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            is_declaration_file: is_declaration_path(path),
            is_module: false,
            nodes: Vec::new(),
            statements: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            export_stars: Vec::new(),
            module_requests: Vec::new(),
            has_parse_errors: false,
        }
    }

    pub fn decl(&self, id: NodeId) -> &Decl {
        &self.nodes[id.0 as usize]
    }

    /// Find a top-level declaration by name.
    pub fn find_declaration(&self, name: &str) -> Option<NodeId> {
        self.statements
            .iter()
            .copied()
            .find(|id| self.decl(*id).name.as_deref() == Some(name))
    }

    pub(crate) fn push(&mut self, decl: Decl) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(decl);
        id
    }

    pub(crate) fn decl_mut(&mut self, id: NodeId) -> &mut Decl {
        &mut self.nodes[id.0 as usize]
    }

    pub(crate) fn add_module_request(&mut self, specifier: &str) {
        if !self.module_requests.iter().any(|s| s == specifier) {
            self.module_requests.push(specifier.to_string());
        }
    }
}

/// Whether a path names an ambient declaration file.
pub fn is_declaration_path(path: &str) -> bool {
    path.ends_with(".d.ts") || path.ends_with(".d.mts") || path.ends_with(".d.cts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_paths() {
        assert!(is_declaration_path("lib/index.d.ts"));
        assert!(is_declaration_path("types.d.mts"));
        assert!(!is_declaration_path("src/index.ts"));
        assert!(!is_declaration_path("src/d.ts.tsx"));
    }

    #[test]
    fn test_module_requests_are_deduplicated_in_order() {
        let mut file = SourceFile::empty("a.ts");
        file.add_module_request("./b");
        file.add_module_request("./c");
        file.add_module_request("./b");
        assert_eq!(file.module_requests, vec!["./b", "./c"]);
    }

    #[test]
    fn test_modifier_keywords() {
        assert_eq!(ModifierKind::from_keyword("private"), Some(ModifierKind::Private));
        assert_eq!(ModifierKind::from_keyword("static"), Some(ModifierKind::Static));
        assert_eq!(ModifierKind::from_keyword("get"), None);
    }
}
