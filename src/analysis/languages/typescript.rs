//! TypeScript language analyzer using tree-sitter.
//!
//! Parses `.ts`/`.tsx` sources and lowers the concrete syntax tree into the
//! declaration arena described in [`crate::analysis::facts`].

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::analysis::facts::{
    is_declaration_path, Body, Decl, ExportSpecifier, Expr, FunctionParam, HeritageClause,
    HeritageKind, HeritageType, ImportBinding, ImportedName, ModifierKind, NodeId,
    ObjectMemberNode, SourceFile, Span, SyntaxKind, TupleElementNode, TypeNode,
};
use crate::analysis::{LanguageAnalyzer, ParsedFile};

/// Every `return` in a body; nested functions are filtered out afterwards.
const BODY_QUERY: &str = r#"
(return_statement) @return
(lexical_declaration) @local
(variable_declaration) @local
"#;

/// Node kinds that open a new function scope for `return`.
const FUNCTION_SCOPES: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

pub struct TypeScriptAnalyzer {
    language: Language,
    language_id: &'static str,
    extensions: &'static [&'static str],
}

impl TypeScriptAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            language_id: "typescript",
            extensions: &["ts", "mts", "cts"],
        }
    }

    /// Analyzer for `.tsx` sources, which need the JSX-aware grammar.
    pub fn tsx() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
            language_id: "tsx",
            extensions: &["tsx"],
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

impl Default for TypeScriptAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for TypeScriptAnalyzer {
    fn language_id(&self) -> &'static str {
        self.language_id
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser.parse(source, None).ok_or_else(|| {
            anyhow::anyhow!("failed to parse TypeScript source: {}", path.display())
        })?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().replace('\\', "/"),
        })
    }

    fn lower(&self, parsed: &ParsedFile) -> anyhow::Result<SourceFile> {
        let query = Query::new(&self.language, BODY_QUERY)?;
        let mut lowerer = Lowerer {
            source: &parsed.source,
            body_query: &query,
            file: SourceFile::empty(&parsed.path),
        };
        let root = parsed.tree.root_node();
        lowerer.file.has_parse_errors = root.has_error();
        lowerer.file.is_declaration_file = is_declaration_path(&parsed.path);

        let mut statements = Vec::new();
        for child in named_children(root) {
            lowerer.lower_statement(child, None, &mut statements);
        }
        lowerer.file.statements = statements;
        Ok(lowerer.file)
    }
}

struct Lowerer<'a> {
    source: &'a [u8],
    body_query: &'a Query,
    file: SourceFile,
}

impl<'a> Lowerer<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn name_of(&self, node: Node) -> Option<String> {
        node.child_by_field_name("name")
            .map(|n| property_name(self.text(n), n.kind()))
    }

    fn alloc(&mut self, kind: SyntaxKind, node: Node, parent: Option<NodeId>) -> NodeId {
        self.file.push(Decl::new(kind, parent, Span::from_node(node)))
    }

    fn lower_statement(&mut self, node: Node, parent: Option<NodeId>, out: &mut Vec<NodeId>) {
        match node.kind() {
            "import_statement" => {
                if parent.is_none() {
                    self.lower_import(node);
                }
            }
            "export_statement" => self.lower_export(node, parent, out),
            "expression_statement" => {
                // `namespace A {}` without `declare` parses as an expression.
                if let Some(inner) = named_children(node)
                    .into_iter()
                    .find(|n| n.kind() == "internal_module")
                {
                    self.lower_declaration(inner, parent, &[], out);
                }
            }
            _ => self.lower_declaration(node, parent, &[], out),
        }
    }

    fn lower_declaration(
        &mut self,
        node: Node,
        parent: Option<NodeId>,
        outer: &[ModifierKind],
        out: &mut Vec<NodeId>,
    ) {
        let id = match node.kind() {
            "class_declaration" | "abstract_class_declaration" | "class" => {
                self.lower_class(node, parent, outer)
            }
            "interface_declaration" => self.lower_interface(node, parent, outer),
            "enum_declaration" => self.lower_enum(node, parent, outer),
            "function_declaration"
            | "generator_function_declaration"
            | "function_signature"
            | "function_expression"
            | "function" => {
                self.lower_callable(node, parent, SyntaxKind::FunctionDeclaration, outer)
            }
            "internal_module" | "module" => match self.lower_namespace(node, parent, outer) {
                Some(id) => id,
                None => return,
            },
            "type_alias_declaration" => self.lower_type_alias(node, parent, outer),
            "lexical_declaration" | "variable_declaration" => {
                self.lower_variables(node, parent, outer, out);
                return;
            }
            "ambient_declaration" => {
                let mut modifiers = outer.to_vec();
                modifiers.push(ModifierKind::Declare);
                for child in named_children(node) {
                    self.lower_declaration(child, parent, &modifiers, out);
                }
                return;
            }
            _ => return,
        };
        out.push(id);
    }

    fn lower_import(&mut self, node: Node) {
        let Some(source) = node.child_by_field_name("source") else {
            // `import x = require('y')`
            if let Some(clause) = child_of_kind(node, "import_require_clause") {
                let local = child_of_kind(clause, "identifier").map(|n| self.text(n));
                let specifier = clause.child_by_field_name("source").map(|n| unquote(self.text(n)));
                if let (Some(local), Some(specifier)) = (local, specifier) {
                    self.file.is_module = true;
                    self.file.add_module_request(&specifier);
                    self.file.imports.push(ImportBinding {
                        local: local.to_string(),
                        imported: ImportedName::Namespace,
                        specifier,
                        span: Span::from_node(node),
                    });
                }
            }
            return;
        };

        let specifier = unquote(self.text(source));
        self.file.is_module = true;
        self.file.add_module_request(&specifier);

        let Some(clause) = child_of_kind(node, "import_clause") else {
            return;
        };
        for child in named_children(clause) {
            match child.kind() {
                "identifier" => self.push_import(self.text(child), ImportedName::Default, &specifier, child),
                "namespace_import" => {
                    if let Some(local) = child_of_kind(child, "identifier") {
                        self.push_import(self.text(local), ImportedName::Namespace, &specifier, child);
                    }
                }
                "named_imports" => {
                    for spec in named_children(child) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = unquote(self.text(name));
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| self.text(a).to_string())
                            .unwrap_or_else(|| imported.clone());
                        let imported = if imported == "default" {
                            ImportedName::Default
                        } else {
                            ImportedName::Named(imported)
                        };
                        self.push_import(&local, imported, &specifier, spec);
                    }
                }
                _ => {}
            }
        }
    }

    fn push_import(&mut self, local: &str, imported: ImportedName, specifier: &str, node: Node) {
        self.file.imports.push(ImportBinding {
            local: local.to_string(),
            imported,
            specifier: specifier.to_string(),
            span: Span::from_node(node),
        });
    }

    fn lower_export(&mut self, node: Node, parent: Option<NodeId>, out: &mut Vec<NodeId>) {
        if parent.is_none() {
            self.file.is_module = true;
        }
        let is_default = child_of_kind(node, "default").is_some();
        let mut modifiers = vec![ModifierKind::Export];
        if is_default {
            modifiers.push(ModifierKind::Default);
        }

        if let Some(declaration) = node.child_by_field_name("declaration") {
            self.lower_declaration(declaration, parent, &modifiers, out);
            return;
        }

        if is_default {
            if let Some(value) = node.child_by_field_name("value") {
                match value.kind() {
                    "class" | "function_expression" | "function" => {
                        self.lower_declaration(value, parent, &modifiers, out);
                    }
                    "identifier" => self.file.exports.push(ExportSpecifier {
                        local: ImportedName::Named(self.text(value).to_string()),
                        exported: "default".to_string(),
                        specifier: None,
                    }),
                    _ => {}
                }
            }
            return;
        }

        let specifier = node
            .child_by_field_name("source")
            .map(|s| unquote(self.text(s)));
        if let Some(specifier) = &specifier {
            self.file.add_module_request(specifier);
        }

        if let Some(clause) = child_of_kind(node, "export_clause") {
            for spec in named_children(clause) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let Some(name) = spec.child_by_field_name("name") else {
                    continue;
                };
                let local = unquote(self.text(name));
                let exported = spec
                    .child_by_field_name("alias")
                    .map(|a| unquote(self.text(a)))
                    .unwrap_or_else(|| local.clone());
                let local = if local == "default" {
                    ImportedName::Default
                } else {
                    ImportedName::Named(local)
                };
                self.file.exports.push(ExportSpecifier {
                    local,
                    exported,
                    specifier: specifier.clone(),
                });
            }
        } else if let Some(namespace) = child_of_kind(node, "namespace_export") {
            let exported = named_children(namespace)
                .into_iter()
                .last()
                .map(|n| unquote(self.text(n)));
            if let (Some(exported), Some(specifier)) = (exported, specifier) {
                self.file.exports.push(ExportSpecifier {
                    local: ImportedName::Namespace,
                    exported,
                    specifier: Some(specifier),
                });
            }
        } else if child_of_kind(node, "*").is_some() {
            if let Some(specifier) = specifier {
                self.file.export_stars.push(specifier);
            }
        }
    }

    fn lower_class(&mut self, node: Node, parent: Option<NodeId>, outer: &[ModifierKind]) -> NodeId {
        let id = self.alloc(SyntaxKind::ClassDeclaration, node, parent);
        let mut modifiers = outer.to_vec();
        modifiers.extend(self.modifiers_before_name(node));
        if node.kind() == "abstract_class_declaration" && !modifiers.contains(&ModifierKind::Abstract) {
            modifiers.push(ModifierKind::Abstract);
        }

        let type_parameters = self.lower_type_parameters(node, id);
        let mut heritage = Vec::new();
        if let Some(clause) = child_of_kind(node, "class_heritage") {
            for child in named_children(clause) {
                match child.kind() {
                    "extends_clause" => heritage.push(HeritageClause {
                        kind: HeritageKind::Extends,
                        types: self.lower_extends_clause(child),
                    }),
                    "implements_clause" => heritage.push(HeritageClause {
                        kind: HeritageKind::Implements,
                        types: named_children(child)
                            .into_iter()
                            .filter_map(|t| self.lower_heritage_type(t))
                            .collect(),
                    }),
                    _ => {}
                }
            }
        }

        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for member in named_children(body) {
                if let Some(member_id) = self.lower_class_member(member, id) {
                    members.push(member_id);
                }
            }
        }

        let name = self.name_of(node);
        let decl = self.file.decl_mut(id);
        decl.name = name;
        decl.modifiers = modifiers;
        decl.type_parameters = type_parameters;
        decl.heritage = heritage;
        decl.members = members;
        id
    }

    fn lower_extends_clause(&self, clause: Node) -> Vec<HeritageType> {
        let mut types: Vec<HeritageType> = Vec::new();
        for (field, child) in fielded_children(clause) {
            match field {
                Some("value") => types.push(HeritageType {
                    expression: collapse_whitespace(self.text(child)),
                    type_args: Vec::new(),
                }),
                Some("type_arguments") => {
                    if let Some(last) = types.last_mut() {
                        last.type_args = self.lower_type_arguments(child);
                    }
                }
                _ => {}
            }
        }
        types
    }

    fn lower_heritage_type(&self, node: Node) -> Option<HeritageType> {
        match node.kind() {
            "type_identifier" | "identifier" | "nested_type_identifier" | "member_expression" => {
                Some(HeritageType {
                    expression: collapse_whitespace(self.text(node)),
                    type_args: Vec::new(),
                })
            }
            "generic_type" => {
                let name = node.child_by_field_name("name")?;
                Some(HeritageType {
                    expression: collapse_whitespace(self.text(name)),
                    type_args: node
                        .child_by_field_name("type_arguments")
                        .map(|a| self.lower_type_arguments(a))
                        .unwrap_or_default(),
                })
            }
            _ => None,
        }
    }

    fn lower_class_member(&mut self, member: Node, class: NodeId) -> Option<NodeId> {
        match member.kind() {
            "method_definition" => Some(self.lower_method(member, class, false)),
            "method_signature" => Some(self.lower_method(member, class, false)),
            "abstract_method_signature" => {
                let id = self.lower_method(member, class, false);
                let decl = self.file.decl_mut(id);
                if !decl.has_modifier(ModifierKind::Abstract) {
                    decl.modifiers.push(ModifierKind::Abstract);
                }
                Some(id)
            }
            "public_field_definition" => Some(self.lower_property(member, class, SyntaxKind::PropertyDeclaration)),
            "index_signature" => Some(self.alloc(SyntaxKind::IndexSignature, member, Some(class))),
            "class_static_block" => Some(self.alloc(SyntaxKind::ClassStaticBlock, member, Some(class))),
            _ => None,
        }
    }

    fn lower_interface(&mut self, node: Node, parent: Option<NodeId>, outer: &[ModifierKind]) -> NodeId {
        let id = self.alloc(SyntaxKind::InterfaceDeclaration, node, parent);
        let type_parameters = self.lower_type_parameters(node, id);

        let mut heritage = Vec::new();
        if let Some(clause) = child_of_kind(node, "extends_type_clause") {
            heritage.push(HeritageClause {
                kind: HeritageKind::Extends,
                types: named_children(clause)
                    .into_iter()
                    .filter_map(|t| self.lower_heritage_type(t))
                    .collect(),
            });
        }

        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for member in named_children(body) {
                if let Some(member_id) = self.lower_type_member(member, id) {
                    members.push(member_id);
                }
            }
        }

        let name = self.name_of(node);
        let decl = self.file.decl_mut(id);
        decl.name = name;
        decl.modifiers = outer.to_vec();
        decl.type_parameters = type_parameters;
        decl.heritage = heritage;
        decl.members = members;
        id
    }

    fn lower_type_member(&mut self, member: Node, owner: NodeId) -> Option<NodeId> {
        match member.kind() {
            "property_signature" => Some(self.lower_property(member, owner, SyntaxKind::PropertySignature)),
            "method_signature" => Some(self.lower_method(member, owner, true)),
            "call_signature" => Some(self.lower_callable(member, Some(owner), SyntaxKind::CallSignature, &[])),
            "construct_signature" => {
                Some(self.lower_callable(member, Some(owner), SyntaxKind::ConstructSignature, &[]))
            }
            "index_signature" => Some(self.alloc(SyntaxKind::IndexSignature, member, Some(owner))),
            _ => None,
        }
    }

    fn lower_enum(&mut self, node: Node, parent: Option<NodeId>, outer: &[ModifierKind]) -> NodeId {
        let id = self.alloc(SyntaxKind::EnumDeclaration, node, parent);
        let mut modifiers = outer.to_vec();
        if child_of_kind(node, "const").is_some() {
            modifiers.push(ModifierKind::Const);
        }

        let mut members = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for member in named_children(body) {
                let (name, initializer) = match member.kind() {
                    "property_identifier" | "identifier" | "string" | "number" => {
                        (property_name(self.text(member), member.kind()), None)
                    }
                    "enum_assignment" => {
                        let Some(name) = self.name_of(member) else {
                            continue;
                        };
                        let value = member.child_by_field_name("value").map(|v| self.lower_expr(v));
                        (name, value)
                    }
                    _ => continue,
                };
                let member_id = self.alloc(SyntaxKind::EnumMember, member, Some(id));
                let decl = self.file.decl_mut(member_id);
                decl.name = Some(name);
                decl.initializer = initializer;
                members.push(member_id);
            }
        }

        let name = self.name_of(node);
        let decl = self.file.decl_mut(id);
        decl.name = name;
        decl.modifiers = modifiers;
        decl.members = members;
        id
    }

    fn lower_namespace(
        &mut self,
        node: Node,
        parent: Option<NodeId>,
        outer: &[ModifierKind],
    ) -> Option<NodeId> {
        let name_node = node.child_by_field_name("name")?;
        let full_name = unquote(self.text(name_node));

        // `namespace A.B {}` nests B inside A; `declare module "x" {}` keeps its quotes.
        let quoted;
        let segments: Vec<&str> = if name_node.kind() == "string" {
            quoted = format!("\"{}\"", full_name);
            vec![quoted.as_str()]
        } else {
            full_name.split('.').map(str::trim).collect()
        };

        let mut outermost = None;
        let mut current_parent = parent;
        let mut previous: Option<NodeId> = None;
        for (index, segment) in segments.iter().enumerate() {
            let id = self.alloc(SyntaxKind::ModuleDeclaration, node, current_parent);
            let decl = self.file.decl_mut(id);
            decl.name = Some(segment.to_string());
            decl.modifiers = if index == 0 {
                outer.to_vec()
            } else {
                vec![ModifierKind::Export]
            };
            if let Some(prev) = previous {
                self.file.decl_mut(prev).members.push(id);
            }
            outermost.get_or_insert(id);
            previous = Some(id);
            current_parent = Some(id);
        }

        let innermost = previous?;
        if let Some(body) = node.child_by_field_name("body") {
            let mut statements = Vec::new();
            for child in named_children(body) {
                self.lower_statement(child, Some(innermost), &mut statements);
            }
            self.file.decl_mut(innermost).members.extend(statements);
        }
        outermost
    }

    fn lower_type_alias(&mut self, node: Node, parent: Option<NodeId>, outer: &[ModifierKind]) -> NodeId {
        let id = self.alloc(SyntaxKind::TypeAliasDeclaration, node, parent);
        let type_parameters = self.lower_type_parameters(node, id);
        let aliased = node.child_by_field_name("value").map(|v| self.lower_type(v));
        let name = self.name_of(node);
        let decl = self.file.decl_mut(id);
        decl.name = name;
        decl.modifiers = outer.to_vec();
        decl.type_parameters = type_parameters;
        decl.type_annotation = aliased;
        id
    }

    fn lower_variables(
        &mut self,
        node: Node,
        parent: Option<NodeId>,
        outer: &[ModifierKind],
        out: &mut Vec<NodeId>,
    ) {
        let is_const = node
            .child_by_field_name("kind")
            .map(|k| self.text(k) == "const")
            .unwrap_or(false);
        for declarator in named_children(node) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name.kind() != "identifier" {
                continue;
            }
            let id = self.alloc(SyntaxKind::VariableDeclaration, declarator, parent);
            let annotation = declarator.child_by_field_name("type").map(|t| self.lower_type(t));
            let initializer = declarator.child_by_field_name("value").map(|v| self.lower_expr(v));
            let name = self.text(name).to_string();
            let decl = self.file.decl_mut(id);
            decl.name = Some(name);
            decl.modifiers = outer.to_vec();
            if is_const {
                decl.modifiers.push(ModifierKind::Const);
            }
            decl.type_annotation = annotation;
            decl.initializer = initializer;
            out.push(id);
        }
    }

    fn lower_property(&mut self, node: Node, owner: NodeId, kind: SyntaxKind) -> NodeId {
        let id = self.alloc(kind, node, Some(owner));
        let modifiers = self.modifiers_before_name(node);
        let question = has_token_after_name(node, "?");
        let annotation = node.child_by_field_name("type").map(|t| self.lower_type(t));
        let initializer = node.child_by_field_name("value").map(|v| self.lower_expr(v));
        let name = self.name_of(node);
        let decl = self.file.decl_mut(id);
        decl.name = name;
        decl.modifiers = modifiers;
        decl.question_token = question;
        decl.type_annotation = annotation;
        decl.initializer = initializer;
        id
    }

    fn lower_method(&mut self, node: Node, owner: NodeId, in_type: bool) -> NodeId {
        let name = self.name_of(node).unwrap_or_default();
        let accessor = children(node)
            .into_iter()
            .take_while(|c| Some(c.id()) != node.child_by_field_name("name").map(|n| n.id()))
            .find_map(|c| match c.kind() {
                "get" => Some(SyntaxKind::GetAccessor),
                "set" => Some(SyntaxKind::SetAccessor),
                _ => None,
            });
        let kind = match accessor {
            Some(kind) => kind,
            None if name == "constructor" && !in_type => SyntaxKind::Constructor,
            None if in_type => SyntaxKind::MethodSignature,
            None => SyntaxKind::MethodDeclaration,
        };

        let id = self.lower_callable(node, Some(owner), kind, &[]);
        let question = has_token_after_name(node, "?");
        let decl = self.file.decl_mut(id);
        decl.name = Some(name);
        decl.question_token = question;
        id
    }

    /// Functions, methods and signatures share the call signature layout.
    fn lower_callable(
        &mut self,
        node: Node,
        parent: Option<NodeId>,
        kind: SyntaxKind,
        outer: &[ModifierKind],
    ) -> NodeId {
        let id = self.alloc(kind, node, parent);
        let mut modifiers = outer.to_vec();
        modifiers.extend(self.modifiers_before_name(node));

        let type_parameters = self.lower_type_parameters(node, id);
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| self.lower_parameters(p, id))
            .unwrap_or_default();
        let return_type = node.child_by_field_name("return_type").map(|t| self.lower_type(t));
        let body = node.child_by_field_name("body").map(|b| {
            let (returns, declarations) = self.scan_body(node, b);
            let mut locals = Vec::new();
            for declaration in declarations {
                self.lower_variables(declaration, Some(id), &[], &mut locals);
            }
            Body {
                returns,
                locals,
                is_generator: node.kind().starts_with("generator") || child_of_kind(node, "*").is_some(),
            }
        });

        let name = self.name_of(node);
        let decl = self.file.decl_mut(id);
        decl.name = name;
        decl.modifiers = modifiers;
        decl.type_parameters = type_parameters;
        decl.parameters = parameters;
        decl.type_annotation = return_type;
        decl.body = body;
        id
    }

    /// Returned expressions and variable declarations owned by one function body.
    fn scan_body<'t>(&self, owner: Node<'t>, body: Node<'t>) -> (Vec<Option<Expr>>, Vec<Node<'t>>) {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(self.body_query, body, self.source);
        let mut returns = Vec::new();
        let mut declarations = Vec::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                if enclosing_function(node).map(|f| f.id()) != Some(owner.id()) {
                    continue;
                }
                if node.kind() == "return_statement" {
                    let value = named_children(node).into_iter().next().map(|e| self.lower_expr(e));
                    returns.push(value);
                } else {
                    declarations.push(node);
                }
            }
        }
        (returns, declarations)
    }

    fn lower_parameters(&mut self, formal: Node, owner: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        for (index, param) in named_children(formal).into_iter().enumerate() {
            if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                continue;
            }
            let Some(pattern) = param.child_by_field_name("pattern") else {
                continue;
            };
            if pattern.kind() == "this" {
                continue;
            }
            let (name, rest) = match pattern.kind() {
                "identifier" => (self.text(pattern).to_string(), false),
                "rest_pattern" => {
                    let inner = named_children(pattern)
                        .into_iter()
                        .find(|n| n.kind() == "identifier")
                        .map(|n| self.text(n).to_string());
                    (inner.unwrap_or_else(|| format!("__{index}")), true)
                }
                _ => (format!("__{index}"), false),
            };

            let id = self.alloc(SyntaxKind::Parameter, param, Some(owner));
            let modifiers = children(param)
                .into_iter()
                .take_while(|c| c.id() != pattern.id())
                .filter_map(|c| self.modifier_of(c))
                .collect();
            let annotation = param.child_by_field_name("type").map(|t| self.lower_type(t));
            let initializer = param.child_by_field_name("value").map(|v| self.lower_expr(v));

            let decl = self.file.decl_mut(id);
            decl.name = Some(name);
            decl.modifiers = modifiers;
            decl.question_token = param.kind() == "optional_parameter";
            decl.dot_dot_dot_token = rest;
            decl.type_annotation = annotation;
            decl.initializer = initializer;
            ids.push(id);
        }
        ids
    }

    fn lower_type_parameters(&mut self, node: Node, owner: NodeId) -> Vec<NodeId> {
        let Some(list) = node.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        let mut ids = Vec::new();
        for param in named_children(list) {
            if param.kind() != "type_parameter" {
                continue;
            }
            let id = self.alloc(SyntaxKind::TypeParameter, param, Some(owner));
            let constraint = param
                .child_by_field_name("constraint")
                .and_then(|c| named_children(c).into_iter().next())
                .map(|t| self.lower_type(t));
            let name = self.name_of(param);
            let decl = self.file.decl_mut(id);
            decl.name = name;
            decl.type_annotation = constraint;
            ids.push(id);
        }
        ids
    }

    fn modifiers_before_name(&self, node: Node) -> Vec<ModifierKind> {
        let name_id = node.child_by_field_name("name").map(|n| n.id());
        children(node)
            .into_iter()
            .take_while(|c| Some(c.id()) != name_id)
            .filter_map(|c| self.modifier_of(c))
            .collect()
    }

    fn modifier_of(&self, node: Node) -> Option<ModifierKind> {
        match node.kind() {
            "accessibility_modifier" | "override_modifier" => {
                ModifierKind::from_keyword(self.text(node).trim())
            }
            kind => ModifierKind::from_keyword(kind),
        }
    }

    fn lower_type_arguments(&self, node: Node) -> Vec<TypeNode> {
        named_children(node)
            .into_iter()
            .map(|t| self.lower_type(t))
            .collect()
    }

    fn lower_type(&self, node: Node) -> TypeNode {
        match node.kind() {
            "type_annotation"
            | "opting_type_annotation"
            | "omitting_type_annotation"
            | "adding_type_annotation"
            | "type_predicate_annotation"
            | "asserts_annotation"
            | "constraint" => match named_children(node).into_iter().next() {
                Some(inner) => self.lower_type(inner),
                None => TypeNode::Keyword("any".to_string()),
            },
            "predefined_type" => TypeNode::Keyword(self.text(node).to_string()),
            "type_identifier" | "identifier" | "nested_type_identifier" => TypeNode::Reference {
                name: collapse_whitespace(self.text(node)).replace(' ', ""),
                args: Vec::new(),
            },
            "generic_type" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| collapse_whitespace(self.text(n)).replace(' ', ""))
                    .unwrap_or_default();
                let args = node
                    .child_by_field_name("type_arguments")
                    .map(|a| self.lower_type_arguments(a))
                    .unwrap_or_default();
                match (name.as_str(), args.len()) {
                    ("Array", 1) | ("ReadonlyArray", 1) => TypeNode::Array {
                        readonly: name == "ReadonlyArray",
                        element: Box::new(args.into_iter().next().unwrap_or(TypeNode::This)),
                    },
                    _ => TypeNode::Reference { name, args },
                }
            }
            "array_type" => match named_children(node).into_iter().next() {
                Some(element) => TypeNode::Array {
                    element: Box::new(self.lower_type(element)),
                    readonly: false,
                },
                None => TypeNode::Raw(collapse_whitespace(self.text(node))),
            },
            "readonly_type" => match named_children(node).into_iter().next().map(|t| self.lower_type(t)) {
                Some(TypeNode::Array { element, .. }) => TypeNode::Array {
                    element,
                    readonly: true,
                },
                _ => TypeNode::Raw(collapse_whitespace(self.text(node))),
            },
            "union_type" | "intersection_type" => {
                let mut parts = Vec::new();
                for child in named_children(node) {
                    match self.lower_type(child) {
                        TypeNode::Union(inner) if node.kind() == "union_type" => parts.extend(inner),
                        TypeNode::Intersection(inner) if node.kind() == "intersection_type" => {
                            parts.extend(inner)
                        }
                        other => parts.push(other),
                    }
                }
                if node.kind() == "union_type" {
                    TypeNode::Union(parts)
                } else {
                    TypeNode::Intersection(parts)
                }
            }
            "function_type" | "constructor_type" => TypeNode::Function {
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.lower_function_params(p))
                    .unwrap_or_default(),
                return_type: Box::new(
                    node.child_by_field_name("return_type")
                        .map(|t| self.lower_type(t))
                        .unwrap_or_else(|| TypeNode::Keyword("any".to_string())),
                ),
                is_constructor: node.kind() == "constructor_type",
            },
            "object_type" => TypeNode::Object(
                named_children(node)
                    .into_iter()
                    .map(|m| self.lower_object_member(m))
                    .collect(),
            ),
            "tuple_type" => TypeNode::Tuple(
                named_children(node)
                    .into_iter()
                    .map(|e| self.lower_tuple_element(e))
                    .collect(),
            ),
            "parenthesized_type" => match named_children(node).into_iter().next() {
                Some(inner) => TypeNode::Parenthesized(Box::new(self.lower_type(inner))),
                None => TypeNode::Raw(collapse_whitespace(self.text(node))),
            },
            "literal_type" => self.lower_literal_type(node),
            "this_type" | "this" => TypeNode::This,
            _ => TypeNode::Raw(collapse_whitespace(self.text(node))),
        }
    }

    fn lower_literal_type(&self, node: Node) -> TypeNode {
        let Some(inner) = named_children(node).into_iter().next() else {
            return TypeNode::Raw(self.text(node).to_string());
        };
        match inner.kind() {
            "null" => TypeNode::Keyword("null".to_string()),
            "undefined" => TypeNode::Keyword("undefined".to_string()),
            "string" => TypeNode::Literal(format!("\"{}\"", unquote(self.text(inner)))),
            _ => TypeNode::Literal(collapse_whitespace(self.text(inner)).replace(' ', "")),
        }
    }

    fn lower_tuple_element(&self, node: Node) -> TupleElementNode {
        match node.kind() {
            "optional_type" => TupleElementNode {
                ty: self.first_type(node),
                optional: true,
                rest: false,
            },
            "rest_type" => TupleElementNode {
                ty: self.first_type(node),
                optional: false,
                rest: true,
            },
            "tuple_parameter" | "optional_tuple_parameter" => TupleElementNode {
                ty: node
                    .child_by_field_name("type")
                    .map(|t| self.lower_type(t))
                    .unwrap_or_else(|| TypeNode::Keyword("any".to_string())),
                optional: node.kind() == "optional_tuple_parameter",
                rest: false,
            },
            _ => TupleElementNode {
                ty: self.lower_type(node),
                optional: false,
                rest: false,
            },
        }
    }

    fn first_type(&self, node: Node) -> TypeNode {
        named_children(node)
            .into_iter()
            .next()
            .map(|t| self.lower_type(t))
            .unwrap_or_else(|| TypeNode::Keyword("any".to_string()))
    }

    fn lower_object_member(&self, node: Node) -> ObjectMemberNode {
        match node.kind() {
            "property_signature" => ObjectMemberNode::Property {
                name: self.name_of(node).unwrap_or_default(),
                optional: has_token_after_name(node, "?"),
                readonly: self
                    .modifiers_before_name(node)
                    .contains(&ModifierKind::Readonly),
                ty: node.child_by_field_name("type").map(|t| self.lower_type(t)),
            },
            "method_signature" => ObjectMemberNode::Method {
                name: self.name_of(node).unwrap_or_default(),
                optional: has_token_after_name(node, "?"),
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.lower_function_params(p))
                    .unwrap_or_default(),
                return_type: node.child_by_field_name("return_type").map(|t| self.lower_type(t)),
            },
            _ => ObjectMemberNode::Raw(collapse_whitespace(self.text(node)).trim_end_matches([';', ',']).to_string()),
        }
    }

    fn lower_function_params(&self, formal: Node) -> Vec<FunctionParam> {
        let mut params = Vec::new();
        for (index, param) in named_children(formal).into_iter().enumerate() {
            if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                continue;
            }
            let Some(pattern) = param.child_by_field_name("pattern") else {
                continue;
            };
            let (name, rest) = match pattern.kind() {
                "this" => continue,
                "identifier" => (self.text(pattern).to_string(), false),
                "rest_pattern" => (
                    named_children(pattern)
                        .into_iter()
                        .find(|n| n.kind() == "identifier")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_else(|| format!("__{index}")),
                    true,
                ),
                _ => (format!("__{index}"), false),
            };
            params.push(FunctionParam {
                name,
                optional: param.kind() == "optional_parameter" || param.child_by_field_name("value").is_some(),
                rest,
                ty: param.child_by_field_name("type").map(|t| self.lower_type(t)),
            });
        }
        params
    }

    fn lower_expr(&self, node: Node) -> Expr {
        match node.kind() {
            "number" => Expr::Number(self.text(node).to_string()),
            "string" => Expr::String(unquote(self.text(node))),
            "template_string" => Expr::Template,
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "null" => Expr::Null,
            "undefined" => Expr::Undefined,
            "identifier" if self.text(node) == "undefined" => Expr::Undefined,
            "identifier" => Expr::Identifier(self.text(node).to_string()),
            "new_expression" => Expr::New {
                callee: node
                    .child_by_field_name("constructor")
                    .map(|c| collapse_whitespace(self.text(c)).replace(' ', ""))
                    .unwrap_or_default(),
                type_args: node
                    .child_by_field_name("type_arguments")
                    .map(|a| self.lower_type_arguments(a))
                    .unwrap_or_default(),
            },
            "array" => Expr::Array(
                named_children(node)
                    .into_iter()
                    .map(|e| match e.kind() {
                        "spread_element" => Expr::Other,
                        _ => self.lower_expr(e),
                    })
                    .collect(),
            ),
            "object" => {
                let mut properties = Vec::new();
                for child in named_children(node) {
                    match child.kind() {
                        "pair" => {
                            let key = child.child_by_field_name("key");
                            let value = child.child_by_field_name("value");
                            if let (Some(key), Some(value)) = (key, value) {
                                properties.push((
                                    property_name(self.text(key), key.kind()),
                                    self.lower_expr(value),
                                ));
                            }
                        }
                        "shorthand_property_identifier" => {
                            let name = self.text(child).to_string();
                            properties.push((name.clone(), Expr::Identifier(name)));
                        }
                        "method_definition" => {
                            if let Some(name) = self.name_of(child) {
                                properties.push((name, self.lower_function_expr(child)));
                            }
                        }
                        _ => {}
                    }
                }
                Expr::Object(properties)
            }
            "arrow_function" | "function_expression" | "function" => self.lower_function_expr(node),
            "as_expression" | "satisfies_expression" => {
                let parts = named_children(node);
                match (node.kind(), parts.get(1)) {
                    ("as_expression", Some(ty)) if self.text(*ty) != "const" => {
                        Expr::Assertion(self.lower_type(*ty))
                    }
                    (_, _) => parts.first().map(|e| self.lower_expr(*e)).unwrap_or(Expr::Other),
                }
            }
            "type_assertion" => match child_of_kind(node, "type_arguments")
                .and_then(|a| named_children(a).into_iter().next())
            {
                Some(ty) => Expr::Assertion(self.lower_type(ty)),
                None => Expr::Other,
            },
            "parenthesized_expression" | "non_null_expression" => named_children(node)
                .into_iter()
                .next()
                .map(|e| self.lower_expr(e))
                .unwrap_or(Expr::Other),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator").map(|o| self.text(o));
                let argument = node.child_by_field_name("argument");
                match (operator, argument) {
                    (Some(operator), Some(argument)) => Expr::Unary {
                        operator: operator.to_string(),
                        operand: Box::new(self.lower_expr(argument)),
                    },
                    _ => Expr::Other,
                }
            }
            "binary_expression" => {
                let left = node.child_by_field_name("left");
                let operator = node.child_by_field_name("operator").map(|o| self.text(o));
                let right = node.child_by_field_name("right");
                match (left, operator, right) {
                    (Some(left), Some(operator), Some(right)) => Expr::Binary {
                        operator: operator.to_string(),
                        left: Box::new(self.lower_expr(left)),
                        right: Box::new(self.lower_expr(right)),
                    },
                    _ => Expr::Other,
                }
            }
            "member_expression" => {
                let object = node.child_by_field_name("object");
                let property = node.child_by_field_name("property");
                match (object, property) {
                    (Some(object), Some(property)) => Expr::Member {
                        object: collapse_whitespace(self.text(object)).replace(' ', ""),
                        property: self.text(property).to_string(),
                    },
                    _ => Expr::Other,
                }
            }
            _ => Expr::Other,
        }
    }

    fn lower_function_expr(&self, node: Node) -> Expr {
        let params = match node.child_by_field_name("parameters") {
            Some(formal) => self.lower_function_params(formal),
            None => node
                .child_by_field_name("parameter")
                .map(|p| {
                    vec![FunctionParam {
                        name: self.text(p).to_string(),
                        optional: false,
                        rest: false,
                        ty: None,
                    }]
                })
                .unwrap_or_default(),
        };
        let expression_body = node
            .child_by_field_name("body")
            .filter(|b| b.kind() != "statement_block")
            .map(|b| Box::new(self.lower_expr(b)));
        Expr::Function {
            params,
            return_type: node.child_by_field_name("return_type").map(|t| self.lower_type(t)),
            expression_body,
            is_async: child_of_kind(node, "async").is_some(),
        }
    }
}

fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named children without comments.
fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Children paired with the grammar field they occupy.
fn fielded_children(node: Node) -> Vec<(Option<&'static str>, Node)> {
    let mut cursor = node.walk();
    let mut out = Vec::new();
    if cursor.goto_first_child() {
        loop {
            out.push((cursor.field_name(), cursor.node()));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    out
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// Whether an anonymous token such as `?` follows the `name` field.
fn has_token_after_name(node: Node, token: &str) -> bool {
    let Some(name) = node.child_by_field_name("name") else {
        return false;
    };
    children(node)
        .into_iter()
        .skip_while(|c| c.id() != name.id())
        .skip(1)
        .take_while(|c| !c.is_named())
        .any(|c| c.kind() == token)
}

fn enclosing_function(node: Node) -> Option<Node> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if FUNCTION_SCOPES.contains(&parent.kind()) {
            return Some(parent);
        }
        current = parent.parent();
    }
    None
}

fn property_name(text: &str, kind: &str) -> String {
    match kind {
        "string" => unquote(text),
        _ => text.to_string(),
    }
}

fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    let quoted = trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\''))
            || (trimmed.starts_with('`') && trimmed.ends_with('`')));
    if quoted {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
