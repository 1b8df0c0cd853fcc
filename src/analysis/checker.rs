//! Type checking queries over a bound program.
//!
//! Types come from annotations where present. Otherwise they are inferred
//! from initializers and returned expressions, covering the forms that show
//! up in class members: literals, `new` expressions, arrays, object
//! literals, arrow functions, assertions, enum member access and references
//! to other declarations.

use super::binder::{Binder, Symbol, SymbolId, SymbolKind};
use super::context::AnalysisContext;
use super::facts::{
    Body, Decl, DeclRef, Expr, FileId, FunctionParam, ModifierKind, ObjectMemberNode, SourceFile,
    SyntaxKind, TypeNode,
};
use super::traits::TypeQuery;
use super::types::{
    FunctionType, FunctionTypeParam, Intrinsic, ObjectMember, Signature, TupleElement, Type,
    TypePrinter,
};

/// How deep inference follows references to other declarations.
const MAX_INFERENCE_DEPTH: usize = 8;

const COMPARISON_OPERATORS: &[&str] = &[
    "<", ">", "<=", ">=", "==", "===", "!=", "!==", "instanceof", "in",
];

const ARITHMETIC_OPERATORS: &[&str] = &["-", "*", "/", "%", "**", "&", "|", "^", "<<", ">>", ">>>"];

/// Semantic queries over one analysis context.
#[derive(Clone, Copy)]
pub struct Checker<'a> {
    ctx: &'a AnalysisContext,
}

impl<'a> Checker<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self { ctx }
    }

    fn files(&self) -> &'a [SourceFile] {
        self.ctx.files()
    }

    fn binder(&self) -> &'a Binder {
        self.ctx.binder()
    }

    fn strict(&self) -> bool {
        self.ctx.options().strict_null_checks()
    }

    fn decl(&self, decl: DeclRef) -> &'a Decl {
        self.files()[decl.file.0 as usize].decl(decl.node)
    }

    fn intrinsic(intrinsic: Intrinsic) -> Type {
        Type::Intrinsic(intrinsic)
    }

    fn nullish(&self, intrinsic: Intrinsic) -> Type {
        // Outside strict mode null and undefined widen to any.
        if self.strict() {
            Self::intrinsic(intrinsic)
        } else {
            Type::ANY
        }
    }

    fn reference(&self, name: &str, at: DeclRef, args: Vec<Type>) -> Type {
        Type::Reference {
            name: name.to_string(),
            symbol: self.binder().resolve_entity_name(self.files(), at, name),
            args,
        }
    }

    /// Type of an annotation written at `at`.
    pub fn type_from_node(&self, node: &TypeNode, at: DeclRef) -> Type {
        match node {
            TypeNode::Keyword(keyword) => Intrinsic::from_keyword(keyword)
                .map(Type::Intrinsic)
                .unwrap_or_else(|| Type::Raw(keyword.clone())),
            TypeNode::Literal(text) => Type::Literal(text.clone()),
            TypeNode::Reference { name, args } => {
                let args = args.iter().map(|a| self.type_from_node(a, at)).collect();
                self.reference(name, at, args)
            }
            TypeNode::Array { element, readonly } => Type::Array {
                element: Box::new(self.type_from_node(element, at)),
                readonly: *readonly,
            },
            TypeNode::Tuple(elements) => Type::Tuple(
                elements
                    .iter()
                    .map(|e| TupleElement {
                        ty: self.type_from_node(&e.ty, at),
                        optional: e.optional,
                        rest: e.rest,
                    })
                    .collect(),
            ),
            TypeNode::Union(parts) => Type::union(
                parts.iter().map(|p| self.type_from_node(p, at)).collect(),
                self.strict(),
            ),
            TypeNode::Intersection(parts) => {
                Type::Intersection(parts.iter().map(|p| self.type_from_node(p, at)).collect())
            }
            TypeNode::Function {
                params,
                return_type,
                is_constructor,
            } => Type::Function(Box::new(FunctionType {
                params: self.function_params(params, at),
                return_type: self.type_from_node(return_type, at),
                is_constructor: *is_constructor,
            })),
            TypeNode::Object(members) => Type::Object(
                members
                    .iter()
                    .map(|m| match m {
                        ObjectMemberNode::Property {
                            name,
                            optional,
                            readonly,
                            ty,
                        } => ObjectMember::Property {
                            name: name.clone(),
                            optional: *optional,
                            readonly: *readonly,
                            ty: ty
                                .as_ref()
                                .map(|t| self.type_from_node(t, at))
                                .unwrap_or(Type::ANY),
                        },
                        ObjectMemberNode::Method {
                            name,
                            optional,
                            params,
                            return_type,
                        } => ObjectMember::Method {
                            name: name.clone(),
                            optional: *optional,
                            params: self.function_params(params, at),
                            return_type: return_type
                                .as_ref()
                                .map(|t| self.type_from_node(t, at))
                                .unwrap_or(Type::ANY),
                        },
                        ObjectMemberNode::Raw(text) => ObjectMember::Raw(text.clone()),
                    })
                    .collect(),
            ),
            TypeNode::Parenthesized(inner) => self.type_from_node(inner, at),
            TypeNode::This => Type::This,
            TypeNode::Raw(text) => Type::Raw(text.clone()),
        }
    }

    fn function_params(&self, params: &[FunctionParam], at: DeclRef) -> Vec<FunctionTypeParam> {
        params
            .iter()
            .map(|p| FunctionTypeParam {
                name: p.name.clone(),
                optional: p.optional,
                rest: p.rest,
                ty: match (&p.ty, p.rest) {
                    (Some(ty), _) => self.type_from_node(ty, at),
                    (None, true) => Type::Array {
                        element: Box::new(Type::ANY),
                        readonly: false,
                    },
                    (None, false) => Type::ANY,
                },
            })
            .collect()
    }

    /// Declared or inferred type of one declaration.
    fn type_of_declaration(&self, at: DeclRef, depth: usize) -> Type {
        let decl = self.decl(at);
        match decl.kind {
            SyntaxKind::PropertyDeclaration
            | SyntaxKind::PropertySignature
            | SyntaxKind::Parameter
            | SyntaxKind::VariableDeclaration => {
                let base = if let Some(annotation) = &decl.type_annotation {
                    self.type_from_node(annotation, at)
                } else if let Some(initializer) = &decl.initializer {
                    let widen = !(decl.has_modifier(ModifierKind::Readonly)
                        || decl.has_modifier(ModifierKind::Const));
                    self.infer(initializer, at, widen, depth)
                } else if decl.dot_dot_dot_token {
                    Type::Array {
                        element: Box::new(Type::ANY),
                        readonly: false,
                    }
                } else {
                    Type::ANY
                };
                if decl.question_token && self.strict() {
                    Type::union(vec![base, Self::intrinsic(Intrinsic::Undefined)], true)
                } else {
                    base
                }
            }
            SyntaxKind::GetAccessor => match (&decl.type_annotation, &decl.body) {
                (Some(annotation), _) => self.type_from_node(annotation, at),
                (None, Some(body)) => self.infer_returns(body, at, depth),
                (None, None) => Type::ANY,
            },
            SyntaxKind::SetAccessor => decl
                .parameters
                .first()
                .and_then(|p| self.decl(at.sibling(*p)).type_annotation.as_ref())
                .map(|t| self.type_from_node(t, at))
                .unwrap_or(Type::ANY),
            SyntaxKind::EnumMember => match decl.parent {
                Some(parent) => {
                    let enum_ref = at.sibling(parent);
                    Type::Reference {
                        name: self.decl(enum_ref).name.clone().unwrap_or_default(),
                        symbol: self.binder().declared_symbol(enum_ref),
                        args: Vec::new(),
                    }
                }
                None => Type::ANY,
            },
            SyntaxKind::FunctionDeclaration
            | SyntaxKind::MethodDeclaration
            | SyntaxKind::MethodSignature => {
                let signature = self.signature_with_depth(at, depth);
                Type::Function(Box::new(FunctionType {
                    params: signature
                        .parameters
                        .iter()
                        .map(|p| {
                            let param = self.binder().symbol(*p);
                            let param_decl = param.declarations.first().map(|d| self.decl(*d));
                            FunctionTypeParam {
                                name: param.name.clone(),
                                optional: param_decl.map_or(false, |d| {
                                    d.question_token || d.initializer.is_some()
                                }),
                                rest: param_decl.map_or(false, |d| d.dot_dot_dot_token),
                                ty: param
                                    .declarations
                                    .first()
                                    .map(|d| self.type_of_declaration(*d, depth + 1))
                                    .unwrap_or(Type::ANY),
                            }
                        })
                        .collect(),
                    return_type: signature.return_type,
                    is_constructor: false,
                }))
            }
            SyntaxKind::ClassDeclaration
            | SyntaxKind::InterfaceDeclaration
            | SyntaxKind::EnumDeclaration
            | SyntaxKind::TypeAliasDeclaration => Type::Reference {
                name: decl.name.clone().unwrap_or_default(),
                symbol: self.binder().declared_symbol(at),
                args: Vec::new(),
            },
            _ => Type::ANY,
        }
    }

    fn signature_with_depth(&self, at: DeclRef, depth: usize) -> Signature {
        let decl = self.decl(at);
        let parameters = decl
            .parameters
            .iter()
            .filter_map(|p| self.binder().parameter_symbol(at.sibling(*p)))
            .collect();

        let return_type = match decl.kind {
            SyntaxKind::Constructor | SyntaxKind::ConstructSignature => match decl.parent {
                Some(parent) => self.type_of_declaration(at.sibling(parent), depth),
                None => Type::ANY,
            },
            SyntaxKind::SetAccessor => Type::VOID,
            _ => match (&decl.type_annotation, &decl.body) {
                (Some(annotation), _) => self.type_from_node(annotation, at),
                (None, Some(body)) => {
                    let inferred = self.infer_returns(body, at, depth);
                    if decl.has_modifier(ModifierKind::Async) {
                        self.promise_of(inferred, at)
                    } else {
                        inferred
                    }
                }
                (None, None) => Type::ANY,
            },
        };

        Signature {
            parameters,
            return_type,
        }
    }

    fn promise_of(&self, inner: Type, at: DeclRef) -> Type {
        self.reference("Promise", at, vec![inner])
    }

    /// Union of the widened types of every valued `return`.
    fn infer_returns(&self, body: &Body, at: DeclRef, depth: usize) -> Type {
        if body.is_generator {
            return Type::ANY;
        }
        let mut types: Vec<Type> = body
            .returns
            .iter()
            .flatten()
            .map(|expr| self.infer(expr, at, true, depth))
            .collect();
        if types.is_empty() {
            return Type::VOID;
        }
        if body.returns.iter().any(Option::is_none) {
            types.push(Self::intrinsic(Intrinsic::Undefined));
        }
        Type::union(types, self.strict())
    }

    /// Infer the type of an expression appearing at `at`.
    pub fn infer(&self, expr: &Expr, at: DeclRef, widen: bool, depth: usize) -> Type {
        let literal = |text: String| {
            let ty = Type::Literal(text);
            if widen {
                ty.widened()
            } else {
                ty
            }
        };

        match expr {
            Expr::Number(text) => literal(text.clone()),
            Expr::String(text) => literal(format!("\"{text}\"")),
            Expr::Bool(value) => literal(value.to_string()),
            Expr::Template => Self::intrinsic(Intrinsic::String),
            Expr::Null => self.nullish(Intrinsic::Null),
            Expr::Undefined => self.nullish(Intrinsic::Undefined),
            Expr::New { callee, type_args } => {
                let args: Vec<Type> = type_args.iter().map(|t| self.type_from_node(t, at)).collect();
                if callee == "Array" {
                    return Type::Array {
                        element: Box::new(args.into_iter().next().unwrap_or(Type::ANY)),
                        readonly: false,
                    };
                }
                self.reference(callee, at, args)
            }
            Expr::Array(elements) => {
                let element = if elements.is_empty() {
                    if self.strict() {
                        Self::intrinsic(Intrinsic::Never)
                    } else {
                        Type::ANY
                    }
                } else {
                    Type::union(
                        elements.iter().map(|e| self.infer(e, at, true, depth)).collect(),
                        self.strict(),
                    )
                };
                Type::Array {
                    element: Box::new(element),
                    readonly: false,
                }
            }
            Expr::Object(properties) => Type::Object(
                properties
                    .iter()
                    .map(|(name, value)| ObjectMember::Property {
                        name: name.clone(),
                        optional: false,
                        readonly: false,
                        ty: self.infer(value, at, true, depth),
                    })
                    .collect(),
            ),
            Expr::Function {
                params,
                return_type,
                expression_body,
                is_async,
            } => {
                let returned = match (return_type, expression_body) {
                    (Some(annotation), _) => self.type_from_node(annotation, at),
                    (None, Some(body)) => self.infer(body, at, true, depth),
                    (None, None) => Type::ANY,
                };
                let returned = if *is_async && return_type.is_none() {
                    self.promise_of(returned, at)
                } else {
                    returned
                };
                Type::Function(Box::new(FunctionType {
                    params: self.function_params(params, at),
                    return_type: returned,
                    is_constructor: false,
                }))
            }
            Expr::Assertion(annotation) => self.type_from_node(annotation, at),
            Expr::Unary { operator, operand } => match operator.as_str() {
                "-" => match (operand.as_ref(), widen) {
                    (Expr::Number(text), false) => Type::Literal(format!("-{text}")),
                    _ => Self::intrinsic(Intrinsic::Number),
                },
                "+" | "~" => Self::intrinsic(Intrinsic::Number),
                "!" => Self::intrinsic(Intrinsic::Boolean),
                "typeof" => Self::intrinsic(Intrinsic::String),
                "void" => self.nullish(Intrinsic::Undefined),
                _ => Type::ANY,
            },
            Expr::Binary {
                operator,
                left,
                right,
            } => {
                let op = operator.as_str();
                if COMPARISON_OPERATORS.contains(&op) {
                    return Self::intrinsic(Intrinsic::Boolean);
                }
                if ARITHMETIC_OPERATORS.contains(&op) {
                    return Self::intrinsic(Intrinsic::Number);
                }
                let left = self.infer(left, at, true, depth);
                let right = self.infer(right, at, true, depth);
                match op {
                    "+" => {
                        let string = Self::intrinsic(Intrinsic::String);
                        let number = Self::intrinsic(Intrinsic::Number);
                        if left == string || right == string {
                            string
                        } else if left == number && right == number {
                            number
                        } else {
                            Type::ANY
                        }
                    }
                    "&&" => right,
                    "||" | "??" => Type::union(vec![left, right], self.strict()),
                    _ => Type::ANY,
                }
            }
            Expr::Member { object, property } if object == "this" => {
                let ty = self.this_member_type(property, at, depth);
                if widen {
                    ty.widened()
                } else {
                    ty
                }
            }
            Expr::Member { object, .. } => {
                let Some(symbol) = self.binder().resolve_entity_name(self.files(), at, object) else {
                    return Type::ANY;
                };
                let target = self.binder().resolve_alias(symbol).unwrap_or(symbol);
                if self.binder().symbol(target).kind == SymbolKind::Enum {
                    Type::Reference {
                        name: object.clone(),
                        symbol: Some(symbol),
                        args: Vec::new(),
                    }
                } else {
                    Type::ANY
                }
            }
            Expr::Identifier(name) => {
                let Some(symbol) = self.binder().resolve_value_name(self.files(), at, name) else {
                    return Type::ANY;
                };
                let target = self.binder().resolve_alias(symbol).unwrap_or(symbol);
                let resolved = self.binder().symbol(target);
                match resolved.kind {
                    SymbolKind::Class | SymbolKind::Enum => Type::Raw(format!("typeof {name}")),
                    SymbolKind::Variable
                    | SymbolKind::Parameter
                    | SymbolKind::Property
                    | SymbolKind::Function
                        if depth < MAX_INFERENCE_DEPTH =>
                    {
                        let ty = match resolved.declarations.first() {
                            Some(decl) => self.type_of_declaration(*decl, depth + 1),
                            None => Type::ANY,
                        };
                        if widen {
                            ty.widened()
                        } else {
                            ty
                        }
                    }
                    _ => Type::ANY,
                }
            }
            Expr::Other => Type::ANY,
        }
    }

    /// The declaration that decides a symbol's type; a getter wins for accessor pairs.
    fn value_declaration(&self, symbol: SymbolId) -> Option<DeclRef> {
        let resolved = self.binder().symbol(symbol);
        match resolved.kind {
            SymbolKind::Accessor => resolved
                .declarations
                .iter()
                .find(|d| self.decl(**d).kind == SyntaxKind::GetAccessor)
                .or_else(|| resolved.declarations.first())
                .copied(),
            _ => resolved.declarations.first().copied(),
        }
    }

    /// Type of `this.<name>` from inside a class member; statics see statics.
    fn this_member_type(&self, name: &str, at: DeclRef, depth: usize) -> Type {
        if depth >= MAX_INFERENCE_DEPTH {
            return Type::ANY;
        }
        let file = &self.files()[at.file.0 as usize];
        let mut is_static = false;
        let mut current = Some(at.node);
        while let Some(node) = current {
            let decl = file.decl(node);
            if decl.kind == SyntaxKind::ClassDeclaration {
                let Some(class) = self.binder().declared_symbol(at.sibling(node)) else {
                    return Type::ANY;
                };
                let class = self.binder().symbol(class);
                let table = if is_static { &class.exports } else { &class.members };
                return table
                    .get(name)
                    .and_then(|member| self.value_declaration(*member))
                    .map(|decl| self.type_of_declaration(decl, depth + 1))
                    .unwrap_or(Type::ANY);
            }
            is_static = decl.has_modifier(ModifierKind::Static);
            current = decl.parent;
        }
        Type::ANY
    }

    /// Namespaces enclosing a declaration, innermost first.
    fn enclosing_namespaces(&self, at: DeclRef) -> Vec<SymbolId> {
        let file = &self.files()[at.file.0 as usize];
        let mut namespaces = Vec::new();
        let mut current = Some(at.node);
        while let Some(node) = current {
            let decl = file.decl(node);
            if decl.kind == SyntaxKind::ModuleDeclaration {
                if let Some(symbol) = self.binder().declared_symbol(at.sibling(node)) {
                    namespaces.push(symbol);
                }
            }
            current = decl.parent;
        }
        namespaces
    }

    /// Namespaces containing a symbol, outermost first.
    fn namespace_chain(&self, symbol: SymbolId) -> Vec<SymbolId> {
        let mut chain = Vec::new();
        let mut current = self.binder().symbol(symbol).parent;
        while let Some(parent) = current {
            let parent_symbol = self.binder().symbol(parent);
            if !parent_symbol.is_namespace {
                break;
            }
            chain.push(parent);
            current = parent_symbol.parent;
        }
        chain.reverse();
        chain
    }

    /// Print a reference name qualified by the namespaces not already in scope.
    fn qualified_reference(&self, written: &str, symbol: Option<SymbolId>, enclosing: DeclRef) -> String {
        let Some(symbol) = symbol else {
            return written.to_string();
        };
        let Some(target) = self.binder().resolve_alias(symbol) else {
            return written.to_string();
        };
        let resolved = self.binder().symbol(target);
        match resolved.kind {
            SymbolKind::TypeParameter | SymbolKind::Builtin | SymbolKind::Module => {
                return written.to_string()
            }
            _ => {}
        }

        let in_scope = self.enclosing_namespaces(enclosing);
        let chain = self.namespace_chain(target);
        let mut parts: Vec<&str> = chain
            .iter()
            .skip_while(|ns| in_scope.contains(ns))
            .map(|ns| self.binder().symbol(*ns).name.as_str())
            .collect();
        parts.push(resolved.name.as_str());
        parts.join(".")
    }

    fn aliased_type_of(&self, symbol: SymbolId) -> Option<Type> {
        let resolved = self.binder().symbol(symbol);
        if resolved.kind != SymbolKind::TypeAlias {
            return None;
        }
        resolved
            .declarations
            .iter()
            .find(|d| self.decl(**d).kind == SyntaxKind::TypeAliasDeclaration)
            .and_then(|d| self.declared_type(*d))
    }

    fn type_arguments_with_depth(&self, ty: &Type, depth: usize) -> Vec<Type> {
        match ty {
            Type::Array { element, .. } => vec![element.as_ref().clone()],
            Type::Reference { args, .. } if !args.is_empty() => args.clone(),
            Type::Reference {
                symbol: Some(symbol),
                ..
            } if depth < MAX_INFERENCE_DEPTH => self
                .binder()
                .resolve_alias(*symbol)
                .and_then(|target| self.aliased_type_of(target))
                .map(|aliased| self.type_arguments_with_depth(&aliased, depth + 1))
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn type_symbol_with_depth(&self, ty: &Type, depth: usize) -> Option<SymbolId> {
        match ty {
            Type::Array { readonly, .. } => self
                .binder()
                .builtin(if *readonly { "ReadonlyArray" } else { "Array" }),
            Type::Reference {
                symbol: Some(symbol),
                ..
            } => {
                let target = self.binder().resolve_alias(*symbol)?;
                match self.aliased_type_of(target) {
                    Some(aliased) if depth < MAX_INFERENCE_DEPTH => {
                        self.type_symbol_with_depth(&aliased, depth + 1)
                    }
                    Some(_) => None,
                    None => Some(target),
                }
            }
            _ => None,
        }
    }
}

impl TypeQuery for Checker<'_> {
    fn file_name(&self, file: FileId) -> &str {
        &self.files()[file.0 as usize].path
    }

    fn statements(&self, file: FileId) -> Vec<DeclRef> {
        self.files()[file.0 as usize]
            .statements
            .iter()
            .map(|node| DeclRef::new(file, *node))
            .collect()
    }

    fn declaration(&self, decl: DeclRef) -> &Decl {
        self.decl(decl)
    }

    fn child_declarations(&self, decl: DeclRef) -> Vec<DeclRef> {
        self.decl(decl)
            .members
            .iter()
            .map(|node| decl.sibling(*node))
            .collect()
    }

    fn symbol(&self, symbol: SymbolId) -> &Symbol {
        self.binder().symbol(symbol)
    }

    fn symbol_at_declaration(&self, decl: DeclRef) -> Option<SymbolId> {
        self.binder().declared_symbol(decl)
    }

    fn resolve_entity_name(&self, at: DeclRef, name: &str) -> Option<SymbolId> {
        self.binder().resolve_entity_name(self.files(), at, name)
    }

    fn aliased_symbol(&self, symbol: SymbolId) -> Option<SymbolId> {
        self.binder().resolve_alias(symbol)
    }

    fn members(&self, symbol: SymbolId) -> Vec<SymbolId> {
        self.binder().symbol(symbol).members.values().copied().collect()
    }

    fn exports(&self, symbol: SymbolId) -> Vec<SymbolId> {
        self.binder().symbol(symbol).exports.values().copied().collect()
    }

    fn fully_qualified_name(&self, symbol: SymbolId) -> String {
        let mut parts: Vec<&str> = self
            .namespace_chain(symbol)
            .iter()
            .map(|ns| self.binder().symbol(*ns).name.as_str())
            .collect();
        parts.push(self.binder().symbol(symbol).name.as_str());
        parts.join(".")
    }

    // Types do not depend on the use site: generic instantiation is not modelled.
    fn type_of_symbol_at_location(&self, symbol: SymbolId, _at: DeclRef) -> Type {
        let Some(target) = self.binder().resolve_alias(symbol) else {
            return Type::ANY;
        };
        let resolved = self.binder().symbol(target);
        match self.value_declaration(target) {
            Some(decl) => self.type_of_declaration(decl, 0),
            None => Type::Reference {
                name: resolved.name.clone(),
                symbol: Some(target),
                args: Vec::new(),
            },
        }
    }

    fn declared_type(&self, decl: DeclRef) -> Option<Type> {
        self.decl(decl)
            .type_annotation
            .as_ref()
            .map(|annotation| self.type_from_node(annotation, decl))
    }

    fn signature(&self, decl: DeclRef) -> Signature {
        self.signature_with_depth(decl, 0)
    }

    fn type_to_string(&self, ty: &Type, enclosing: DeclRef) -> String {
        let qualify = |name: &str, symbol: Option<SymbolId>| {
            self.qualified_reference(name, symbol, enclosing)
        };
        TypePrinter::new(&qualify).print(ty)
    }

    fn type_symbol(&self, ty: &Type) -> Option<SymbolId> {
        self.type_symbol_with_depth(ty, 0)
    }

    fn type_arguments(&self, ty: &Type) -> Vec<Type> {
        self.type_arguments_with_depth(ty, 0)
    }
}
