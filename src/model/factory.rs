//! Component factories.
//!
//! Each factory turns one resolved symbol into one model node using only
//! the [`TypeQuery`] surface. Factories that need a name or declaration
//! they cannot find return `None` and the caller skips the node.

use tracing::debug;

use super::classify::{classify, MemberClass};
use super::{
    Class, Component, Enum, EnumMember, HeritagePair, Interface, Member, Method, Namespace,
    Parameter, Property, TypeOrigin, TypeParameter, Visibility,
};
use crate::analysis::{
    DeclRef, Decl, Expr, FileId, HeritageKind, ModifierKind, SymbolId, SymbolKind, SyntaxKind, Type,
    TypeQuery,
};

/// Library types whose element type is followed when resolving an origin.
const COLLECTION_TYPES: &[&str] = &["Array", "ReadonlyArray"];

/// Access modifier lookup order; the first one present wins.
const VISIBILITY_ORDER: [(ModifierKind, Visibility); 3] = [
    (ModifierKind::Private, Visibility::Private),
    (ModifierKind::Public, Visibility::Public),
    (ModifierKind::Protected, Visibility::Protected),
];

pub fn visibility_of(decl: &Decl) -> Visibility {
    VISIBILITY_ORDER
        .iter()
        .find(|(modifier, _)| decl.has_modifier(*modifier))
        .map(|(_, visibility)| *visibility)
        .unwrap_or_default()
}

/// File of the first declaration behind a symbol, one alias hop removed.
fn origin_file(query: &dyn TypeQuery, symbol: SymbolId) -> Option<String> {
    let target = query.aliased_symbol(symbol)?;
    let decl = query.symbol(target).declarations.first()?;
    Some(query.file_name(decl.file).to_string())
}

/// Resolve the declared origin of a type, unwrapping array element types.
pub fn type_origin(query: &dyn TypeQuery, ty: &Type) -> Option<TypeOrigin> {
    let mut current = ty.clone();
    let mut symbol = query.type_symbol(&current)?;
    let mut is_collection = false;

    loop {
        let resolved = query.symbol(symbol);
        if resolved.kind != SymbolKind::Builtin || !COLLECTION_TYPES.contains(&resolved.name.as_str()) {
            break;
        }
        current = query.type_arguments(&current).into_iter().next()?;
        symbol = query.type_symbol(&current)?;
        is_collection = true;
    }

    let target = query.aliased_symbol(symbol)?;
    if query.symbol(target).kind == SymbolKind::TypeParameter {
        return None;
    }
    Some(TypeOrigin {
        name: query.fully_qualified_name(target),
        file: origin_file(query, target)?,
        is_collection,
    })
}

/// Heritage pairs for the `extends` or `implements` clauses of a declaration.
pub fn heritage_pairs(query: &dyn TypeQuery, decl: DeclRef, kind: HeritageKind) -> Vec<HeritagePair> {
    query
        .declaration(decl)
        .heritage_types(kind)
        .map(|heritage| match query.resolve_entity_name(decl, &heritage.expression) {
            Some(symbol) => match query.aliased_symbol(symbol) {
                Some(target) => HeritagePair::new(
                    query.fully_qualified_name(target),
                    origin_file(query, target).unwrap_or_default(),
                ),
                // Imported from a module that was not loaded.
                None => HeritagePair::new(query.fully_qualified_name(symbol), ""),
            },
            None => {
                debug!(expression = %heritage.expression, "unresolved heritage type");
                HeritagePair::default()
            }
        })
        .collect()
}

pub fn create_parameter(query: &dyn TypeQuery, symbol: SymbolId) -> Option<Parameter> {
    let resolved = query.symbol(symbol);
    let decl_ref = *resolved.declarations.first()?;
    let decl = query.declaration(decl_ref);
    let ty = query.type_of_symbol_at_location(symbol, decl_ref);

    Some(Parameter {
        name: resolved.name.clone(),
        parameter_type: query.type_to_string(&ty, decl_ref),
        origin: type_origin(query, &ty),
        is_optional: decl.question_token,
        has_initializer: decl.initializer.is_some(),
    })
}

pub fn create_type_parameter(query: &dyn TypeQuery, symbol: SymbolId, decl: DeclRef) -> TypeParameter {
    TypeParameter {
        name: query.symbol(symbol).name.clone(),
        constraint: query
            .declared_type(decl)
            .map(|constraint| query.type_to_string(&constraint, decl)),
    }
}

pub fn create_property(query: &dyn TypeQuery, symbol: SymbolId, decl_ref: DeclRef) -> Property {
    let decl = query.declaration(decl_ref);
    let ty = query.type_of_symbol_at_location(symbol, decl_ref);

    Property {
        name: query.symbol(symbol).name.clone(),
        visibility: visibility_of(decl),
        is_static: decl.has_modifier(ModifierKind::Static),
        is_optional: decl.question_token,
        has_initializer: decl.initializer.is_some(),
        property_type: query.type_to_string(&ty, decl_ref),
        origin: type_origin(query, &ty),
    }
}

/// Build a method node; also used for constructors and top-level functions.
pub fn create_method(query: &dyn TypeQuery, symbol: SymbolId, decl_ref: DeclRef) -> Method {
    let decl = query.declaration(decl_ref);
    let signature = query.signature(decl_ref);
    let name = if decl.kind == SyntaxKind::Constructor {
        "constructor".to_string()
    } else {
        query.symbol(symbol).name.clone()
    };

    Method {
        name,
        visibility: visibility_of(decl),
        is_static: decl.has_modifier(ModifierKind::Static),
        is_abstract: decl.has_modifier(ModifierKind::Abstract),
        is_optional: decl.question_token,
        parameters: signature
            .parameters
            .iter()
            .filter_map(|param| create_parameter(query, *param))
            .collect(),
        return_type: query.type_to_string(&signature.return_type, decl_ref),
        return_origin: type_origin(query, &signature.return_type),
    }
}

/// True for the implementation of an overloaded function or method, which
/// is hidden behind its overload signatures.
pub(crate) fn is_overload_implementation(query: &dyn TypeQuery, symbol: SymbolId, decl: DeclRef) -> bool {
    if query.declaration(decl).body.is_none() {
        return false;
    }
    query.symbol(symbol).declarations.iter().any(|other| {
        let other_decl = query.declaration(*other);
        *other != decl
            && other_decl.kind == query.declaration(decl).kind
            && other_decl.body.is_none()
            && !other_decl.has_modifier(ModifierKind::Abstract)
    })
}

#[derive(Default)]
struct Serialized {
    type_parameters: Vec<TypeParameter>,
    constructors: Vec<Method>,
    members: Vec<Member>,
}

fn serialize_members(query: &dyn TypeQuery, symbols: &[SymbolId]) -> Serialized {
    let mut result = Serialized::default();

    for symbol in symbols {
        let mut has_property = false;
        for decl_ref in &query.symbol(*symbol).declarations {
            let decl = query.declaration(*decl_ref);
            match classify(decl) {
                Some(MemberClass::Constructor) => {
                    if !is_overload_implementation(query, *symbol, *decl_ref) {
                        result.constructors.push(create_method(query, *symbol, *decl_ref));
                    }
                }
                Some(MemberClass::Method) => {
                    if !is_overload_implementation(query, *symbol, *decl_ref) {
                        result
                            .members
                            .push(Member::Method(create_method(query, *symbol, *decl_ref)));
                    }
                }
                // Accessor pairs share one symbol and render once.
                Some(MemberClass::Property) if !has_property => {
                    has_property = true;
                    result
                        .members
                        .push(Member::Property(create_property(query, *symbol, *decl_ref)));
                }
                Some(MemberClass::Property) => {}
                Some(MemberClass::TypeParameter) => {
                    result
                        .type_parameters
                        .push(create_type_parameter(query, *symbol, *decl_ref));
                }
                None => debug!(kind = %decl.kind, "skipping member"),
            }
        }
    }
    result
}

fn first_declaration(query: &dyn TypeQuery, symbol: SymbolId, kind: SyntaxKind) -> Option<DeclRef> {
    query
        .symbol(symbol)
        .declarations
        .iter()
        .copied()
        .find(|decl| query.declaration(*decl).kind == kind)
}

/// Build a class from its symbol. Instance members come first, statics after.
pub fn create_class(query: &dyn TypeQuery, symbol: SymbolId) -> Option<Class> {
    let decl_ref = first_declaration(query, symbol, SyntaxKind::ClassDeclaration)?;
    let decl = query.declaration(decl_ref);

    let instance = serialize_members(query, &query.members(symbol));
    let statics = serialize_members(query, &query.exports(symbol));
    let mut members = instance.members;
    members.extend(statics.members);

    Some(Class {
        name: query.symbol(symbol).name.clone(),
        file: query.file_name(decl_ref.file).to_string(),
        visibility: visibility_of(decl),
        is_abstract: decl.has_modifier(ModifierKind::Abstract),
        type_parameters: instance.type_parameters,
        constructors: instance.constructors,
        members,
        extends: heritage_pairs(query, decl_ref, HeritageKind::Extends),
        implements: heritage_pairs(query, decl_ref, HeritageKind::Implements),
    })
}

/// Build an interface; merged declarations contribute members and heritage.
pub fn create_interface(query: &dyn TypeQuery, symbol: SymbolId) -> Option<Interface> {
    let declarations: Vec<DeclRef> = query
        .symbol(symbol)
        .declarations
        .iter()
        .copied()
        .filter(|decl| query.declaration(*decl).kind == SyntaxKind::InterfaceDeclaration)
        .collect();
    let first = *declarations.first()?;
    let serialized = serialize_members(query, &query.members(symbol));

    Some(Interface {
        name: query.symbol(symbol).name.clone(),
        file: query.file_name(first.file).to_string(),
        visibility: visibility_of(query.declaration(first)),
        type_parameters: serialized.type_parameters,
        members: serialized.members,
        extends: declarations
            .iter()
            .flat_map(|decl| heritage_pairs(query, *decl, HeritageKind::Extends))
            .collect(),
    })
}

fn literal_value(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Number(value) => Some(value.clone()),
        Expr::String(value) => Some(format!("\"{}\"", value)),
        Expr::Unary { operator, operand } if operator == "-" => match operand.as_ref() {
            Expr::Number(value) => Some(format!("-{}", value)),
            _ => None,
        },
        _ => None,
    }
}

pub fn create_enum(query: &dyn TypeQuery, symbol: SymbolId) -> Option<Enum> {
    let decl_ref = first_declaration(query, symbol, SyntaxKind::EnumDeclaration)?;
    let members = query
        .exports(symbol)
        .into_iter()
        .filter_map(|member| {
            let resolved = query.symbol(member);
            if resolved.kind != SymbolKind::EnumMember {
                return None;
            }
            let value = resolved
                .declarations
                .first()
                .and_then(|decl| query.declaration(*decl).initializer.as_ref())
                .and_then(literal_value);
            Some(EnumMember {
                name: resolved.name.clone(),
                value,
            })
        })
        .collect();

    Some(Enum {
        name: query.symbol(symbol).name.clone(),
        file: query.file_name(decl_ref.file).to_string(),
        members,
    })
}

/// Build a namespace from every body it has in `file`.
pub fn create_namespace(query: &dyn TypeQuery, symbol: SymbolId, file: FileId) -> Option<Namespace> {
    let bodies: Vec<DeclRef> = query
        .symbol(symbol)
        .declarations
        .iter()
        .copied()
        .filter(|decl| decl.file == file && query.declaration(*decl).kind == SyntaxKind::ModuleDeclaration)
        .collect();
    if bodies.is_empty() {
        return None;
    }

    let parts: Vec<Component> = bodies
        .iter()
        .flat_map(|body| super::build_statements(query, &query.child_declarations(*body)))
        .collect();

    Some(Namespace {
        name: query.symbol(symbol).name.clone(),
        file: query.file_name(file).to_string(),
        parts,
    })
}
