//! Member classification over declaration kinds.

use crate::analysis::{Decl, SyntaxKind};

/// What a container member becomes in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberClass {
    Constructor,
    Method,
    Property,
    TypeParameter,
}

pub fn is_constructor(decl: &Decl) -> bool {
    decl.kind == SyntaxKind::Constructor
}

pub fn is_method(decl: &Decl) -> bool {
    matches!(
        decl.kind,
        SyntaxKind::MethodDeclaration | SyntaxKind::MethodSignature
    )
}

/// Fields, property signatures, accessors and constructor parameter properties.
pub fn is_property(decl: &Decl) -> bool {
    matches!(
        decl.kind,
        SyntaxKind::PropertyDeclaration
            | SyntaxKind::PropertySignature
            | SyntaxKind::GetAccessor
            | SyntaxKind::SetAccessor
            | SyntaxKind::Parameter
    )
}

pub fn is_type_parameter(decl: &Decl) -> bool {
    decl.kind == SyntaxKind::TypeParameter
}

/// Classify a member declaration. Kinds the model has no place for
/// (index signatures, static blocks, ...) yield `None`.
pub fn classify(decl: &Decl) -> Option<MemberClass> {
    if is_constructor(decl) {
        Some(MemberClass::Constructor)
    } else if is_method(decl) {
        Some(MemberClass::Method)
    } else if is_property(decl) {
        Some(MemberClass::Property)
    } else if is_type_parameter(decl) {
        Some(MemberClass::TypeParameter)
    } else {
        None
    }
}
