//! Language-agnostic composite model of documented declarations.
//!
//! The model is built once per run by [`build_model`] and is read-only
//! afterwards. Containers keep their children in declaration order, which
//! is the order the renderers emit them in.

mod builder;
mod classify;
mod factory;

pub use builder::{build_model, build_statements, create, is_node_exported};
pub use classify::{classify, is_constructor, is_method, is_property, is_type_parameter, MemberClass};
pub use factory::{
    create_class, create_enum, create_interface, create_method, create_namespace,
    create_parameter, create_property, create_type_parameter, heritage_pairs, type_origin,
    visibility_of,
};

use std::fmt;

/// Member accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
        }
    }

    /// UML glyph shared by both output formats.
    pub fn glyph(self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Private => '-',
            Visibility::Protected => '#',
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the type used by a member was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeOrigin {
    /// Fully qualified name of the element type.
    pub name: String,
    /// File declaring the element type.
    pub file: String,
    /// Set when at least one array layer was unwrapped.
    pub is_collection: bool,
}

/// A `(qualifiedName, originFile)` pair for one extended or implemented type.
///
/// Both fields are empty when the heritage expression did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeritagePair {
    pub name: String,
    pub file: String,
}

impl HeritagePair {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub parameter_type: String,
    pub origin: Option<TypeOrigin>,
    pub is_optional: bool,
    pub has_initializer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub constraint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_optional: bool,
    pub has_initializer: bool,
    pub property_type: String,
    pub origin: Option<TypeOrigin>,
}

/// A method, constructor or top-level function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_optional: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub return_origin: Option<TypeOrigin>,
}

/// A class or interface member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Property(Property),
    Method(Method),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Property(p) => &p.name,
            Member::Method(m) => &m.name,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Member::Property(p) => p.is_static,
            Member::Method(m) => m.is_static,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub name: String,
    pub file: String,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub type_parameters: Vec<TypeParameter>,
    pub constructors: Vec<Method>,
    pub members: Vec<Member>,
    pub extends: Vec<HeritagePair>,
    pub implements: Vec<HeritagePair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub file: String,
    pub visibility: Visibility,
    pub type_parameters: Vec<TypeParameter>,
    pub members: Vec<Member>,
    pub extends: Vec<HeritagePair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    /// Initializer as written, when it is a literal.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub file: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub file: String,
    pub parts: Vec<Component>,
}

/// A top-level node of a module or namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Class(Class),
    Interface(Interface),
    Enum(Enum),
    Namespace(Namespace),
    Function(Method),
}

/// Variant tag of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Class,
    Interface,
    Enum,
    Namespace,
    Method,
    Property,
    Parameter,
    TypeParameter,
}

/// Behaviour shared by every node of the model.
pub trait Composite {
    fn name(&self) -> &str;

    fn kind(&self) -> ComponentKind;

    /// Origin file for nodes that are rendered as their own block.
    fn file(&self) -> Option<&str> {
        None
    }
}

macro_rules! composite {
    ($ty:ty, $kind:expr) => {
        impl Composite for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn kind(&self) -> ComponentKind {
                $kind
            }
        }
    };
    ($ty:ty, $kind:expr, file) => {
        impl Composite for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn kind(&self) -> ComponentKind {
                $kind
            }

            fn file(&self) -> Option<&str> {
                Some(&self.file)
            }
        }
    };
}

composite!(Class, ComponentKind::Class, file);
composite!(Interface, ComponentKind::Interface, file);
composite!(Enum, ComponentKind::Enum, file);
composite!(Namespace, ComponentKind::Namespace, file);
composite!(Method, ComponentKind::Method);
composite!(Property, ComponentKind::Property);
composite!(Parameter, ComponentKind::Parameter);
composite!(TypeParameter, ComponentKind::TypeParameter);

impl Composite for Component {
    fn name(&self) -> &str {
        match self {
            Component::Class(c) => c.name(),
            Component::Interface(i) => i.name(),
            Component::Enum(e) => e.name(),
            Component::Namespace(n) => n.name(),
            Component::Function(f) => f.name(),
        }
    }

    fn kind(&self) -> ComponentKind {
        match self {
            Component::Class(_) => ComponentKind::Class,
            Component::Interface(_) => ComponentKind::Interface,
            Component::Enum(_) => ComponentKind::Enum,
            Component::Namespace(_) => ComponentKind::Namespace,
            Component::Function(_) => ComponentKind::Method,
        }
    }

    fn file(&self) -> Option<&str> {
        match self {
            Component::Class(c) => c.file(),
            Component::Interface(i) => i.file(),
            Component::Enum(e) => e.file(),
            Component::Namespace(n) => n.file(),
            Component::Function(_) => None,
        }
    }
}

impl Component {
    /// Heritage pairs of a class or interface, extends first.
    pub fn heritage(&self) -> Vec<&HeritagePair> {
        match self {
            Component::Class(c) => c.extends.iter().chain(c.implements.iter()).collect(),
            Component::Interface(i) => i.extends.iter().collect(),
            _ => Vec::new(),
        }
    }
}
