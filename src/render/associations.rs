//! Association inference between modelled types.

use std::collections::HashSet;

use super::filter::TypeIndex;
use super::walk;
use crate::config::RenderOptions;
use crate::model::{Component, Member, Method, TypeOrigin};

/// Line colours for `coloredLines`, assigned by edge index (matplotlib tab10).
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationMode {
    Off,
    /// One edge per pair of types.
    Node,
    /// One edge per member and target type.
    Field,
}

impl AssociationMode {
    /// Field associations win when both options are set.
    pub fn from_options(options: &RenderOptions) -> Self {
        if options.field_associations {
            AssociationMode::Field
        } else if options.associations {
            AssociationMode::Node
        } else {
            AssociationMode::Off
        }
    }
}

/// An inferred "uses" edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    /// Qualified name of the owning type.
    pub source: String,
    /// Member the edge starts from, in field mode.
    pub member: Option<String>,
    /// Qualified name of the used type.
    pub target: String,
    /// The member held a collection of the target.
    pub many: bool,
    pub color: Option<&'static str>,
}

/// Type origins used by one member, in signature order.
fn member_origins(member: &Member) -> Vec<&TypeOrigin> {
    match member {
        Member::Property(property) => property.origin.iter().collect(),
        Member::Method(method) => method_origins(method),
    }
}

fn method_origins(method: &Method) -> Vec<&TypeOrigin> {
    method
        .parameters
        .iter()
        .filter_map(|p| p.origin.as_ref())
        .chain(method.return_origin.as_ref())
        .collect()
}

/// Infer association edges over a filtered model.
pub fn infer_associations(
    components: &[Component],
    index: &TypeIndex,
    options: &RenderOptions,
) -> Vec<Association> {
    let mode = AssociationMode::from_options(options);
    if mode == AssociationMode::Off {
        return Vec::new();
    }

    let mut edges: Vec<Association> = Vec::new();
    let mut seen: HashSet<(String, Option<String>, String)> = HashSet::new();
    let mut add = |source: &str, member: Option<&str>, origin: &TypeOrigin| {
        if origin.name == source || !index.contains(&origin.name, &origin.file) {
            return;
        }
        let member = match mode {
            AssociationMode::Field => member.map(str::to_string),
            _ => None,
        };
        if seen.insert((source.to_string(), member.clone(), origin.name.clone())) {
            edges.push(Association {
                source: source.to_string(),
                member,
                target: origin.name.clone(),
                many: origin.is_collection,
                color: None,
            });
        }
    };

    walk(components, &mut |component, qualified| {
        let (constructors, members) = match component {
            Component::Class(class) => (class.constructors.as_slice(), class.members.as_slice()),
            Component::Interface(interface) => (&[][..], interface.members.as_slice()),
            _ => return,
        };
        // Constructor parameters have no member line to start from.
        for constructor in constructors {
            for origin in method_origins(constructor) {
                add(qualified, None, origin);
            }
        }
        for member in members {
            for origin in member_origins(member) {
                add(qualified, Some(member.name()), origin);
            }
        }
    });

    if options.colored_lines {
        for (i, edge) in edges.iter_mut().enumerate() {
            edge.color = Some(PALETTE[i % PALETTE.len()]);
        }
    }
    edges
}
