//! Mermaid `classDiagram` output.
//!
//! Mermaid namespaces cannot nest, so nested namespaces are flattened into
//! their outermost namespace and class ids are qualified names with `_` in
//! place of dots. Line colours are not supported.

use super::{walk, Association, Diagram, Formatter};
use crate::model::{Class, Component, Composite, Enum, Interface, Member, Method, Parameter, Property};

const INDENT: &str = "    ";

pub struct MermaidFormatter;

impl Formatter for MermaidFormatter {
    fn format(&self, diagram: &Diagram) -> Vec<String> {
        let mut lines = vec!["classDiagram".to_string()];
        for component in &diagram.components {
            match component {
                Component::Namespace(namespace) => {
                    let mut body = Vec::new();
                    walk(&namespace.parts, &mut |part, qualified| {
                        body.extend(component_lines(part, &format!("{}.{}", namespace.name, qualified)));
                    });
                    if !body.is_empty() {
                        lines.push(format!("namespace {} {{", identifier(&namespace.name)));
                        lines.extend(body.into_iter().map(|line| format!("{}{}", INDENT, line)));
                        lines.push("}".to_string());
                    }
                }
                other => lines.extend(component_lines(other, other.name())),
            }
        }

        walk(&diagram.components, &mut |component, qualified| {
            lines.extend(heritage_lines(component, qualified));
        });
        lines.extend(diagram.associations.iter().map(association_line));
        lines
    }
}

/// Mermaid class id for a qualified name.
fn identifier(qualified: &str) -> String {
    qualified.replace('.', "_")
}

/// Angle-bracket generics become Mermaid's `~T~`; arrows stay intact.
fn generics(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous = '\0';
    for c in text.chars() {
        match c {
            '<' => out.push('~'),
            '>' if previous != '=' => out.push('~'),
            _ => out.push(c),
        }
        previous = c;
    }
    out
}

fn component_lines(component: &Component, qualified: &str) -> Vec<String> {
    match component {
        Component::Class(class) => class_lines(class, qualified),
        Component::Interface(interface) => interface_lines(interface, qualified),
        Component::Enum(enumeration) => enum_lines(enumeration, qualified),
        Component::Namespace(_) | Component::Function(_) => Vec::new(),
    }
}

fn header(qualified: &str, type_parameters: &[String]) -> String {
    if type_parameters.is_empty() {
        format!("class {}", identifier(qualified))
    } else {
        format!("class {}~{}~", identifier(qualified), type_parameters.join(", "))
    }
}

fn block(header: String, annotation: Option<&str>, body: Vec<String>) -> Vec<String> {
    let mut lines = vec![format!("{} {{", header)];
    if let Some(annotation) = annotation {
        lines.push(format!("{}<<{}>>", INDENT, annotation));
    }
    lines.extend(body.into_iter().map(|line| format!("{}{}", INDENT, line)));
    lines.push("}".to_string());
    lines
}

fn class_lines(class: &Class, qualified: &str) -> Vec<String> {
    let params: Vec<String> = class.type_parameters.iter().map(|p| p.name.clone()).collect();
    block(
        header(qualified, &params),
        class.is_abstract.then_some("abstract"),
        class.members.iter().map(member_line).collect(),
    )
}

fn interface_lines(interface: &Interface, qualified: &str) -> Vec<String> {
    let params: Vec<String> = interface.type_parameters.iter().map(|p| p.name.clone()).collect();
    block(
        header(qualified, &params),
        Some("interface"),
        interface.members.iter().map(member_line).collect(),
    )
}

fn enum_lines(enumeration: &Enum, qualified: &str) -> Vec<String> {
    block(
        header(qualified, &[]),
        Some("enumeration"),
        enumeration.members.iter().map(|m| m.name.clone()).collect(),
    )
}

fn member_line(member: &Member) -> String {
    match member {
        Member::Property(property) => property_line(property),
        Member::Method(method) => method_line(method),
    }
}

fn property_line(property: &Property) -> String {
    format!(
        "{}{}{}: {}{}",
        property.visibility.glyph(),
        property.name,
        if property.is_optional { "?" } else { "" },
        generics(&property.property_type),
        if property.is_static { "$" } else { "" },
    )
}

fn parameter(param: &Parameter) -> String {
    format!(
        "{}{}: {}",
        param.name,
        if param.is_optional || param.has_initializer { "?" } else { "" },
        generics(&param.parameter_type)
    )
}

fn method_line(method: &Method) -> String {
    let params: Vec<String> = method.parameters.iter().map(parameter).collect();
    let classifier = if method.is_abstract {
        "*"
    } else if method.is_static {
        "$"
    } else {
        ""
    };
    format!(
        "{}{}({}) {}{}",
        method.visibility.glyph(),
        method.name,
        params.join(", "),
        generics(&method.return_type),
        classifier,
    )
}

/// Inheritance arrows point from the subtype to its supertype.
fn heritage_lines(component: &Component, qualified: &str) -> Vec<String> {
    let (extends, implements) = match component {
        Component::Class(class) => (&class.extends, class.implements.as_slice()),
        Component::Interface(interface) => (&interface.extends, &[][..]),
        _ => return Vec::new(),
    };
    let child = identifier(qualified);
    extends
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{} <|-- {}", identifier(&p.name), child))
        .chain(
            implements
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| format!("{} <|.. {}", identifier(&p.name), child)),
        )
        .collect()
}

fn association_line(edge: &Association) -> String {
    let cardinality = if edge.many { " \"*\"" } else { "" };
    let label = edge
        .member
        .as_ref()
        .map(|member| format!(" : {}", member))
        .unwrap_or_default();
    format!(
        "{} -->{} {}{}",
        identifier(&edge.source),
        cardinality,
        identifier(&edge.target),
        label
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeritagePair, Namespace, Visibility};

    fn class(name: &str, members: Vec<Member>, extends: Vec<HeritagePair>) -> Class {
        Class {
            name: name.to_string(),
            file: "zoo.ts".to_string(),
            visibility: Visibility::Public,
            is_abstract: false,
            type_parameters: Vec::new(),
            constructors: Vec::new(),
            members,
            extends,
            implements: Vec::new(),
        }
    }

    #[test]
    fn test_generics_keep_arrows() {
        assert_eq!(generics("Map<string, T[]>"), "Map~string, T[]~");
        assert_eq!(generics("(pos: Vector) => Color"), "(pos: Vector) => Color");
    }

    #[test]
    fn test_class_diagram() {
        let members = vec![
            Member::Property(Property {
                name: "name".to_string(),
                visibility: Visibility::Public,
                is_static: false,
                is_optional: false,
                has_initializer: false,
                property_type: "string".to_string(),
                origin: None,
            }),
            Member::Method(Method {
                name: "create".to_string(),
                visibility: Visibility::Public,
                is_static: true,
                is_abstract: false,
                is_optional: false,
                parameters: Vec::new(),
                return_type: "Animal".to_string(),
                return_origin: None,
            }),
        ];
        let diagram = Diagram {
            components: vec![
                Component::Class(class("Animal", members, Vec::new())),
                Component::Namespace(Namespace {
                    name: "Farm".to_string(),
                    file: "zoo.ts".to_string(),
                    parts: vec![Component::Class(class(
                        "Horse",
                        Vec::new(),
                        vec![HeritagePair::new("Animal", "zoo.ts")],
                    ))],
                }),
            ],
            associations: vec![Association {
                source: "Farm.Horse".to_string(),
                member: Some("rider".to_string()),
                target: "Animal".to_string(),
                many: true,
                color: Some("#1f77b4"),
            }],
        };
        assert_eq!(
            MermaidFormatter.format(&diagram),
            vec![
                "classDiagram",
                "class Animal {",
                "    +name: string",
                "    +create() Animal$",
                "}",
                "namespace Farm {",
                "    class Farm_Horse {",
                "    }",
                "}",
                "Animal <|-- Farm_Horse",
                "Farm_Horse --> \"*\" Animal : rider",
            ]
        );
    }
}
