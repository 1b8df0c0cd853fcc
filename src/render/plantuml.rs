//! PlantUML class diagram output.

use super::{Association, Diagram, Formatter};
use crate::model::{
    Class, Component, Enum, HeritagePair, Interface, Member, Method, Namespace, Parameter,
    Property, TypeParameter,
};

const INDENT: &str = "    ";

pub struct PlantUmlFormatter;

impl Formatter for PlantUmlFormatter {
    fn format(&self, diagram: &Diagram) -> Vec<String> {
        let mut lines = vec!["@startuml".to_string()];
        for component in &diagram.components {
            lines.extend(component_lines(component));
        }
        lines.extend(diagram.associations.iter().map(association_line));
        lines.push("@enduml".to_string());
        lines
    }
}

fn component_lines(component: &Component) -> Vec<String> {
    match component {
        Component::Class(class) => class_lines(class),
        Component::Interface(interface) => interface_lines(interface),
        Component::Enum(enumeration) => enum_lines(enumeration),
        Component::Namespace(namespace) => namespace_lines(namespace),
        // PlantUML has no element for free functions.
        Component::Function(_) => Vec::new(),
    }
}

fn type_parameters(params: &[TypeParameter]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = params
        .iter()
        .map(|p| match &p.constraint {
            Some(constraint) => format!("{} extends {}", p.name, constraint),
            None => p.name.clone(),
        })
        .collect();
    format!("<{}>", rendered.join(", "))
}

fn heritage(keyword: &str, pairs: &[HeritagePair]) -> String {
    let names: Vec<&str> = pairs
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.name.as_str())
        .collect();
    if names.is_empty() {
        String::new()
    } else {
        format!(" {} {}", keyword, names.join(", "))
    }
}

fn block(header: String, body: Vec<String>) -> Vec<String> {
    let mut lines = vec![format!("{} {{", header)];
    lines.extend(body.into_iter().map(|line| format!("{}{}", INDENT, line)));
    lines.push("}".to_string());
    lines
}

fn class_lines(class: &Class) -> Vec<String> {
    let keyword = if class.is_abstract { "abstract class" } else { "class" };
    let header = format!(
        "{} {}{}{}{}",
        keyword,
        class.name,
        type_parameters(&class.type_parameters),
        heritage("extends", &class.extends),
        heritage("implements", &class.implements),
    );
    block(header, class.members.iter().map(member_line).collect())
}

fn interface_lines(interface: &Interface) -> Vec<String> {
    let header = format!(
        "interface {}{}{}",
        interface.name,
        type_parameters(&interface.type_parameters),
        heritage("extends", &interface.extends),
    );
    block(header, interface.members.iter().map(member_line).collect())
}

fn enum_lines(enumeration: &Enum) -> Vec<String> {
    block(
        format!("enum {}", enumeration.name),
        enumeration.members.iter().map(|m| m.name.clone()).collect(),
    )
}

fn namespace_lines(namespace: &Namespace) -> Vec<String> {
    block(
        format!("namespace {}", namespace.name),
        namespace.parts.iter().flat_map(component_lines).collect(),
    )
}

fn member_line(member: &Member) -> String {
    match member {
        Member::Property(property) => property_line(property),
        Member::Method(method) => method_line(method),
    }
}

fn optional(flag: bool) -> &'static str {
    if flag {
        "?"
    } else {
        ""
    }
}

fn property_line(property: &Property) -> String {
    format!(
        "{}{}{}{}: {}",
        property.visibility.glyph(),
        if property.is_static { "{static} " } else { "" },
        property.name,
        optional(property.is_optional),
        property.property_type,
    )
}

fn parameter(param: &Parameter) -> String {
    format!(
        "{}{}: {}",
        param.name,
        optional(param.is_optional || param.has_initializer),
        param.parameter_type
    )
}

fn method_line(method: &Method) -> String {
    let params: Vec<String> = method.parameters.iter().map(parameter).collect();
    format!(
        "{}{}{}{}{}({}): {}",
        method.visibility.glyph(),
        if method.is_static { "{static} " } else { "" },
        if method.is_abstract { "{abstract} " } else { "" },
        method.name,
        optional(method.is_optional),
        params.join(", "),
        method.return_type,
    )
}

fn association_line(edge: &Association) -> String {
    let source = match &edge.member {
        Some(member) => format!("{}::{}", edge.source, member),
        None => edge.source.clone(),
    };
    let arrow = match edge.color {
        Some(color) => format!("-[{}]->", color),
        None => "-->".to_string(),
    };
    let cardinality = if edge.many { " \"*\"" } else { "" };
    format!("{} {}{} {}", source, arrow, cardinality, edge.target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnumMember, Visibility};

    fn method(name: &str, params: Vec<Parameter>, ret: &str) -> Method {
        Method {
            name: name.to_string(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            is_optional: false,
            parameters: params,
            return_type: ret.to_string(),
            return_origin: None,
        }
    }

    fn param(name: &str, ty: &str, has_initializer: bool) -> Parameter {
        Parameter {
            name: name.to_string(),
            parameter_type: ty.to_string(),
            origin: None,
            is_optional: false,
            has_initializer,
        }
    }

    #[test]
    fn test_enum_block() {
        let diagram = Diagram {
            components: vec![Component::Enum(Enum {
                name: "Semaphore".to_string(),
                file: "enum.ts".to_string(),
                members: ["RED", "GREEN", "YELLOW"]
                    .iter()
                    .map(|n| EnumMember {
                        name: n.to_string(),
                        value: None,
                    })
                    .collect(),
            })],
            associations: Vec::new(),
        };
        assert_eq!(
            PlantUmlFormatter.format(&diagram).join("\n"),
            "@startuml\nenum Semaphore {\n    RED\n    GREEN\n    YELLOW\n}\n@enduml"
        );
    }

    #[test]
    fn test_member_markers() {
        let mut abstract_method = method("ToTest", Vec::new(), "any");
        abstract_method.is_abstract = true;
        assert_eq!(method_line(&abstract_method), "+{abstract} ToTest(): any");

        let mut static_method = method("times", vec![param("k", "number", false)], "Vector");
        static_method.is_static = true;
        static_method.visibility = Visibility::Protected;
        assert_eq!(method_line(&static_method), "#{static} times(k: number): Vector");

        let defaulted = method("move", vec![param("distanceInMeters", "number", true)], "void");
        assert_eq!(method_line(&defaulted), "+move(distanceInMeters?: number): void");

        let property = Property {
            name: "maxDepth".to_string(),
            visibility: Visibility::Private,
            is_static: false,
            is_optional: true,
            has_initializer: false,
            property_type: "number".to_string(),
            origin: None,
        };
        assert_eq!(property_line(&property), "-maxDepth?: number");
    }

    #[test]
    fn test_class_header() {
        let class = Class {
            name: "Plane".to_string(),
            file: "plane.ts".to_string(),
            visibility: Visibility::Public,
            is_abstract: false,
            type_parameters: vec![TypeParameter {
                name: "T".to_string(),
                constraint: Some("Surface".to_string()),
            }],
            constructors: Vec::new(),
            members: Vec::new(),
            extends: vec![HeritagePair::new("Shape", "shape.ts")],
            implements: vec![
                HeritagePair::new("Thing", "thing.ts"),
                HeritagePair::default(),
            ],
        };
        assert_eq!(
            class_lines(&class),
            vec!["class Plane<T extends Surface> extends Shape implements Thing {", "}"]
        );
    }

    #[test]
    fn test_association_lines() {
        let edge = Association {
            source: "Scene".to_string(),
            member: None,
            target: "Thing".to_string(),
            many: true,
            color: None,
        };
        assert_eq!(association_line(&edge), "Scene --> \"*\" Thing");

        let colored = Association {
            member: Some("camera".to_string()),
            target: "Camera".to_string(),
            many: false,
            color: Some("#1f77b4"),
            ..edge
        };
        assert_eq!(association_line(&colored), "Scene::camera -[#1f77b4]-> Camera");
    }
}
