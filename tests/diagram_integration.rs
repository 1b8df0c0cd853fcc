//! Integration tests for the full diagram pipeline.
//!
//! These tests load the testdata fixtures from disk, build the model and
//! compare the rendered documents line by line.

use std::path::PathBuf;

use tsplant::cli;
use tsplant::{CompilerOptions, OutputFormat, RenderOptions};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn generate(inputs: &[&str], options: &RenderOptions) -> String {
    let files: Vec<PathBuf> = inputs.iter().map(|i| testdata_path().join(i)).collect();
    cli::generate(&files, CompilerOptions::default(), options).expect("diagram should render")
}

fn plant(lines: &[&str]) -> String {
    let mut document = vec!["@startuml"];
    document.extend_from_slice(lines);
    document.push("@enduml");
    document.join("\n")
}

// =============================================================================
// PlantUML documents
// =============================================================================

#[test]
fn test_greeter() {
    assert_eq!(
        generate(&["classes/Greeter.ts"], &RenderOptions::default()),
        plant(&[
            "class Greeter {",
            "    +greeting: string",
            "    +greet(): string",
            "}",
        ])
    );
}

#[test]
fn test_inheritance_follows_imports() {
    assert_eq!(
        generate(&["inheritance/index.ts"], &RenderOptions::default()),
        plant(&[
            "class Animal {",
            "    +name: string",
            "    +move(distanceInMeters?: number): void",
            "}",
            "class Horse extends Animal {",
            "    +move(distanceInMeters?: number): void",
            "}",
            "class Snake extends Animal {",
            "    +move(distanceInMeters?: number): void",
            "}",
        ])
    );
}

#[test]
fn test_abstract_class() {
    assert_eq!(
        generate(&["abstract/AbstractClass.ts"], &RenderOptions::default()),
        plant(&[
            "abstract class AbstractClass {",
            "    +{abstract} ToTest(): any",
            "}",
        ])
    );
}

#[test]
fn test_enum() {
    assert_eq!(
        generate(&["enum/Enum.ts"], &RenderOptions::default()),
        plant(&["enum Semaphore {", "    RED", "    GREEN", "    YELLOW", "}"])
    );
}

#[test]
fn test_scene_members_and_statics() {
    assert_eq!(
        generate(&["scene/scene.ts"], &RenderOptions::default()),
        plant(&[
            "class Vector {",
            "    +x: number",
            "    +y: number",
            "    +{static} plus(v1: Vector, v2: Vector): Vector",
            "}",
            "interface Ray {",
            "    +start: Vector",
            "    +dir: Vector",
            "}",
            "interface Thing {",
            "    +intersect: (ray: Ray) => number",
            "    +center: Vector",
            "}",
            "class Sphere implements Thing {",
            "    +center: Vector",
            "    +radius: number",
            "    +intersect(ray: Ray): number",
            "}",
            "class Scene {",
            "    +things: Thing[]",
            "    +camera: Vector",
            "}",
        ])
    );
}

#[test]
fn test_namespaces_nest_and_qualify_heritage() {
    assert_eq!(
        generate(&["namespaces/shapes.ts"], &RenderOptions::default()),
        plant(&[
            "namespace Shapes {",
            "    interface Shape {",
            "        +area(): number",
            "    }",
            "    class Square implements Shapes.Shape {",
            "        +side: number",
            "        +area(): number",
            "    }",
            "    namespace Solid {",
            "        class Cube extends Shapes.Square {",
            "        }",
            "    }",
            "}",
        ])
    );
}

#[test]
fn test_reexported_alias_resolves_to_declaring_file() {
    assert_eq!(
        generate(&["reexports/zoo.ts"], &RenderOptions::default()),
        plant(&[
            "class Animal {",
            "    +name: string",
            "}",
            "class Zebra extends Animal {",
            "    +stripes: number",
            "}",
        ])
    );
}

#[test]
fn test_output_is_deterministic() {
    let options = RenderOptions {
        associations: true,
        colored_lines: true,
        ..RenderOptions::default()
    };
    let first = generate(&["scene/scene.ts", "inheritance/index.ts"], &options);
    let second = generate(&["scene/scene.ts", "inheritance/index.ts"], &options);
    assert_eq!(first, second);
}

// =============================================================================
// Associations and filters
// =============================================================================

fn associations(document: &str) -> Vec<&str> {
    document.lines().filter(|l| l.contains("-->") || l.contains("]->")).collect()
}

#[test]
fn test_node_associations() {
    let options = RenderOptions {
        associations: true,
        ..RenderOptions::default()
    };
    let document = generate(&["scene/scene.ts"], &options);
    assert_eq!(
        associations(&document),
        vec![
            "Ray --> Vector",
            "Thing --> Vector",
            "Sphere --> Vector",
            "Sphere --> Ray",
            "Scene --> \"*\" Thing",
            "Scene --> Vector",
        ]
    );
}

#[test]
fn test_field_associations() {
    let options = RenderOptions {
        field_associations: true,
        ..RenderOptions::default()
    };
    let document = generate(&["scene/scene.ts"], &options);
    let edges = associations(&document);
    assert!(edges.contains(&"Ray::start --> Vector"));
    assert!(edges.contains(&"Ray::dir --> Vector"));
    assert!(edges.contains(&"Sphere::intersect --> Ray"));
    assert!(edges.contains(&"Scene::things --> \"*\" Thing"));
    // Static methods using their own class produce no edge.
    assert!(!edges.iter().any(|e| e.starts_with("Vector")));
}

#[test]
fn test_colored_lines() {
    let options = RenderOptions {
        associations: true,
        colored_lines: true,
        ..RenderOptions::default()
    };
    let document = generate(&["scene/scene.ts"], &options);
    let edges = associations(&document);
    assert_eq!(edges[0], "Ray -[#1f77b4]-> Vector");
    assert_eq!(edges[1], "Thing -[#ff7f0e]-> Vector");
}

#[test]
fn test_only_interfaces() {
    let options = RenderOptions {
        only_interfaces: true,
        ..RenderOptions::default()
    };
    let document = generate(&["scene/scene.ts"], &options);
    let headers: Vec<&str> = document.lines().filter(|l| l.ends_with('{')).collect();
    assert_eq!(headers, vec!["interface Ray {", "interface Thing {"]);
}

#[test]
fn test_only_classes_drops_interface_heritage() {
    let options = RenderOptions {
        only_classes: true,
        ..RenderOptions::default()
    };
    let document = generate(&["scene/scene.ts"], &options);
    assert!(document.contains("class Sphere {"));
    assert!(!document.contains("interface"));
}

#[test]
fn test_target_class_hierarchy() {
    let options = RenderOptions {
        target_class: Some("Thing".to_string()),
        ..RenderOptions::default()
    };
    let document = generate(&["scene/scene.ts"], &options);
    let headers: Vec<&str> = document.lines().filter(|l| l.ends_with('{')).collect();
    assert_eq!(headers, vec!["interface Thing {", "class Sphere implements Thing {"]);
}

#[test]
fn test_target_class_keeps_ancestors() {
    let options = RenderOptions {
        target_class: Some("Horse".to_string()),
        ..RenderOptions::default()
    };
    let document = generate(&["inheritance/index.ts"], &options);
    let headers: Vec<&str> = document.lines().filter(|l| l.ends_with('{')).collect();
    assert_eq!(headers, vec!["class Animal {", "class Horse extends Animal {"]);
}

#[test]
fn test_conflicting_filters_are_rejected() {
    let files = vec![testdata_path().join("scene/scene.ts")];
    let options = RenderOptions {
        only_classes: true,
        only_interfaces: true,
        ..RenderOptions::default()
    };
    assert!(cli::generate(&files, CompilerOptions::default(), &options).is_err());
}

// =============================================================================
// Mermaid documents
// =============================================================================

#[test]
fn test_mermaid_class_diagram() {
    let options = RenderOptions {
        format: OutputFormat::Mermaid,
        associations: true,
        ..RenderOptions::default()
    };
    let document = generate(&["scene/scene.ts"], &options);
    let lines: Vec<&str> = document.lines().collect();
    assert_eq!(lines[0], "classDiagram");
    assert!(lines.contains(&"class Thing {"));
    assert!(lines.contains(&"    <<interface>>"));
    assert!(lines.contains(&"    +plus(v1: Vector, v2: Vector) Vector$"));
    assert!(lines.contains(&"Thing <|.. Sphere"));
    assert!(lines.contains(&"Scene --> \"*\" Thing"));
}

#[test]
fn test_mermaid_flattens_namespaces() {
    let options = RenderOptions {
        format: OutputFormat::Mermaid,
        ..RenderOptions::default()
    };
    let document = generate(&["namespaces/shapes.ts"], &options);
    let lines: Vec<&str> = document.lines().collect();
    assert!(lines.contains(&"namespace Shapes {"));
    assert!(lines.contains(&"    class Shapes_Solid_Cube {"));
    assert!(lines.contains(&"Shapes_Square <|-- Shapes_Solid_Cube"));
    assert!(lines.contains(&"Shapes_Shape <|.. Shapes_Square"));
}
