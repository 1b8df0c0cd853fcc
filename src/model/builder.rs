//! Model builder: exported top-level declarations to components.

use std::collections::HashSet;

use tracing::{debug, info};

use super::factory::{
    create_class, create_enum, create_interface, create_method, create_namespace,
    is_overload_implementation,
};
use super::Component;
use crate::analysis::{DeclRef, FileId, ModifierKind, SymbolId, SyntaxKind, TypeQuery};

/// Whether a declaration is visible at its container's boundary: it carries
/// `export`, or it sits directly in a source file or a namespace body.
pub fn is_node_exported(query: &dyn TypeQuery, decl: DeclRef) -> bool {
    let declaration = query.declaration(decl);
    if declaration.has_modifier(ModifierKind::Export) {
        return true;
    }
    match declaration.parent {
        None => true,
        Some(parent) => query.declaration(decl.sibling(parent)).kind == SyntaxKind::ModuleDeclaration,
    }
}

/// Components for one file, in declaration order.
pub fn create(query: &dyn TypeQuery, file: FileId) -> Vec<Component> {
    let components = build_statements(query, &query.statements(file));
    debug!(file = query.file_name(file), components = components.len(), "built module");
    components
}

/// Components for a list of sibling statements.
///
/// Merged declarations (interfaces, namespaces) are emitted once, at the
/// first declaration of the merged symbol.
pub fn build_statements(query: &dyn TypeQuery, statements: &[DeclRef]) -> Vec<Component> {
    let mut emitted: HashSet<(SymbolId, SyntaxKind)> = HashSet::new();
    statements
        .iter()
        .filter(|stmt| is_node_exported(query, **stmt))
        .filter_map(|stmt| build_statement(query, *stmt, &mut emitted))
        .collect()
}

fn build_statement(
    query: &dyn TypeQuery,
    stmt: DeclRef,
    emitted: &mut HashSet<(SymbolId, SyntaxKind)>,
) -> Option<Component> {
    let decl = query.declaration(stmt);
    let kind = decl.kind;
    if !matches!(
        kind,
        SyntaxKind::ClassDeclaration
            | SyntaxKind::InterfaceDeclaration
            | SyntaxKind::ModuleDeclaration
            | SyntaxKind::EnumDeclaration
            | SyntaxKind::FunctionDeclaration
    ) {
        return None;
    }

    if decl.name.is_none() {
        debug!(kind = %kind, span = %decl.span, "skipping unnamed declaration");
        return None;
    }
    if kind == SyntaxKind::ModuleDeclaration && decl.name.as_deref().is_some_and(|n| n.starts_with('"')) {
        debug!(name = decl.name.as_deref(), span = %decl.span, "skipping ambient module declaration");
        return None;
    }
    let Some(symbol) = query.symbol_at_declaration(stmt) else {
        debug!(kind = %kind, span = %decl.span, "skipping unbound declaration");
        return None;
    };

    if kind == SyntaxKind::FunctionDeclaration {
        if is_overload_implementation(query, symbol, stmt) {
            return None;
        }
        return Some(Component::Function(create_method(query, symbol, stmt)));
    }
    if !emitted.insert((symbol, kind)) {
        return None;
    }

    match kind {
        SyntaxKind::ClassDeclaration => create_class(query, symbol).map(Component::Class),
        SyntaxKind::InterfaceDeclaration => create_interface(query, symbol).map(Component::Interface),
        SyntaxKind::ModuleDeclaration => {
            create_namespace(query, symbol, stmt.file).map(Component::Namespace)
        }
        SyntaxKind::EnumDeclaration => create_enum(query, symbol).map(Component::Enum),
        _ => None,
    }
}

/// The aggregated model over `files`, in the given order.
pub fn build_model(query: &dyn TypeQuery, files: &[FileId]) -> Vec<Component> {
    let model: Vec<Component> = files.iter().flat_map(|file| create(query, *file)).collect();
    info!(files = files.len(), components = model.len(), "model built");
    model
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::analysis::{AnalysisContext, MemoryHost};
    use crate::config::CompilerOptions;
    use crate::model::{Composite, HeritagePair, Member, Visibility};

    fn build(sources: &[(&str, &str)]) -> Vec<Component> {
        let host = sources
            .iter()
            .fold(MemoryHost::new(), |host, (path, text)| host.with_file(path, *text));
        let roots = vec![PathBuf::from(sources[0].0)];
        let ctx = AnalysisContext::load_with_host(&roots, CompilerOptions::default(), &host).unwrap();
        let checker = ctx.checker();
        build_model(&checker, &ctx.source_files())
    }

    fn member_names(members: &[Member]) -> Vec<&str> {
        members.iter().map(Member::name).collect()
    }

    #[test]
    fn test_greeter() {
        let model = build(&[(
            "greeter.ts",
            r#"class Greeter {
    greeting: string;
    constructor(message: string) {
        this.greeting = message;
    }
    greet() {
        return "Hello, " + this.greeting;
    }
}"#,
        )]);
        assert_eq!(model.len(), 1);
        let Component::Class(class) = &model[0] else {
            panic!("expected a class");
        };
        assert_eq!(class.name, "Greeter");
        assert_eq!(class.file, "greeter.ts");
        assert_eq!(member_names(&class.members), vec!["greeting", "greet"]);
        assert_eq!(class.constructors.len(), 1);
        assert_eq!(class.constructors[0].parameters[0].name, "message");

        let Member::Property(greeting) = &class.members[0] else {
            panic!("expected a property");
        };
        assert_eq!(greeting.property_type, "string");
        assert_eq!(greeting.visibility, Visibility::Public);
        let Member::Method(greet) = &class.members[1] else {
            panic!("expected a method");
        };
        assert_eq!(greet.return_type, "string");
        assert!(greet.parameters.is_empty());
    }

    #[test]
    fn test_statics_follow_instance_members() {
        let model = build(&[(
            "color.ts",
            r#"export class Color {
    static white = new Color(1, 1, 1);
    constructor(public r: number, public g: number, private b: number) {}
    static scale(k: number, v: Color) { return new Color(k * v.r, k * v.g, 0); }
    get brightness(): number { return 1; }
    set brightness(value: number) {}
}"#,
        )]);
        let Component::Class(class) = &model[0] else {
            panic!("expected a class");
        };
        assert_eq!(
            member_names(&class.members),
            vec!["r", "g", "b", "brightness", "white", "scale"]
        );
        assert!(class.members[4].is_static());
        assert!(!class.members[0].is_static());

        let Member::Property(b) = &class.members[2] else {
            panic!("expected a property");
        };
        assert_eq!(b.visibility, Visibility::Private);
        assert_eq!(b.property_type, "number");

        let Member::Property(white) = &class.members[4] else {
            panic!("expected a property");
        };
        assert_eq!(white.property_type, "Color");
        assert!(white.has_initializer);

        let Member::Method(scale) = &class.members[5] else {
            panic!("expected a method");
        };
        assert_eq!(scale.return_type, "Color");
        assert_eq!(scale.parameters[1].parameter_type, "Color");
        assert_eq!(scale.parameters[1].origin.as_ref().map(|o| o.name.as_str()), Some("Color"));
    }

    #[test]
    fn test_overload_signatures_replace_implementation() {
        let model = build(&[(
            "parser.ts",
            r#"export class Parser {
    parse(input: string): number;
    parse(input: number): number;
    parse(input: any): number { return 0; }
}
export function pick(a: string): string;
export function pick(a: number): number;
export function pick(a: any): any { return a; }"#,
        )]);
        assert_eq!(model.len(), 3);
        let Component::Class(class) = &model[0] else {
            panic!("expected a class");
        };
        let types: Vec<&str> = class
            .members
            .iter()
            .map(|m| match m {
                Member::Method(method) => method.parameters[0].parameter_type.as_str(),
                Member::Property(_) => "",
            })
            .collect();
        assert_eq!(types, vec!["string", "number"]);
        assert!(matches!(&model[1], Component::Function(f) if f.return_type == "string"));
        assert!(matches!(&model[2], Component::Function(f) if f.return_type == "number"));
    }

    #[test]
    fn test_namespaces_and_nested_declarations() {
        let model = build(&[(
            "shapes.ts",
            r#"export namespace Shapes {
    export class Circle { radius: number = 1; }
    interface Hidden {}
    namespace Inner { enum Kind { A } }
}
function helper() {
    class Local {}
    return new Local();
}
const value = 1;"#,
        )]);
        assert_eq!(model.len(), 2);
        let Component::Namespace(shapes) = &model[0] else {
            panic!("expected a namespace");
        };
        let names: Vec<&str> = shapes.parts.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Circle", "Hidden", "Inner"]);
        let Component::Namespace(inner) = &shapes.parts[2] else {
            panic!("expected a namespace");
        };
        assert!(matches!(&inner.parts[0], Component::Enum(e) if e.name == "Kind"));
        assert!(matches!(&model[1], Component::Function(f) if f.name == "helper"));
    }

    #[test]
    fn test_heritage_through_reexport() {
        let model = build(&[
            (
                "src/horse.ts",
                "import { Animal } from './index';\nexport class Horse extends Animal {}",
            ),
            ("src/index.ts", "export * from './animal';"),
            ("src/animal.ts", "export class Animal { name: string; }"),
        ]);
        let names: Vec<&str> = model.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Animal", "Horse"]);
        let Component::Class(horse) = &model[1] else {
            panic!("expected a class");
        };
        assert_eq!(horse.extends, vec![HeritagePair::new("Animal", "src/animal.ts")]);
        assert!(horse.members.is_empty());
    }

    #[test]
    fn test_unresolved_heritage_is_empty() {
        let model = build(&[(
            "errors.ts",
            "export class A extends Missing {}\nexport class B extends Error implements Missing {}",
        )]);
        let Component::Class(a) = &model[0] else {
            panic!("expected a class");
        };
        assert_eq!(a.extends, vec![HeritagePair::default()]);
        let Component::Class(b) = &model[1] else {
            panic!("expected a class");
        };
        assert_eq!(b.extends, vec![HeritagePair::new("Error", "")]);
        assert_eq!(b.implements, vec![HeritagePair::default()]);
    }

    #[test]
    fn test_collection_origins() {
        let model = build(&[(
            "scene.ts",
            r#"export class Thing {}
export class Scene {
    things: Thing[];
    lights: Array<Light>;
    main: Thing;
    names: string[];
}
export interface Light {}"#,
        )]);
        let Component::Class(scene) = &model[1] else {
            panic!("expected a class");
        };
        let properties: Vec<_> = scene
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Property(p) => Some(p),
                Member::Method(_) => None,
            })
            .collect();

        assert_eq!(properties[0].property_type, "Thing[]");
        let things = properties[0].origin.as_ref().unwrap();
        assert_eq!((things.name.as_str(), things.file.as_str()), ("Thing", "scene.ts"));
        assert!(things.is_collection);

        assert_eq!(properties[1].property_type, "Light[]");
        assert!(properties[1].origin.as_ref().is_some_and(|o| o.is_collection && o.name == "Light"));
        assert!(properties[2].origin.as_ref().is_some_and(|o| !o.is_collection));
        assert!(properties[3].origin.is_none());
    }

    #[test]
    fn test_visibility_and_abstract_members() {
        let model = build(&[(
            "base.ts",
            r#"export abstract class Base<T extends object> {
    private secret: string;
    protected shared = 1;
    abstract run(input?: T): void;
}"#,
        )]);
        let Component::Class(base) = &model[0] else {
            panic!("expected a class");
        };
        assert!(base.is_abstract);
        assert_eq!(base.type_parameters[0].name, "T");
        assert_eq!(base.type_parameters[0].constraint.as_deref(), Some("object"));

        let visibilities: Vec<Visibility> = base
            .members
            .iter()
            .map(|m| match m {
                Member::Property(p) => p.visibility,
                Member::Method(m) => m.visibility,
            })
            .collect();
        assert_eq!(
            visibilities,
            vec![Visibility::Private, Visibility::Protected, Visibility::Public]
        );
        let Member::Method(run) = &base.members[2] else {
            panic!("expected a method");
        };
        assert!(run.is_abstract);
        assert!(run.parameters[0].is_optional);
        assert_eq!(run.parameters[0].parameter_type, "T");
        assert!(run.parameters[0].origin.is_none());
    }

    #[test]
    fn test_enum_members_and_interface_merging() {
        let model = build(&[(
            "merge.ts",
            r#"enum Semaphore { RED, GREEN = 2, YELLOW = "y" }
interface Box { width: number; }
interface Box { height: number; }"#,
        )]);
        assert_eq!(model.len(), 2);
        let Component::Enum(semaphore) = &model[0] else {
            panic!("expected an enum");
        };
        let members: Vec<(&str, Option<&str>)> = semaphore
            .members
            .iter()
            .map(|m| (m.name.as_str(), m.value.as_deref()))
            .collect();
        assert_eq!(
            members,
            vec![("RED", None), ("GREEN", Some("2")), ("YELLOW", Some("\"y\""))]
        );
        let Component::Interface(boxed) = &model[1] else {
            panic!("expected an interface");
        };
        assert_eq!(member_names(&boxed.members), vec!["width", "height"]);
        assert_eq!(boxed.visibility, Visibility::Public);
    }

    #[test]
    fn test_return_types_follow_parameters_locals_and_this() {
        let model = build(&[(
            "person.ts",
            r#"export class Person {
    private _name: string = "x";
    static registry = [1, 2];
    get name() { return this._name; }
    echo(value: number) { return value; }
    twice() { const n = 2; return n; }
    static size() { return this.registry; }
}"#,
        )]);
        let Component::Class(person) = &model[0] else {
            panic!("expected a class");
        };
        let typed: Vec<(&str, &str)> = person
            .members
            .iter()
            .map(|m| match m {
                Member::Property(p) => (p.name.as_str(), p.property_type.as_str()),
                Member::Method(m) => (m.name.as_str(), m.return_type.as_str()),
            })
            .collect();
        assert_eq!(
            typed,
            vec![
                ("_name", "string"),
                ("name", "string"),
                ("echo", "number"),
                ("twice", "number"),
                ("registry", "number[]"),
                ("size", "number[]"),
            ]
        );
    }

    #[test]
    fn test_ambient_module_declarations_are_skipped() {
        let model = build(&[(
            "typings.ts",
            r#"declare module "left-pad" {
    export function pad(text: string): string;
}
declare namespace Lib { class Widget {} }"#,
        )]);
        let names: Vec<&str> = model.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Lib"]);
    }

    #[test]
    fn test_anonymous_default_class_is_skipped() {
        let model = build(&[("anon.ts", "export default class {}\nexport class Named {}")]);
        let names: Vec<&str> = model.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Named"]);
    }
}
