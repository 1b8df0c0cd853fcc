//! Integration tests for the command-line front end.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tempfile::TempDir;
use tsplant::cli::{self, Cli, EXIT_SUCCESS};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["tsplant"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("arguments should parse")
}

#[test]
fn test_writes_text_output_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out/enum.puml");
    let input = testdata_path().join("enum/Enum.ts");
    let cli = parse(&[
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);

    assert_eq!(cli::run(&cli).unwrap(), EXIT_SUCCESS);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "@startuml\nenum Semaphore {\n    RED\n    GREEN\n    YELLOW\n}\n@enduml"
    );
}

#[test]
fn test_glob_input_collects_every_module() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("animals.puml");
    let pattern = format!("{}/inheritance/*.ts", testdata_path().display());
    let cli = parse(&["-i", &pattern, "-o", output.to_str().unwrap(), "-T", "Snake"]);

    assert_eq!(cli::run(&cli).unwrap(), EXIT_SUCCESS);
    let document = fs::read_to_string(&output).unwrap();
    assert!(document.contains("class Snake extends Animal {"));
    assert!(!document.contains("Horse"));
}

#[test]
fn test_settings_file_supplies_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("tsplant.yaml");
    fs::write(&settings, "onlyInterfaces: true\nformat: mermaid\n").unwrap();
    let output = dir.path().join("scene.mmd");
    let input = testdata_path().join("scene/scene.ts");
    let cli = parse(&[
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--config",
        settings.to_str().unwrap(),
    ]);

    assert_eq!(cli::run(&cli).unwrap(), EXIT_SUCCESS);
    let document = fs::read_to_string(&output).unwrap();
    assert!(document.starts_with("classDiagram\n"));
    assert!(document.contains("class Ray {"));
    assert!(!document.contains("class Sphere"));
}

#[test]
fn test_conflicting_settings_and_flags_fail() {
    let dir = TempDir::new().unwrap();
    let settings = dir.path().join("tsplant.yaml");
    fs::write(&settings, "onlyClasses: true\n").unwrap();
    let input = testdata_path().join("scene/scene.ts");
    let cli = parse(&[
        "-i",
        input.to_str().unwrap(),
        "-I",
        "--config",
        settings.to_str().unwrap(),
    ]);
    assert!(cli::run(&cli).is_err());
}

#[test]
fn test_missing_settings_file_fails() {
    let input = testdata_path().join("enum/Enum.ts");
    let cli = parse(&["-i", input.to_str().unwrap(), "--config", "/nonexistent/tsplant.yaml"]);
    assert!(cli::run(&cli).is_err());
}

#[test]
fn test_unmatched_glob_fails() {
    let pattern = format!("{}/enum/*.tsx", testdata_path().display());
    let cli = parse(&["-i", &pattern]);
    assert!(cli::run(&cli).is_err());
}

#[test]
fn test_tsconfig_paths_mapping() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src/lib")).unwrap();
    fs::write(
        root.join("src/tsconfig.json"),
        r#"{
  // path aliases
  "compilerOptions": {
    "baseUrl": ".",
    "paths": { "@lib/*": ["lib/*"] },
  },
}"#,
    )
    .unwrap();
    fs::write(root.join("src/lib/base.ts"), "export class Base {}\n").unwrap();
    fs::write(
        root.join("src/app.ts"),
        "import { Base } from '@lib/base';\nexport class App extends Base {}\n",
    )
    .unwrap();
    let output = root.join("app.puml");
    let input = root.join("src/app.ts");
    let cli = parse(&["-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);

    assert_eq!(cli::run(&cli).unwrap(), EXIT_SUCCESS);
    let document = fs::read_to_string(&output).unwrap();
    assert_eq!(
        document,
        "@startuml\nclass Base {\n}\nclass App extends Base {\n}\n@enduml"
    );
}
