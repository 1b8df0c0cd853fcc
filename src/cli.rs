//! Command-line interface for tsplant.

use anyhow::Context;
use clap::Parser;
use globset::{Glob, GlobMatcher};
use std::path::{Component as PathComponent, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analysis::AnalysisContext;
use crate::config::{self, CompilerOptions, OutputFormat, RenderOptions, Settings};
use crate::model::build_model;
use crate::render;
use crate::server::{self, ImageFormat};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Generate PlantUML or Mermaid class diagrams from TypeScript sources.
#[derive(Parser, Debug, Default)]
#[command(name = "tsplant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TypeScript files or glob patterns (e.g. 'src/**/*.ts')
    #[arg(short, long = "input", value_name = "PATH", required = true, num_args = 1..)]
    pub inputs: Vec<String>,

    /// Output file. svg, png and txt are rendered by a PlantUML server;
    /// without it the document goes to stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// tsconfig.json file, or a directory containing one
    #[arg(short, long, value_name = "PATH")]
    pub project: Option<PathBuf>,

    /// Show associations between types with cardinalities
    #[arg(short = 'A', long)]
    pub associations: bool,

    /// Show associations between fields and types with cardinalities
    #[arg(short = 'F', long)]
    pub field_associations: bool,

    /// Only output interfaces
    #[arg(short = 'I', long)]
    pub only_interfaces: bool,

    /// Only output classes
    #[arg(short = 'C', long, conflicts_with = "only_interfaces")]
    pub only_classes: bool,

    /// Color association lines
    #[arg(short = 'L', long)]
    pub colored_lines: bool,

    /// Output format: plantuml or mermaid
    #[arg(short, long)]
    pub format: Option<String>,

    /// Only output the hierarchy of this class or interface
    #[arg(short = 'T', long, alias = "targetClass", value_name = "NAME")]
    pub target_class: Option<String>,

    /// Settings file (default: auto-discover tsplant.yaml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// PlantUML server used for image output
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Log level when TSPLANT_LOG and RUST_LOG are unset
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Combine flags with settings; a flag can only switch an option on.
    pub fn render_options(&self, settings: &Settings) -> anyhow::Result<RenderOptions> {
        let format = match self.format.as_deref().or(settings.format.as_deref()) {
            Some(name) => name.parse::<OutputFormat>()?,
            None => OutputFormat::default(),
        };
        let options = RenderOptions {
            associations: self.associations || settings.associations,
            field_associations: self.field_associations || settings.field_associations,
            only_interfaces: self.only_interfaces || settings.only_interfaces,
            only_classes: self.only_classes || settings.only_classes,
            colored_lines: self.colored_lines || settings.colored_lines,
            target_class: self
                .target_class
                .clone()
                .or_else(|| settings.target_class.clone()),
            format,
        };
        options.validate()?;
        Ok(options)
    }
}

/// Split a pattern into its literal leading directory and whether it was
/// implicit (`.`).
fn glob_base(pattern: &str) -> (PathBuf, bool) {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        if let PathComponent::Normal(part) = component {
            if part.to_string_lossy().contains(GLOB_CHARS) {
                break;
            }
        }
        base.push(component);
    }
    // The last literal component may be the file itself.
    if base == Path::new(pattern) {
        base.pop();
    }
    if base.as_os_str().is_empty() {
        (PathBuf::from("."), true)
    } else {
        (base, false)
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == "node_modules"
}

fn expand_pattern(pattern: &str, matcher: &GlobMatcher) -> anyhow::Result<Vec<PathBuf>> {
    let (base, implicit) = glob_base(pattern);
    let mut matches = Vec::new();
    for entry in WalkDir::new(&base)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
    {
        let entry = entry.with_context(|| format!("cannot walk {}", base.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let candidate = if implicit {
            path.strip_prefix(".").unwrap_or(path)
        } else {
            path
        };
        if matcher.is_match(candidate) {
            matches.push(candidate.to_path_buf());
        }
    }
    Ok(matches)
}

/// Expand input patterns to a sorted, de-duplicated file list.
pub fn collect_inputs(patterns: &[String], settings: &Settings) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        if !pattern.contains(GLOB_CHARS) {
            let path = PathBuf::from(pattern);
            if !path.is_file() {
                anyhow::bail!("input file not found: {}", pattern);
            }
            files.push(path);
            continue;
        }
        let matcher = Glob::new(pattern)
            .with_context(|| format!("invalid input pattern {:?}", pattern))?
            .compile_matcher();
        let matched = expand_pattern(pattern, &matcher)?;
        if matched.is_empty() {
            warn!(pattern = pattern.as_str(), "input pattern matched no files");
        }
        files.extend(matched);
    }

    files.retain(|path| {
        let excluded = settings.is_path_excluded(path);
        if excluded {
            debug!(path = %path.display(), "excluded by settings");
        }
        !excluded
    });
    files.sort();
    files.dedup();
    Ok(files)
}

/// Find and read the compiler options for a run.
pub fn resolve_compiler_options(
    project: Option<&Path>,
    first_pattern: Option<&str>,
    cwd: &Path,
) -> anyhow::Result<CompilerOptions> {
    let found = match project {
        Some(project) => config::find_tsconfig(Some(project), cwd)?,
        None => {
            let near_input = first_pattern
                .map(|pattern| glob_base(pattern).0)
                .map(|base| config::find_tsconfig(None, &base))
                .transpose()?
                .flatten();
            match near_input {
                Some(path) => Some(path),
                None => config::find_tsconfig(None, cwd)?,
            }
        }
    };
    match found {
        Some(path) => {
            info!(path = %path.display(), "using tsconfig");
            Ok(config::load_compiler_options(&path)?)
        }
        None => {
            debug!("no tsconfig found, using default compiler options");
            Ok(CompilerOptions::default())
        }
    }
}

/// Analyse `files` and render the diagram document.
pub fn generate(
    files: &[PathBuf],
    compiler_options: CompilerOptions,
    options: &RenderOptions,
) -> anyhow::Result<String> {
    let context = AnalysisContext::load(files, compiler_options)?;
    let model = build_model(&context.checker(), &context.source_files());
    Ok(render::render(&model, options)?)
}

fn write_output(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Run the tool.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("cannot read the current directory")?;
    let settings = Settings::load(cli.config.as_deref(), &cwd)?;
    let options = cli.render_options(&settings)?;

    let files = collect_inputs(&cli.inputs, &settings)?;
    if files.is_empty() {
        anyhow::bail!("no input files matched {}", cli.inputs.join(", "));
    }
    info!(files = files.len(), "collected input files");

    let project = cli.project.as_deref().or(settings.project.as_deref());
    let compiler_options =
        resolve_compiler_options(project, cli.inputs.first().map(String::as_str), &cwd)?;

    let document = generate(&files, compiler_options, &options)?;

    let Some(output) = &cli.output else {
        println!("{}", document);
        return Ok(EXIT_SUCCESS);
    };

    match ImageFormat::for_path(output) {
        Some(image) => {
            let server = cli.server.as_deref().unwrap_or(settings.server_url());
            let bytes = server::render_image(server, options.format, image, &document)?;
            write_output(output, &bytes)?;
        }
        None => write_output(output, document.as_bytes())?,
    }
    info!(path = %output.display(), "wrote diagram");
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("src/**/*.ts"), (PathBuf::from("src"), false));
        assert_eq!(glob_base("*.ts"), (PathBuf::from("."), true));
        assert_eq!(glob_base("src/models/user.ts"), (PathBuf::from("src/models"), false));
        assert_eq!(glob_base("/abs/lib/*.ts"), (PathBuf::from("/abs/lib"), false));
    }

    #[test]
    fn test_collect_inputs_expands_and_sorts() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("shapes")).unwrap();
        fs::create_dir_all(src.join("node_modules/pkg")).unwrap();
        fs::write(src.join("shapes/square.ts"), "export class Square {}").unwrap();
        fs::write(src.join("circle.ts"), "export class Circle {}").unwrap();
        fs::write(src.join("circle.spec.ts"), "").unwrap();
        fs::write(src.join("notes.md"), "").unwrap();
        fs::write(src.join("node_modules/pkg/index.ts"), "").unwrap();

        let pattern = format!("{}/**/*.ts", src.display());
        let settings = Settings {
            excluded_paths: vec!["**/*.spec.ts".to_string()],
            ..Settings::default()
        };
        let files = collect_inputs(&[pattern], &settings).unwrap();
        assert_eq!(files, vec![src.join("circle.ts"), src.join("shapes/square.ts")]);
    }

    #[test]
    fn test_missing_literal_input_is_an_error() {
        let result = collect_inputs(&["does/not/exist.ts".to_string()], &Settings::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_only_switch_options_on() {
        let settings = Settings {
            associations: true,
            format: Some("mermaid".to_string()),
            target_class: Some("Animal".to_string()),
            ..Settings::default()
        };
        let cli = Cli {
            colored_lines: true,
            target_class: Some("Horse".to_string()),
            ..Cli::default()
        };
        let options = cli.render_options(&settings).unwrap();
        assert!(options.associations);
        assert!(options.colored_lines);
        assert_eq!(options.format, OutputFormat::Mermaid);
        assert_eq!(options.target_class.as_deref(), Some("Horse"));
    }

    #[test]
    fn test_conflicting_filters_from_settings() {
        let settings = Settings {
            only_classes: true,
            ..Settings::default()
        };
        let cli = Cli {
            only_interfaces: true,
            ..Cli::default()
        };
        assert!(cli.render_options(&settings).is_err());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let cli = Cli {
            format: Some("graphviz".to_string()),
            ..Cli::default()
        };
        assert!(cli.render_options(&Settings::default()).is_err());
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = Cli::try_parse_from([
            "tsplant", "-i", "a.ts", "b.ts", "-A", "-T", "Horse", "-f", "mermaid",
        ])
        .unwrap();
        assert_eq!(cli.inputs, vec!["a.ts", "b.ts"]);
        assert!(cli.associations);
        assert_eq!(cli.target_class.as_deref(), Some("Horse"));

        assert!(Cli::try_parse_from(["tsplant", "-i", "a.ts", "-I", "-C"]).is_err());
        assert!(Cli::try_parse_from(["tsplant"]).is_err());
    }

    #[test]
    fn test_tsconfig_next_to_inputs() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("app");
        fs::create_dir_all(project.join("src")).unwrap();
        fs::write(
            project.join("tsconfig.json"),
            "{\n  // strict mode\n  \"compilerOptions\": { \"strict\": true, },\n}",
        )
        .unwrap();
        let pattern = format!("{}/*.ts", project.display());
        let options = resolve_compiler_options(None, Some(&pattern), dir.path()).unwrap();
        assert!(options.strict_null_checks());
    }

    #[test]
    fn test_tsconfig_lookup_skips_ancestors_and_falls_back_to_cwd() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("app");
        let cwd = dir.path().join("work");
        fs::create_dir_all(project.join("src")).unwrap();
        fs::create_dir_all(&cwd).unwrap();
        fs::write(
            project.join("tsconfig.json"),
            "{ \"compilerOptions\": { \"strict\": true } }",
        )
        .unwrap();
        let pattern = format!("{}/src/*.ts", project.display());

        let options = resolve_compiler_options(None, Some(&pattern), &cwd).unwrap();
        assert!(!options.strict_null_checks());

        fs::write(
            cwd.join("tsconfig.json"),
            "{ \"compilerOptions\": { \"strictNullChecks\": true } }",
        )
        .unwrap();
        let options = resolve_compiler_options(None, Some(&pattern), &cwd).unwrap();
        assert!(options.strict_null_checks());
    }

    #[test]
    fn test_explicit_missing_project_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(resolve_compiler_options(Some(missing.as_path()), None, dir.path()).is_err());
    }
}
