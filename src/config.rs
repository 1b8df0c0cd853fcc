//! Configuration: the YAML settings file, render options and tsconfig.json.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, RenderError};

/// Settings file names looked up in the working directory.
pub const SETTINGS_FILE_NAMES: &[&str] = &["tsplant.yaml", ".tsplant.yaml"];

/// Public PlantUML server used for image output.
pub const DEFAULT_SERVER: &str = "https://www.plantuml.com/plantuml";

lazy_static! {
    /// A comma directly before a closing bracket, as tsconfig files allow.
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").expect("valid regex");
}

/// Diagram dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    PlantUml,
    Mermaid,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::PlantUml => "plantuml",
            OutputFormat::Mermaid => "mermaid",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plantuml" | "puml" => Ok(OutputFormat::PlantUml),
            "mermaid" | "mmd" => Ok(OutputFormat::Mermaid),
            other => Err(RenderError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options that shape the rendered diagram.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub associations: bool,
    pub field_associations: bool,
    pub only_interfaces: bool,
    pub only_classes: bool,
    pub colored_lines: bool,
    pub target_class: Option<String>,
    pub format: OutputFormat,
}

impl RenderOptions {
    /// Reject option combinations that cannot both hold.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.only_interfaces && self.only_classes {
            return Err(RenderError::ConflictingFilters);
        }
        Ok(())
    }
}

/// Contents of a `tsplant.yaml` settings file.
///
/// Every field mirrors a command line flag; flags given on the command line
/// win over the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub associations: bool,
    pub field_associations: bool,
    pub only_interfaces: bool,
    pub only_classes: bool,
    pub colored_lines: bool,
    pub target_class: Option<String>,
    pub format: Option<String>,
    /// tsconfig.json path or directory.
    pub project: Option<PathBuf>,
    /// PlantUML server base URL for image output.
    pub server: Option<String>,
    /// Glob patterns for input paths to skip (e.g., "**/*.spec.ts").
    pub excluded_paths: Vec<String>,
}

impl Settings {
    /// Parse settings from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    /// Find and load settings.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. `tsplant.yaml` or `.tsplant.yaml` in `cwd`
    /// 3. Platform-specific config directory
    /// 4. Defaults
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.display().to_string()));
            }
            info!(path = %path.display(), "loading settings from explicit path");
            return Self::parse_file(path);
        }

        for name in SETTINGS_FILE_NAMES {
            let local = cwd.join(name);
            if local.is_file() {
                info!(path = %local.display(), "loading settings from working directory");
                return Self::parse_file(local);
            }
        }

        if let Some(dirs) = ProjectDirs::from("", "", "tsplant") {
            let system = dirs.config_dir().join("tsplant.yaml");
            if system.is_file() {
                info!(path = %system.display(), "loading settings from config directory");
                return Self::parse_file(system);
            }
            debug!(path = %system.display(), "no settings in config directory");
        }

        debug!("no settings file found, using defaults");
        Ok(Self::default())
    }

    /// Check if a path should be skipped based on `excluded_paths`.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|glob| glob.compile_matcher().is_match(path_str.as_str()))
                .unwrap_or(false)
        })
    }

    pub fn server_url(&self) -> &str {
        self.server.as_deref().unwrap_or(DEFAULT_SERVER)
    }
}

/// The compiler options the analysis honours.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    pub strict: bool,
    pub strict_null_checks: Option<bool>,
    /// Absolute or cwd-relative `baseUrl`.
    pub base_url: Option<PathBuf>,
    pub paths: IndexMap<String, Vec<String>>,
    /// Directory of the tsconfig file; `paths` resolve against it without `baseUrl`.
    pub config_dir: Option<PathBuf>,
}

impl CompilerOptions {
    /// `strictNullChecks`, defaulting to `strict`.
    pub fn strict_null_checks(&self) -> bool {
        self.strict_null_checks.unwrap_or(self.strict)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TsConfigFile {
    compiler_options: RawCompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawCompilerOptions {
    strict: Option<bool>,
    strict_null_checks: Option<bool>,
    base_url: Option<String>,
    paths: IndexMap<String, Vec<String>>,
}

/// Locate the tsconfig file.
///
/// An explicit project must exist. Otherwise only `search_from` itself is
/// checked; parent directories are not searched.
pub fn find_tsconfig(
    project: Option<&Path>,
    search_from: &Path,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(project) = project {
        let candidate = if project.is_dir() {
            project.join("tsconfig.json")
        } else {
            project.to_path_buf()
        };
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        return Err(ConfigError::ProjectNotFound(candidate.display().to_string()));
    }

    let candidate = search_from.join("tsconfig.json");
    Ok(candidate.is_file().then_some(candidate))
}

/// Read compiler options from a tsconfig file.
pub fn load_compiler_options(path: &Path) -> Result<CompilerOptions, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    parse_compiler_options(&content, &config_dir).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Parse tsconfig text; comments and trailing commas are accepted.
pub fn parse_compiler_options(
    content: &str,
    config_dir: &Path,
) -> Result<CompilerOptions, serde_json::Error> {
    let cleaned = strip_json_comments(content);
    let cleaned = TRAILING_COMMA.replace_all(&cleaned, "$1");
    let file: TsConfigFile = serde_json::from_str(&cleaned)?;
    let raw = file.compiler_options;

    Ok(CompilerOptions {
        strict: raw.strict.unwrap_or(false),
        strict_null_checks: raw.strict_null_checks,
        base_url: raw.base_url.map(|base| config_dir.join(base)),
        paths: raw.paths,
        config_dir: Some(config_dir.to_path_buf()),
    })
}

/// Remove `//` and `/* */` comments outside string literals.
fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_settings() {
        let yaml = r#"
associations: true
onlyClasses: true
targetClass: Animal
format: mermaid
server: http://localhost:8080
excludedPaths:
  - "**/*.spec.ts"
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert!(settings.associations);
        assert!(settings.only_classes);
        assert!(!settings.only_interfaces);
        assert_eq!(settings.target_class.as_deref(), Some("Animal"));
        assert_eq!(settings.format.as_deref(), Some("mermaid"));
        assert_eq!(settings.server_url(), "http://localhost:8080");
        assert!(settings.is_path_excluded(Path::new("src/app.spec.ts")));
        assert!(!settings.is_path_excluded(Path::new("src/app.ts")));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server_url(), DEFAULT_SERVER);
        assert!(!settings.is_path_excluded(Path::new("anything.ts")));
    }

    #[test]
    fn test_load_settings_from_working_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tsplant.yaml"), "fieldAssociations: true\n").unwrap();
        let settings = Settings::load(None, dir.path()).unwrap();
        assert!(settings.field_associations);
    }

    #[test]
    fn test_explicit_settings_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        let result = Settings::load(Some(&missing), dir.path());
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("PlantUML".parse::<OutputFormat>(), Ok(OutputFormat::PlantUml));
        assert_eq!("mermaid".parse::<OutputFormat>(), Ok(OutputFormat::Mermaid));
        assert_eq!(
            "dot".parse::<OutputFormat>(),
            Err(RenderError::UnknownFormat("dot".to_string()))
        );
    }

    #[test]
    fn test_conflicting_filters() {
        let options = RenderOptions {
            only_classes: true,
            only_interfaces: true,
            ..RenderOptions::default()
        };
        assert_eq!(options.validate(), Err(RenderError::ConflictingFilters));
        assert!(RenderOptions::default().validate().is_ok());
    }

    #[test]
    fn test_parse_tsconfig_with_comments() {
        let content = r#"{
    // compiler settings
    "compilerOptions": {
        "strict": true, /* everything */
        "baseUrl": "./src",
        "paths": { "@app/*": ["app/*"], },
        "outDir": "dist//build"
    },
}"#;
        let options = parse_compiler_options(content, Path::new("proj")).unwrap();
        assert!(options.strict);
        assert!(options.strict_null_checks());
        assert_eq!(options.base_url, Some(PathBuf::from("proj/./src")));
        assert_eq!(options.paths.get("@app/*"), Some(&vec!["app/*".to_string()]));
    }

    #[test]
    fn test_strict_null_checks_override() {
        let options = parse_compiler_options(
            r#"{ "compilerOptions": { "strict": true, "strictNullChecks": false } }"#,
            Path::new("."),
        )
        .unwrap();
        assert!(!options.strict_null_checks());
        let empty = parse_compiler_options("{}", Path::new(".")).unwrap();
        assert!(!empty.strict_null_checks());
    }

    #[test]
    fn test_find_tsconfig() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("src/models");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();

        let found = find_tsconfig(None, dir.path()).unwrap();
        assert_eq!(found, Some(dir.path().join("tsconfig.json")));

        // A tsconfig in a parent directory is not picked up.
        assert_eq!(find_tsconfig(None, &nested).unwrap(), None);

        let explicit = find_tsconfig(Some(dir.path()), &nested).unwrap();
        assert_eq!(explicit, Some(dir.path().join("tsconfig.json")));

        let missing = find_tsconfig(Some(&dir.path().join("other.json")), &nested);
        assert!(matches!(missing, Err(ConfigError::ProjectNotFound(_))));
    }
}
