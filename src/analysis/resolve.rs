//! Module specifier resolution.
//!
//! Relative specifiers resolve against the importing file; bare specifiers
//! go through the `paths` mappings and `baseUrl` of the compiler options.
//! Package lookups in `node_modules` are not attempted.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::config::CompilerOptions;

/// Extensions tried, in order, when a specifier has none.
const SOURCE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".d.ts", ".mts", ".cts"];

/// Script extensions that map back to TypeScript sources.
const SCRIPT_EXTENSIONS: &[(&str, &[&str])] = &[
    (".js", &[".ts", ".tsx", ".d.ts"]),
    (".jsx", &[".tsx"]),
    (".mjs", &[".mts"]),
    (".cjs", &[".cts"]),
];

/// Where source text comes from.
pub trait SourceHost: Sync {
    fn read(&self, path: &Path) -> io::Result<String>;
    fn is_file(&self, path: &Path) -> bool;
}

/// Reads sources from the file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskHost;

impl SourceHost for DiskHost {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory sources keyed by normalised path.
#[derive(Debug, Default, Clone)]
pub struct MemoryHost {
    files: HashMap<PathBuf, String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(normalize_path(path.as_ref()), text.into());
    }
}

impl SourceHost for MemoryHost {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path))
    }
}

/// Resolves import specifiers to source files.
pub struct ModuleResolver<'a> {
    options: &'a CompilerOptions,
    host: &'a dyn SourceHost,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(options: &'a CompilerOptions, host: &'a dyn SourceHost) -> Self {
        Self { options, host }
    }

    /// Resolve `specifier` as imported from `containing_file`.
    pub fn resolve(&self, specifier: &str, containing_file: &Path) -> Option<PathBuf> {
        if is_relative(specifier) {
            let dir = containing_file.parent().unwrap_or_else(|| Path::new(""));
            return self.try_candidate(&dir.join(specifier));
        }

        for candidate in self.mapped_candidates(specifier) {
            if let Some(found) = self.try_candidate(&candidate) {
                return Some(found);
            }
        }

        let base = self.options.base_url.as_ref()?;
        self.try_candidate(&base.join(specifier))
    }

    /// Substitutions from the `paths` option whose pattern matches.
    fn mapped_candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let Some(root) = self
            .options
            .base_url
            .as_ref()
            .or(self.options.config_dir.as_ref())
        else {
            return Vec::new();
        };

        let mut best: Option<(&str, &Vec<String>, usize)> = None;
        for (pattern, targets) in &self.options.paths {
            if match_pattern(pattern, specifier).is_none() {
                continue;
            }
            // Longest prefix wins.
            let prefix_len = pattern.find('*').unwrap_or(pattern.len());
            if best.map_or(true, |(_, _, len)| prefix_len > len) {
                best = Some((pattern, targets, prefix_len));
            }
        }

        let Some((pattern, targets, _)) = best else {
            return Vec::new();
        };
        let captured = match_pattern(pattern, specifier).unwrap_or("");
        targets
            .iter()
            .map(|target| root.join(target.replacen('*', captured, 1)))
            .collect()
    }

    fn try_candidate(&self, base: &Path) -> Option<PathBuf> {
        let base = normalize_path(base);
        let text = base.to_string_lossy().to_string();

        if SOURCE_EXTENSIONS.iter().any(|ext| text.ends_with(ext)) && self.host.is_file(&base) {
            return Some(base);
        }

        for (script_ext, replacements) in SCRIPT_EXTENSIONS {
            if let Some(stem) = text.strip_suffix(script_ext) {
                for ext in *replacements {
                    let candidate = PathBuf::from(format!("{stem}{ext}"));
                    if self.host.is_file(&candidate) {
                        return Some(candidate);
                    }
                }
            }
        }

        for ext in SOURCE_EXTENSIONS {
            let candidate = PathBuf::from(format!("{text}{ext}"));
            if self.host.is_file(&candidate) {
                return Some(candidate);
            }
        }

        for ext in SOURCE_EXTENSIONS {
            let candidate = base.join(format!("index{ext}"));
            if self.host.is_file(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Match a `paths` key with at most one `*`; returns the captured text.
fn match_pattern<'s>(pattern: &str, specifier: &'s str) -> Option<&'s str> {
    match pattern.split_once('*') {
        None => (pattern == specifier).then_some(""),
        Some((prefix, suffix)) => {
            if specifier.len() >= prefix.len() + suffix.len()
                && specifier.starts_with(prefix)
                && specifier.ends_with(suffix)
            {
                Some(&specifier[prefix.len()..specifier.len() - suffix.len()])
            } else {
                None
            }
        }
    }
}

/// Lexically remove `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn host() -> MemoryHost {
        MemoryHost::new()
            .with_file("src/app.ts", "")
            .with_file("src/models/user.ts", "")
            .with_file("src/models/index.ts", "")
            .with_file("src/view.tsx", "")
            .with_file("src/shared/util.ts", "")
    }

    #[test]
    fn test_relative_resolution() {
        let options = CompilerOptions::default();
        let host = host();
        let resolver = ModuleResolver::new(&options, &host);
        let from = Path::new("src/app.ts");

        assert_eq!(
            resolver.resolve("./models/user", from),
            Some(PathBuf::from("src/models/user.ts"))
        );
        assert_eq!(
            resolver.resolve("./models", from),
            Some(PathBuf::from("src/models/index.ts"))
        );
        assert_eq!(
            resolver.resolve("./view.js", from),
            Some(PathBuf::from("src/view.tsx"))
        );
        assert_eq!(
            resolver.resolve("../src/models/user", Path::new("src/models/index.ts")),
            None
        );
        assert_eq!(
            resolver.resolve("./user", Path::new("src/models/index.ts")),
            Some(PathBuf::from("src/models/user.ts"))
        );
        assert_eq!(resolver.resolve("./missing", from), None);
    }

    #[test]
    fn test_paths_and_base_url() {
        let mut paths = IndexMap::new();
        paths.insert("@shared/*".to_string(), vec!["shared/*".to_string()]);
        let options = CompilerOptions {
            base_url: Some(PathBuf::from("src")),
            paths,
            ..CompilerOptions::default()
        };
        let host = host();
        let resolver = ModuleResolver::new(&options, &host);
        let from = Path::new("src/app.ts");

        assert_eq!(
            resolver.resolve("@shared/util", from),
            Some(PathBuf::from("src/shared/util.ts"))
        );
        assert_eq!(
            resolver.resolve("models/user", from),
            Some(PathBuf::from("src/models/user.ts"))
        );
        assert_eq!(resolver.resolve("lodash", from), None);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b/../c.ts")), PathBuf::from("a/c.ts"));
        assert_eq!(normalize_path(Path::new("../x/y")), PathBuf::from("../x/y"));
    }

    #[test]
    fn test_match_pattern() {
        assert_eq!(match_pattern("@app/*", "@app/core/x"), Some("core/x"));
        assert_eq!(match_pattern("exact", "exact"), Some(""));
        assert_eq!(match_pattern("@app/*", "@lib/x"), None);
    }
}
