//! Analysis context: loads a program and answers queries over it.
//!
//! The AnalysisContext provides:
//! - Parallel parsing of the root files
//! - Transitive loading of imported modules
//! - Program order (dependencies before dependents)
//! - Symbol binding across files

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use super::binder::Binder;
use super::checker::Checker;
use super::facts::{FileId, SourceFile};
use super::languages::get_analyzer;
use super::resolve::{normalize_path, DiskHost, ModuleResolver, SourceHost};
use crate::config::CompilerOptions;
use crate::error::AnalysisError;

/// One independent analysis run over a set of root files.
pub struct AnalysisContext {
    files: Vec<SourceFile>,
    paths: Vec<PathBuf>,
    /// Post-order over imports starting from the roots.
    order: Vec<FileId>,
    binder: Binder,
    options: CompilerOptions,
}

impl AnalysisContext {
    /// Load `roots` and everything they import from disk.
    pub fn load(roots: &[PathBuf], options: CompilerOptions) -> Result<Self, AnalysisError> {
        Self::load_with_host(roots, options, &DiskHost)
    }

    /// Load `roots` through an arbitrary source host.
    pub fn load_with_host(
        roots: &[PathBuf],
        options: CompilerOptions,
        host: &dyn SourceHost,
    ) -> Result<Self, AnalysisError> {
        if roots.is_empty() {
            return Err(AnalysisError::NoInputs);
        }
        let roots: Vec<PathBuf> = roots.iter().map(|p| normalize_path(p)).collect();

        // Root files are fatal when unreadable, so parse them eagerly.
        let preloaded: HashMap<PathBuf, SourceFile> = roots
            .par_iter()
            .map(|path| load_source(host, path).map(|file| (path.clone(), file)))
            .collect::<Result<_, _>>()?;

        let mut loader = Loader {
            host,
            options: &options,
            preloaded,
            files: Vec::new(),
            paths: Vec::new(),
            ids: HashMap::new(),
            resolved: Vec::new(),
            order: Vec::new(),
        };
        for root in &roots {
            loader.visit(root);
        }

        let mut binder = Binder::new();
        for (index, file) in loader.files.iter().enumerate() {
            binder.bind_file(FileId(index as u32), file, &loader.resolved[index]);
        }
        debug!(
            files = loader.files.len(),
            roots = roots.len(),
            "program loaded"
        );

        Ok(Self {
            files: loader.files,
            paths: loader.paths,
            order: loader.order,
            binder,
            options,
        })
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn checker(&self) -> Checker<'_> {
        Checker::new(self)
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    /// Find a loaded file by path.
    pub fn file_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        let wanted = normalize_path(path.as_ref());
        self.paths
            .iter()
            .position(|p| *p == wanted)
            .map(|index| FileId(index as u32))
    }

    /// Non-declaration files in program order.
    pub fn source_files(&self) -> Vec<FileId> {
        self.order
            .iter()
            .copied()
            .filter(|id| !self.file(*id).is_declaration_file)
            .collect()
    }
}

struct Loader<'a> {
    host: &'a dyn SourceHost,
    options: &'a CompilerOptions,
    preloaded: HashMap<PathBuf, SourceFile>,
    files: Vec<SourceFile>,
    paths: Vec<PathBuf>,
    ids: HashMap<PathBuf, FileId>,
    resolved: Vec<HashMap<String, Option<FileId>>>,
    order: Vec<FileId>,
}

impl Loader<'_> {
    /// Depth-first over module requests; a file is ordered after its imports.
    fn visit(&mut self, path: &Path) -> Option<FileId> {
        if let Some(id) = self.ids.get(path) {
            return Some(*id);
        }

        let file = match self.preloaded.remove(path) {
            Some(file) => file,
            None => match load_source(self.host, path) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping imported file");
                    return None;
                }
            },
        };

        let id = FileId(self.files.len() as u32);
        self.ids.insert(path.to_path_buf(), id);
        let requests = file.module_requests.clone();
        self.files.push(file);
        self.paths.push(path.to_path_buf());
        self.resolved.push(HashMap::new());

        for specifier in requests {
            let target = ModuleResolver::new(self.options, self.host).resolve(&specifier, path);
            let target_id = match target {
                Some(target) => self.visit(&target),
                None => {
                    debug!(from = %path.display(), specifier = %specifier, "module not resolved");
                    None
                }
            };
            self.resolved[id.0 as usize].insert(specifier, target_id);
        }

        self.order.push(id);
        Some(id)
    }
}

fn load_source(host: &dyn SourceHost, path: &Path) -> Result<SourceFile, AnalysisError> {
    let display = path.display().to_string();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let analyzer = get_analyzer(ext).ok_or_else(|| AnalysisError::UnsupportedFile(display.clone()))?;

    let text = host.read(path).map_err(|source| AnalysisError::Read {
        path: display.clone(),
        source,
    })?;
    let parsed = analyzer
        .parse(path, text.as_bytes())
        .map_err(|source| AnalysisError::Parse {
            path: display.clone(),
            source,
        })?;
    let file = analyzer.lower(&parsed).map_err(|source| AnalysisError::Parse {
        path: display.clone(),
        source,
    })?;

    if file.has_parse_errors {
        debug!(path = %path.display(), "syntax errors; continuing with the recovered tree");
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolve::MemoryHost;

    fn load(host: &MemoryHost, roots: &[&str]) -> AnalysisContext {
        let roots: Vec<PathBuf> = roots.iter().map(PathBuf::from).collect();
        AnalysisContext::load_with_host(&roots, CompilerOptions::default(), host).unwrap()
    }

    fn names(ctx: &AnalysisContext, ids: &[FileId]) -> Vec<String> {
        ids.iter().map(|id| ctx.file(*id).path.clone()).collect()
    }

    #[test]
    fn test_program_order_puts_imports_first() {
        let host = MemoryHost::new()
            .with_file("src/a.ts", "import { B } from './b';\nexport class A {}")
            .with_file("src/b.ts", "import { C } from './c';\nexport class B {}")
            .with_file("src/c.ts", "export class C {}");
        let ctx = load(&host, &["src/a.ts"]);
        assert_eq!(
            names(&ctx, &ctx.source_files()),
            vec!["src/c.ts", "src/b.ts", "src/a.ts"]
        );
    }

    #[test]
    fn test_each_file_once_and_declarations_excluded() {
        let host = MemoryHost::new()
            .with_file("a.ts", "import './types';\nimport './b';\nexport class A {}")
            .with_file("b.ts", "import './a';\nexport class B {}")
            .with_file("types.d.ts", "declare interface Ambient {}");
        let ctx = load(&host, &["a.ts", "b.ts"]);
        assert_eq!(ctx.files().len(), 3);
        assert_eq!(names(&ctx, &ctx.source_files()), vec!["b.ts", "a.ts"]);
        assert!(ctx.file_id("types.d.ts").is_some());
    }

    #[test]
    fn test_missing_import_is_not_fatal() {
        let host = MemoryHost::new().with_file("a.ts", "import { X } from './gone';\nclass A {}");
        let ctx = load(&host, &["a.ts"]);
        assert_eq!(ctx.source_files().len(), 1);
    }

    #[test]
    fn test_unreadable_root_is_fatal() {
        let host = MemoryHost::new();
        let result = AnalysisContext::load_with_host(
            &[PathBuf::from("missing.ts")],
            CompilerOptions::default(),
            &host,
        );
        assert!(matches!(result, Err(AnalysisError::Read { .. })));
    }

    #[test]
    fn test_unsupported_root_is_fatal() {
        let host = MemoryHost::new().with_file("notes.md", "# hi");
        let result = AnalysisContext::load_with_host(
            &[PathBuf::from("notes.md")],
            CompilerOptions::default(),
            &host,
        );
        assert!(matches!(result, Err(AnalysisError::UnsupportedFile(_))));
    }
}
