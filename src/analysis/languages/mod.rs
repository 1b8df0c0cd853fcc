//! Language-specific analyzer implementations.

mod typescript;

pub use typescript::TypeScriptAnalyzer;

use super::LanguageAnalyzer;
use once_cell::sync::OnceCell;

/// Static storage for the TypeScript analyzer.
static TYPESCRIPT_ANALYZER: OnceCell<TypeScriptAnalyzer> = OnceCell::new();

/// Static storage for the TSX analyzer.
static TSX_ANALYZER: OnceCell<TypeScriptAnalyzer> = OnceCell::new();

/// Get an analyzer for the given file extension.
///
/// Returns None if no analyzer handles the extension.
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    match ext {
        "ts" | "mts" | "cts" => {
            Some(TYPESCRIPT_ANALYZER.get_or_init(TypeScriptAnalyzer::new) as &'static dyn LanguageAnalyzer)
        }
        "tsx" => Some(TSX_ANALYZER.get_or_init(TypeScriptAnalyzer::tsx) as &'static dyn LanguageAnalyzer),
        _ => None,
    }
}

/// All file extensions with a registered analyzer.
pub fn registered_extensions() -> Vec<&'static str> {
    let mut extensions = Vec::new();
    for ext in ["ts", "tsx"] {
        if let Some(analyzer) = get_analyzer(ext) {
            extensions.extend_from_slice(analyzer.file_extensions());
        }
    }
    extensions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_lookup() {
        assert_eq!(get_analyzer("ts").map(|a| a.language_id()), Some("typescript"));
        assert_eq!(get_analyzer("tsx").map(|a| a.language_id()), Some("tsx"));
        assert!(get_analyzer("js").is_none());
        assert!(get_analyzer("ts").is_some_and(|a| a.handles_extension("mts")));
    }

    #[test]
    fn test_registered_extensions() {
        let extensions = registered_extensions();
        assert!(extensions.contains(&"ts"));
        assert!(extensions.contains(&"tsx"));
        assert!(extensions.contains(&"cts"));
    }
}
