//! Error types for the analysis, configuration, rendering and server layers.

use thiserror::Error;

/// Errors while loading and analysing sources.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("no input files")]
    NoInputs,
}

/// Errors while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tsconfig {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("project file not found: {0}")]
    ProjectNotFound(String),

    #[error("missing settings file: {0}")]
    MissingFile(String),
}

/// Errors while rendering a diagram.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RenderError {
    #[error("onlyInterfaces and onlyClasses cannot be combined")]
    ConflictingFilters,

    #[error("unknown output format '{0}' (expected plantuml or mermaid)")]
    UnknownFormat(String),
}

/// Errors while talking to a PlantUML server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to start the HTTP runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("mermaid output cannot be rendered by a PlantUML server")]
    MermaidImage,
}
