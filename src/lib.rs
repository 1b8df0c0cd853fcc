//! tsplant - class diagrams from TypeScript sources.
//!
//! tsplant reads a set of TypeScript modules, builds a model of their
//! classes, interfaces, enums, namespaces and functions, and renders it as
//! PlantUML or Mermaid class diagram markup.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter parsing, symbol binding and type queries
//! - `model`: the component tree built from exported declarations
//! - `render`: filters, association inference and the output dialects
//! - `config`: render options, settings files and tsconfig loading
//! - `server`: PlantUML server client for image output
//! - `cli`: the command-line front end
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tsplant::{analysis::AnalysisContext, build_model, render, CompilerOptions, RenderOptions};
//!
//! let context = AnalysisContext::load(&[PathBuf::from("src/greeter.ts")], CompilerOptions::default())?;
//! let model = build_model(&context.checker(), &context.source_files());
//! println!("{}", render(&model, &RenderOptions::default())?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod render;
pub mod server;

pub use analysis::{AnalysisContext, TypeQuery};
pub use config::{CompilerOptions, OutputFormat, RenderOptions, Settings};
pub use error::{AnalysisError, ConfigError, RenderError, ServerError};
pub use model::{build_model, Component, Composite};
pub use render::{render, Diagram, Formatter};
