//! Relationship inference and diagram output.
//!
//! Rendering runs in three steps over an already built model:
//!
//! 1. [`filter`] drops the nodes the options exclude and prunes heritage
//!    pairs that point at dropped nodes.
//! 2. [`associations`] infers edges between the retained nodes.
//! 3. A [`Formatter`] writes the document for the selected dialect.

mod associations;
mod filter;
mod mermaid;
mod plantuml;

pub use associations::{infer_associations, Association, AssociationMode, PALETTE};
pub use filter::{filter_model, TypeIndex};
pub use mermaid::MermaidFormatter;
pub use plantuml::PlantUmlFormatter;

use tracing::debug;

use crate::config::{OutputFormat, RenderOptions};
use crate::error::RenderError;
use crate::model::{Component, Composite};

/// A filtered model and the edges inferred over it.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub components: Vec<Component>,
    pub associations: Vec<Association>,
}

/// Writes a [`Diagram`] in one markup dialect.
pub trait Formatter {
    /// Lines of the complete document.
    fn format(&self, diagram: &Diagram) -> Vec<String>;
}

pub fn formatter_for(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::PlantUml => Box::new(PlantUmlFormatter),
        OutputFormat::Mermaid => Box::new(MermaidFormatter),
    }
}

/// Filter the model and infer its edges.
pub fn prepare(model: &[Component], options: &RenderOptions) -> Result<Diagram, RenderError> {
    options.validate()?;
    let components = filter_model(model, options);
    let index = TypeIndex::new(&components);
    let associations = infer_associations(&components, &index, options);
    debug!(
        components = components.len(),
        associations = associations.len(),
        "diagram prepared"
    );
    Ok(Diagram {
        components,
        associations,
    })
}

/// Render a model as a complete diagram document.
pub fn render(model: &[Component], options: &RenderOptions) -> Result<String, RenderError> {
    let diagram = prepare(model, options)?;
    Ok(formatter_for(options.format).format(&diagram).join("\n"))
}

/// Visit every node depth-first with its namespace-qualified name.
pub(crate) fn walk<'a, F>(components: &'a [Component], visit: &mut F)
where
    F: FnMut(&'a Component, &str),
{
    fn go<'a, F>(components: &'a [Component], scope: &mut Vec<&'a str>, visit: &mut F)
    where
        F: FnMut(&'a Component, &str),
    {
        for component in components {
            scope.push(component.name());
            let qualified = scope.join(".");
            visit(component, &qualified);
            if let Component::Namespace(namespace) = component {
                go(&namespace.parts, scope, visit);
            }
            scope.pop();
        }
    }
    go(components, &mut Vec::new(), visit);
}
