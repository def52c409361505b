//! Safety-case HTML template populator
//!
//! Compiles a static HTML template into a small typed AST instead of regex
//! splicing:
//!
//! - `[UPPER_SNAKE]` tokens become [`Node::Placeholder`];
//! - the single element carrying `data-template="marker"` becomes a
//!   [`Node::Repeat`] block, rendered once per array element and rendered to
//!   nothing for an empty array (no stale template row in the output);
//! - `<section id="...">` blocks whose id names a conditional data section
//!   are dropped whole when that data is absent or empty; any HTML comment
//!   immediately preceding the section is absorbed into the block and
//!   dropped with it.
//!
//! A placeholder whose field the extractor never produced renders as the
//! literal bracket token, matching the generated-file contract downstream
//! tooling relies on. All substituted values are HTML-escaped.

mod error;
mod escape;
mod parse;
mod render;

use std::path::Path;

use caseflow_model::SafetyCaseData;

pub use error::TemplateError;
pub use escape::escape_html;

/// One node of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Verbatim HTML.
    Literal(String),
    /// `[TOKEN]` substitution point.
    Placeholder(String),
    /// Element with `data-template="marker"`, repeated per data row.
    Repeat { marker: String, body: Vec<Node> },
    /// `<section id="...">` block, conditionally dropped. `open_tag` is the
    /// original opening markup, preserved verbatim when the section renders.
    Section {
        id: String,
        open_tag: String,
        body: Vec<Node>,
    },
}

/// A compiled template, ready to render against [`SafetyCaseData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Compile template HTML.
    ///
    /// # Errors
    /// [`TemplateError::UnclosedSection`] / [`TemplateError::UnclosedRepeat`]
    /// when the markup's block structure does not close.
    pub fn parse(html: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: parse::parse_document(html)?,
        })
    }

    /// Populate the template with extracted safety-case data.
    #[must_use]
    pub fn render(&self, data: &SafetyCaseData) -> String {
        render::render_nodes(&self.nodes, data)
    }

    /// Compiled node list, mostly for tests and tooling.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Load and compile the template file for `template_type` from `dir`.
///
/// Template files are `{template_type}.html`; the type name is restricted to
/// `[A-Za-z0-9_-]` so a request can never reach outside the directory.
///
/// # Errors
/// [`TemplateError::UnknownTemplateType`] for a missing or unsafe type name,
/// plus parse and I/O failures.
pub fn load_template(dir: &Path, template_type: &str) -> Result<Template, TemplateError> {
    if template_type.is_empty()
        || !template_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(TemplateError::UnknownTemplateType {
            template_type: template_type.to_string(),
        });
    }
    let path = dir.join(format!("{template_type}.html"));
    let html = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TemplateError::UnknownTemplateType {
                template_type: template_type.to_string(),
            }
        } else {
            TemplateError::Io(e)
        }
    })?;
    Template::parse(&html)
}
