//! Template errors

/// Errors from template loading and compilation
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No template file for the requested type (or an unsafe type name).
    #[error("unknown template type '{template_type}'")]
    UnknownTemplateType { template_type: String },

    /// `<section id="{id}">` never closes.
    #[error("section '{id}' is never closed")]
    UnclosedSection { id: String },

    /// A `data-template` element never closes.
    #[error("repeat block '{marker}' (<{tag}>) is never closed")]
    UnclosedRepeat { marker: String, tag: String },

    /// A `data-template` attribute appeared outside an opening tag.
    #[error("data-template marker '{marker}' is not inside an element tag")]
    DanglingRepeatMarker { marker: String },

    /// Template file could not be read.
    #[error("template file could not be read: {0}")]
    Io(#[from] std::io::Error),
}
