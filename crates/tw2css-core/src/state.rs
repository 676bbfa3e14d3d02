use crate::config::Config;

/// Per-file context threaded through every handler call.
///
/// Created once per compilation, mutated as handlers run, and dropped when the
/// file is done. Nothing here outlives a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationState {
    /// A `css` attribute was seen somewhere in the file.
    pub has_css_prop: bool,
    /// A `tw` attribute was seen somewhere in the file.
    pub has_tw_prop: bool,
    /// Lifts the rule that `tw` templates may only appear inside `css`.
    pub allow_style_prop: bool,
    /// Local name bound to the style-builder import, if the file imports it.
    pub styled_identifier: Option<String>,
}

impl CompilationState {
    pub fn new(config: &Config) -> Self {
        Self {
            allow_style_prop: config.options.allow_style_prop,
            ..Default::default()
        }
    }
}
