use thiserror::Error;

use crate::ast::Span;

/// Why a single attribute or template reference could not be rewritten.
///
/// Raised before any edit to the offending node, so a failed node is left
/// exactly as it was parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error(
        "Only plain strings can be used with the \"tw\" prop.\nEg: <div tw=\"text-black\" /> or <div tw={{\"text-black\"}} />"
    )]
    InvalidShorthandValue { span: Option<Span> },

    #[error("An empty css prop (css=\"\") isn't supported alongside the tw prop (tw=\"...\")")]
    EmptyStyleAttribute { span: Option<Span> },

    #[error(
        "tw`...` can only be used inside the \"css\" prop. Set `allow_style_prop = true` to use it anywhere else"
    )]
    StyleAttributeRestriction { span: Option<Span> },

    #[error("Style generation failed: {message}")]
    Generator { message: String, span: Option<Span> },

    #[error("The \"tw\" prop is not attached to a JSX element")]
    MissingElement { span: Option<Span> },
}

impl TransformError {
    /// Source location of the node that failed.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::InvalidShorthandValue { span }
            | Self::EmptyStyleAttribute { span }
            | Self::StyleAttributeRestriction { span }
            | Self::Generator { span, .. }
            | Self::MissingElement { span } => *span,
        }
    }
}
