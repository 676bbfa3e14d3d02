//! Turning a raw class string into a style expression.

use crate::ast::{NodeId, NodeKind, Tree};
use crate::error::TransformError;
use crate::state::CompilationState;

/// Builds the style expression for a raw class string.
///
/// Implementations allocate their nodes in `tree` (usually with
/// [`Tree::alloc_synthetic`]) and return the detached root; the caller
/// splices it in.
pub trait StyleGenerator {
    fn generate(
        &self,
        raw_classes: &str,
        tree: &mut Tree,
        state: &mut CompilationState,
    ) -> Result<NodeId, TransformError>;
}

/// Emits `callee("<classes>")` and leaves class resolution to a runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCallGenerator {
    pub callee: String,
}

impl RuntimeCallGenerator {
    pub fn new(callee: impl Into<String>) -> Self {
        Self { callee: callee.into() }
    }
}

impl StyleGenerator for RuntimeCallGenerator {
    fn generate(
        &self,
        raw_classes: &str,
        tree: &mut Tree,
        _state: &mut CompilationState,
    ) -> Result<NodeId, TransformError> {
        let classes = collapse_whitespace(raw_classes);
        log::trace!("generate: {}({classes:?})", self.callee);

        let callee = tree.alloc_synthetic(NodeKind::Ident(self.callee.clone()));
        let argument = tree.alloc_synthetic(NodeKind::Str {
            value: classes,
            quote: '"',
        });
        Ok(tree.alloc_synthetic(NodeKind::Call {
            callee,
            arguments: vec![argument],
        }))
    }
}

/// Joins the whitespace-separated words of `input` with single spaces.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
