//! Debug attributes recording which classes produced an element's styles.

use crate::ast::{find_attribute_by_name, NodeId, NodeKind, Tree};
use crate::error::TransformError;
use crate::state::CompilationState;
use crate::style::collapse_whitespace;

/// Where a debug attribute should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugTarget<'a> {
    /// Attribute sequence of the element, as seen by the caller.
    pub attributes: Vec<NodeId>,
    pub raw_classes: &'a str,
    /// The attribute to insert after (fresh) or the opening element (existing).
    pub path: NodeId,
}

pub trait DebugAnnotator {
    /// Annotates an element whose `css` attribute was just created at `target.path`.
    fn attach(
        &self,
        tree: &mut Tree,
        target: DebugTarget<'_>,
        state: &CompilationState,
    ) -> Result<(), TransformError>;

    /// Annotates an element that already carried styles; `target.path` is
    /// its opening element.
    fn attach_existing(
        &self,
        tree: &mut Tree,
        target: DebugTarget<'_>,
        state: &CompilationState,
    ) -> Result<(), TransformError>;
}

/// Writes the classes into a `data-tw` style attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAttributeAnnotator {
    pub enabled: bool,
    pub attribute: String,
}

impl DataAttributeAnnotator {
    pub fn new(enabled: bool, attribute: impl Into<String>) -> Self {
        Self {
            enabled,
            attribute: attribute.into(),
        }
    }

    pub fn format_prop(raw_classes: &str) -> String {
        collapse_whitespace(raw_classes)
    }

    fn new_attribute(&self, tree: &mut Tree, classes: String) -> NodeId {
        let value = tree.alloc_synthetic(NodeKind::Str {
            value: classes,
            quote: '"',
        });
        tree.alloc_synthetic(NodeKind::Attribute {
            name: self.attribute.clone(),
            value: Some(value),
        })
    }

    /// Appends to a string-valued debug attribute already in `attributes`.
    /// Returns false when there is none to extend.
    fn extend_existing(&self, tree: &mut Tree, attributes: &[NodeId], classes: &str) -> bool {
        let Some(index) = find_attribute_by_name(tree, attributes, &self.attribute) else {
            return false;
        };
        let Some(value) = tree.attribute_value(attributes[index]) else {
            return false;
        };
        let NodeKind::Str { value: existing, quote } = tree.kind(value) else {
            // Computed debug attribute: the author owns it.
            log::debug!("{} is not a plain string, leaving it alone", self.attribute);
            return true;
        };
        let combined = if existing.is_empty() {
            classes.to_string()
        } else {
            format!("{existing} | {classes}")
        };
        let quote = *quote;
        let updated = tree.alloc_synthetic(NodeKind::Str { value: combined, quote });
        tree.replace(value, updated);
        true
    }
}

impl Default for DataAttributeAnnotator {
    fn default() -> Self {
        Self::new(true, crate::constants::DEFAULT_DEBUG_ATTRIBUTE)
    }
}

impl DebugAnnotator for DataAttributeAnnotator {
    fn attach(
        &self,
        tree: &mut Tree,
        target: DebugTarget<'_>,
        _state: &CompilationState,
    ) -> Result<(), TransformError> {
        if !self.enabled {
            return Ok(());
        }
        let classes = Self::format_prop(target.raw_classes);
        if self.extend_existing(tree, &target.attributes, &classes) {
            return Ok(());
        }
        let attribute = self.new_attribute(tree, classes);
        if !tree.insert_after(target.path, attribute) {
            return Err(TransformError::MissingElement {
                span: tree.span(target.path),
            });
        }
        Ok(())
    }

    fn attach_existing(
        &self,
        tree: &mut Tree,
        target: DebugTarget<'_>,
        _state: &CompilationState,
    ) -> Result<(), TransformError> {
        if !self.enabled {
            return Ok(());
        }
        let classes = Self::format_prop(target.raw_classes);
        if self.extend_existing(tree, &target.attributes, &classes) {
            return Ok(());
        }
        let attribute = self.new_attribute(tree, classes);
        if !tree.push_container(target.path, attribute) {
            return Err(TransformError::MissingElement {
                span: tree.span(target.path),
            });
        }
        Ok(())
    }
}
