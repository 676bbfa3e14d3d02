//! Static evaluation of `tw` tagged templates.

use crate::ast::{NodeId, NodeKind, Tree};
use crate::state::CompilationState;
use crate::tokenizer::unescape_js;

/// Outcome of a successful template parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    /// The raw class string the template evaluates to.
    pub string: String,
    /// Node the generated style expression replaces.
    pub path: NodeId,
}

pub trait TemplateParser {
    /// Resolves `template` to a class string, or `None` when its contents are
    /// not known at compile time.
    fn parse(
        &self,
        tree: &mut Tree,
        template: NodeId,
        styled_identifier: Option<&str>,
        state: &CompilationState,
    ) -> Option<ParsedTemplate>;
}

/// Folds templates tagged with the bare style-builder identifier.
///
/// Interpolations are accepted when they are string or number literals.
/// Anything else (variables, calls, `tw.div` tags) makes the template dynamic.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTemplateParser;

impl TemplateParser for StaticTemplateParser {
    fn parse(
        &self,
        tree: &mut Tree,
        template: NodeId,
        styled_identifier: Option<&str>,
        _state: &CompilationState,
    ) -> Option<ParsedTemplate> {
        let NodeKind::TaggedTemplate {
            tag,
            quasis,
            expressions,
        } = tree.kind(template)
        else {
            return None;
        };
        match tree.kind(*tag) {
            NodeKind::Ident(name) if Some(name.as_str()) == styled_identifier => {}
            _ => return None,
        }

        let mut string = String::new();
        for (index, quasi) in quasis.iter().enumerate() {
            string.push_str(&unescape_js(quasi));
            if let Some(expression) = expressions.get(index) {
                match literal_text(tree, *expression) {
                    Some(text) => string.push_str(&text),
                    None => {
                        log::debug!("template at {:?} is dynamic, leaving it alone", tree.span(template));
                        return None;
                    }
                }
            }
        }

        Some(ParsedTemplate {
            string,
            path: template,
        })
    }
}

fn literal_text(tree: &Tree, id: NodeId) -> Option<String> {
    match tree.kind(id) {
        NodeKind::Str { value, .. } => Some(value.clone()),
        // Numbers are not modelled by the parser and arrive as opaque code.
        NodeKind::Fragment { parts } => match parts.as_slice() {
            [only] => match tree.kind(*only) {
                NodeKind::Code(code) if code.trim().parse::<f64>().is_ok() => Some(code.trim().to_string()),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}
