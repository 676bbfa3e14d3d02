//! The rewriting engine: `tw` attributes and `tw` tagged templates.
//!
//! Handlers are callbacks over the tree. Each one validates the node it was
//! given before touching anything, so an error always leaves that node as it
//! was parsed. Sibling attributes are looked up on the live tree every time;
//! nothing is cached between calls.

use crate::ast::{find_attribute_by_name, NodeId, NodeKind, NodeType, Tree};
use crate::constants::{SHORTHAND_ATTRIBUTE, STYLE_ATTRIBUTE};
use crate::debug::{DebugAnnotator, DebugTarget};
use crate::error::TransformError;
use crate::state::CompilationState;
use crate::style::StyleGenerator;
use crate::template::TemplateParser;

/// The pluggable pieces the handlers delegate to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub generator: &'a dyn StyleGenerator,
    pub template_parser: &'a dyn TemplateParser,
    pub annotator: &'a dyn DebugAnnotator,
}

/// Handles one JSX attribute.
///
/// `css` attributes are only recorded. A `tw` attribute is compiled into a
/// `css` attribute, or merged into the element's existing one.
pub fn handle_tw_property(
    tree: &mut Tree,
    attribute: NodeId,
    state: &mut CompilationState,
    collaborators: &Collaborators<'_>,
) -> Result<(), TransformError> {
    let Some(name) = tree.attribute_name(attribute) else {
        return Ok(());
    };
    if name == STYLE_ATTRIBUTE {
        state.has_css_prop = true;
        return Ok(());
    }
    if name != SHORTHAND_ATTRIBUTE {
        return Ok(());
    }
    state.has_tw_prop = true;

    let raw_classes = shorthand_value(tree, attribute)?;
    let element = tree
        .find_ancestor_of_type(attribute, NodeType::OpeningElement)
        .ok_or(TransformError::MissingElement {
            span: tree.span(attribute),
        })?;
    let attributes = tree.attributes(element).to_vec();

    match find_attribute_by_name(tree, &attributes, STYLE_ATTRIBUTE) {
        Some(index) => merge_into_style_attribute(
            tree,
            attribute,
            attributes[index],
            element,
            &raw_classes,
            state,
            collaborators,
        ),
        None => replace_with_style_attribute(tree, attribute, attributes, &raw_classes, state, collaborators),
    }
}

/// The class string of a `tw` attribute: `tw="…"`, `tw={"…"}` or a bare `tw`.
fn shorthand_value(tree: &Tree, attribute: NodeId) -> Result<String, TransformError> {
    let Some(value) = tree.attribute_value(attribute) else {
        return Ok(String::new());
    };
    match tree.kind(value) {
        NodeKind::Str { value, .. } => Ok(value.clone()),
        NodeKind::ExprContainer {
            expression: Some(expression),
        } => match tree.kind(*expression) {
            NodeKind::Str { value, .. } => Ok(value.clone()),
            _ => Err(TransformError::InvalidShorthandValue {
                span: tree.span(*expression),
            }),
        },
        _ => Err(TransformError::InvalidShorthandValue {
            span: tree.span(value),
        }),
    }
}

/// The expression inside `css={…}`, if there is one.
fn style_expression(tree: &Tree, style_attribute: NodeId) -> Option<NodeId> {
    match tree.kind(tree.attribute_value(style_attribute)?) {
        NodeKind::ExprContainer { expression } => *expression,
        _ => None,
    }
}

fn merge_into_style_attribute(
    tree: &mut Tree,
    attribute: NodeId,
    style_attribute: NodeId,
    element: NodeId,
    raw_classes: &str,
    state: &mut CompilationState,
    collaborators: &Collaborators<'_>,
) -> Result<(), TransformError> {
    let expression = style_expression(tree, style_attribute).ok_or(TransformError::EmptyStyleAttribute {
        span: tree.span(style_attribute),
    })?;
    let styles = collaborators.generator.generate(raw_classes, tree, state)?;

    tree.remove(attribute);
    if tree.node_type(expression) == NodeType::Array {
        // Appended last so the tw classes win over what css already had.
        log::debug!("tw: appending {raw_classes:?} to existing css array");
        tree.push_container(expression, styles);
    } else {
        log::debug!("tw: wrapping existing css expression with {raw_classes:?}");
        tree.replace_with(expression, |tree, original| {
            tree.alloc_synthetic(NodeKind::Array {
                elements: vec![original, styles],
            })
        });
    }

    let target = DebugTarget {
        attributes: tree.attributes(element).to_vec(),
        raw_classes,
        path: element,
    };
    collaborators.annotator.attach_existing(tree, target, state)
}

fn replace_with_style_attribute(
    tree: &mut Tree,
    attribute: NodeId,
    attributes: Vec<NodeId>,
    raw_classes: &str,
    state: &mut CompilationState,
    collaborators: &Collaborators<'_>,
) -> Result<(), TransformError> {
    let styles = collaborators.generator.generate(raw_classes, tree, state)?;

    log::debug!("tw: replacing with css for {raw_classes:?}");
    let container = tree.alloc_synthetic(NodeKind::ExprContainer {
        expression: Some(styles),
    });
    let style_attribute = tree.alloc_synthetic(NodeKind::Attribute {
        name: STYLE_ATTRIBUTE.to_string(),
        value: Some(container),
    });
    tree.replace_with_location(attribute, style_attribute);

    let target = DebugTarget {
        attributes,
        raw_classes,
        path: style_attribute,
    };
    collaborators.annotator.attach(tree, target, state)
}

/// Handles every reference to the style-builder binding.
///
/// References are independent: one failing does not stop the others. All
/// errors are returned so the caller can decide whether they are fatal.
pub fn handle_tw_function(
    tree: &mut Tree,
    references: &[NodeId],
    state: &mut CompilationState,
    collaborators: &Collaborators<'_>,
) -> Vec<TransformError> {
    references
        .iter()
        .filter_map(|reference| handle_tw_reference(tree, *reference, state, collaborators).err())
        .collect()
}

/// Handles a single reference to the style-builder binding.
pub fn handle_tw_reference(
    tree: &mut Tree,
    reference: NodeId,
    state: &mut CompilationState,
    collaborators: &Collaborators<'_>,
) -> Result<(), TransformError> {
    if !tree.is_attached(reference) {
        log::trace!("tw: reference {reference:?} was already rewritten away");
        return Ok(());
    }
    let Some(template) = tree.find_ancestor_of_type(reference, NodeType::TaggedTemplate) else {
        return Ok(());
    };

    if !state.allow_style_prop {
        let attribute = tree.find_ancestor_of_type(template, NodeType::Attribute);
        let attribute_name = attribute.and_then(|attribute| tree.attribute_name(attribute));
        if attribute_name != Some(STYLE_ATTRIBUTE) {
            return Err(TransformError::StyleAttributeRestriction {
                span: tree.span(template),
            });
        }
    }

    let styled_identifier = state.styled_identifier.clone();
    let Some(parsed) =
        collaborators
            .template_parser
            .parse(tree, template, styled_identifier.as_deref(), state)
    else {
        log::debug!("tw: template at {:?} is not static, skipping", tree.span(template));
        return Ok(());
    };
    let raw_classes = parsed.string;

    if let Some(element) = tree.find_ancestor_of_type(reference, NodeType::OpeningElement) {
        let target = DebugTarget {
            attributes: tree.attributes(element).to_vec(),
            raw_classes: &raw_classes,
            path: element,
        };
        collaborators.annotator.attach_existing(tree, target, state)?;
    }

    let styles = collaborators.generator.generate(&raw_classes, tree, state)?;
    log::debug!("tw: replacing template with styles for {raw_classes:?}");
    tree.replace_with_location(parsed.path, styles);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::debug::DataAttributeAnnotator;
    use crate::parser::parse;
    use crate::printer::print;
    use crate::style::RuntimeCallGenerator;
    use crate::template::StaticTemplateParser;
    use pretty_assertions::assert_eq;

    struct Fixture {
        generator: RuntimeCallGenerator,
        template_parser: StaticTemplateParser,
        annotator: DataAttributeAnnotator,
    }

    impl Fixture {
        fn new(debug: bool) -> Self {
            Self {
                generator: RuntimeCallGenerator::new("gen"),
                template_parser: StaticTemplateParser,
                annotator: DataAttributeAnnotator::new(debug, "data-tw"),
            }
        }

        fn collaborators(&self) -> Collaborators<'_> {
            Collaborators {
                generator: &self.generator,
                template_parser: &self.template_parser,
                annotator: &self.annotator,
            }
        }
    }

    fn of_type(tree: &Tree, node_type: NodeType) -> Vec<NodeId> {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|id| tree.node_type(*id) == node_type)
            .collect()
    }

    /// Runs the attribute handler over every attribute, the way the driver does.
    fn rewrite_attributes(source: &str, debug: bool) -> (Result<(), TransformError>, String, CompilationState) {
        let fixture = Fixture::new(debug);
        let mut tree = parse(source).unwrap();
        let mut state = CompilationState::default();
        let mut result = Ok(());
        for attribute in of_type(&tree, NodeType::Attribute) {
            if !tree.is_attached(attribute) {
                continue;
            }
            result = handle_tw_property(&mut tree, attribute, &mut state, &fixture.collaborators());
            if result.is_err() {
                break;
            }
        }
        (result, print(&tree).code, state)
    }

    fn rewrite_references(source: &str, allow_style_prop: bool) -> (Vec<TransformError>, String) {
        let fixture = Fixture::new(false);
        let mut tree = parse(source).unwrap();
        let mut state = CompilationState {
            allow_style_prop,
            styled_identifier: Some("tw".to_string()),
            ..Default::default()
        };
        let references: Vec<NodeId> = of_type(&tree, NodeType::Ident)
            .into_iter()
            .filter(|id| matches!(tree.kind(*id), NodeKind::Ident(name) if name == "tw"))
            .collect();
        let errors = handle_tw_function(&mut tree, &references, &mut state, &fixture.collaborators());
        (errors, print(&tree).code)
    }

    #[test_log::test]
    fn test_replace_branch() {
        let (result, code, state) = rewrite_attributes(r#"<div tw="text-black" />"#, true);
        assert_eq!(result, Ok(()));
        assert_eq!(code, r#"<div css={gen("text-black")} data-tw="text-black" />"#);
        assert!(state.has_tw_prop);
        assert!(!state.has_css_prop);
    }

    #[test_log::test]
    fn test_replace_branch_keeps_position() {
        let (_, code, _) = rewrite_attributes(r#"<div id="a" tw="mt-2" role="b" />"#, false);
        assert_eq!(code, r#"<div id="a" css={gen("mt-2")} role="b" />"#);
    }

    #[test_log::test]
    fn test_expression_string_value() {
        let (_, code, _) = rewrite_attributes(r#"<div tw={"text-black"} />"#, false);
        assert_eq!(code, r#"<div css={gen("text-black")} />"#);
    }

    #[test_log::test]
    fn test_valueless_shorthand_is_empty_string() {
        let (_, code, _) = rewrite_attributes("<div tw />", false);
        assert_eq!(code, r#"<div css={gen("")} />"#);
    }

    #[test_log::test]
    fn test_merge_into_array() {
        let (result, code, state) = rewrite_attributes(r#"<div css={[a]} tw="text-black" />"#, true);
        assert_eq!(result, Ok(()));
        assert_eq!(code, r#"<div css={[a, gen("text-black")]} data-tw="text-black" />"#);
        assert!(state.has_css_prop);
        assert!(state.has_tw_prop);
    }

    #[test_log::test]
    fn test_merge_array_keeps_existing_elements() {
        let (_, code, _) = rewrite_attributes(r#"<div tw="mt-1" css={[a, b.c, f(x)]} />"#, false);
        assert_eq!(code, r#"<div css={[a, b.c, f(x), gen("mt-1")]} />"#);
    }

    #[test_log::test]
    fn test_merge_single_expression() {
        let (result, code, _) = rewrite_attributes(r#"<div css={a} tw="text-black" />"#, true);
        assert_eq!(result, Ok(()));
        assert_eq!(code, r#"<div css={[a, gen("text-black")]} data-tw="text-black" />"#);
    }

    #[test_log::test]
    fn test_merge_is_order_independent() {
        let (_, before, _) = rewrite_attributes(r#"<div tw="p-2" css={a} />"#, false);
        let (_, after, _) = rewrite_attributes(r#"<div css={a} tw="p-2" />"#, false);
        assert_eq!(before, r#"<div css={[a, gen("p-2")]} />"#);
        assert_eq!(before, after);
    }

    #[test_log::test]
    fn test_empty_style_attribute() {
        for source in [r#"<div css="" tw="text-black" />"#, r#"<div css tw="text-black" />"#, r#"<div css={} tw="text-black" />"#] {
            let (result, code, _) = rewrite_attributes(source, true);
            assert!(matches!(result, Err(TransformError::EmptyStyleAttribute { .. })), "{source}");
            assert_eq!(code, source);
        }
    }

    #[test_log::test]
    fn test_non_string_shorthand() {
        for source in [
            r#"<div tw={classes} />"#,
            r#"<div tw={`mt-2`} />"#,
            r#"<div tw={cond ? "a" : "b"} />"#,
            r#"<div tw={} />"#,
        ] {
            let (result, code, state) = rewrite_attributes(source, true);
            assert!(matches!(result, Err(TransformError::InvalidShorthandValue { .. })), "{source}");
            assert_eq!(code, source);
            assert!(state.has_tw_prop);
        }
    }

    #[test_log::test]
    fn test_invalid_shorthand_span() {
        let source = r#"<div tw={classes} />"#;
        let (result, _, _) = rewrite_attributes(source, false);
        assert_eq!(result, Err(TransformError::InvalidShorthandValue { span: Some(Span::new(9, 16)) }));
    }

    #[test_log::test]
    fn test_other_attributes_untouched() {
        let source = r#"<div className="a" style={{ color: "red" }} {...rest} />"#;
        let (result, code, state) = rewrite_attributes(source, true);
        assert_eq!(result, Ok(()));
        assert_eq!(code, source);
        assert!(!state.has_tw_prop);
    }

    #[test_log::test]
    fn test_duplicate_shorthand_last_wins() {
        let (_, code, _) = rewrite_attributes(r#"<div tw="a" tw="b" />"#, true);
        assert_eq!(code, r#"<div css={[gen("a"), gen("b")]} data-tw="a | b" />"#);
    }

    #[test_log::test]
    fn test_nested_elements() {
        let (_, code, _) = rewrite_attributes("<ul tw=\"list-none\">\n  <li tw=\"mt-1\">x</li>\n</ul>", false);
        assert_eq!(code, "<ul css={gen(\"list-none\")}>\n  <li css={gen(\"mt-1\")}>x</li>\n</ul>");
    }

    #[test_log::test]
    fn test_replace_records_original_span() {
        let fixture = Fixture::new(false);
        let mut tree = parse(r#"<a tw="x" />"#).unwrap();
        let attribute = of_type(&tree, NodeType::Attribute)[0];
        let mut state = CompilationState::default();
        handle_tw_property(&mut tree, attribute, &mut state, &fixture.collaborators()).unwrap();
        let opening = of_type(&tree, NodeType::OpeningElement)[0];
        let css = tree.attributes(opening)[0];
        assert_eq!(tree.attribute_name(css), Some("css"));
        assert_eq!(tree.span(css), Some(Span::new(3, 9)));
    }

    #[test_log::test]
    fn test_template_in_css() {
        let (errors, code) = rewrite_references("<div css={tw`mt-2 flex`} />", false);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(code, r#"<div css={gen("mt-2 flex")} />"#);
    }

    #[test_log::test]
    fn test_template_in_css_array() {
        let (errors, code) = rewrite_references("<div css={[tw`mt-2`, a]} />", false);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(code, r#"<div css={[gen("mt-2"), a]} />"#);
    }

    #[test_log::test]
    fn test_template_debug_attribute() {
        let fixture = Fixture::new(true);
        let mut tree = parse("<div css={tw`mt-2`} />").unwrap();
        let mut state = CompilationState {
            styled_identifier: Some("tw".to_string()),
            ..Default::default()
        };
        let references = of_type(&tree, NodeType::Ident);
        let errors = handle_tw_function(&mut tree, &references, &mut state, &fixture.collaborators());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(print(&tree).code, r#"<div css={gen("mt-2")} data-tw="mt-2" />"#);
    }

    #[test_log::test]
    fn test_template_keeps_location() {
        let fixture = Fixture::new(false);
        let source = "<div css={tw`mt-2`} />";
        let mut tree = parse(source).unwrap();
        let mut state = CompilationState {
            styled_identifier: Some("tw".to_string()),
            ..Default::default()
        };
        let references = of_type(&tree, NodeType::Ident);
        handle_tw_function(&mut tree, &references, &mut state, &fixture.collaborators());

        let printed = print(&tree);
        let mapping = printed
            .mappings
            .iter()
            .find(|mapping| mapping.original == Span::new(10, 18))
            .unwrap();
        assert_eq!(&printed.code[mapping.generated..], r#"gen("mt-2")} />"#);
    }

    #[test_log::test]
    fn test_template_restricted_outside_css() {
        let source = "<div style={tw`mt-2`} />";
        let (errors, code) = rewrite_references(source, false);
        assert!(matches!(errors.as_slice(), [TransformError::StyleAttributeRestriction { .. }]));
        assert_eq!(code, source);

        let source = "const styles = tw`mt-2`;";
        let (errors, code) = rewrite_references(source, false);
        assert!(matches!(errors.as_slice(), [TransformError::StyleAttributeRestriction { .. }]));
        assert_eq!(code, source);
    }

    #[test_log::test]
    fn test_template_allowed_anywhere() {
        let (errors, code) = rewrite_references("<div style={tw`mt-2`} />", true);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(code, r#"<div style={gen("mt-2")} />"#);

        let (errors, code) = rewrite_references("const styles = tw`mt-2`;", true);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(code, r#"const styles = gen("mt-2");"#);
    }

    #[test_log::test]
    fn test_reference_outside_template_is_ignored() {
        let source = "<div css={tw} onClick={() => tw(1)} />";
        let (errors, code) = rewrite_references(source, false);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(code, source);
    }

    #[test_log::test]
    fn test_dynamic_template_is_skipped() {
        let source = "<div css={tw`mt-${size}`} />";
        let (errors, code) = rewrite_references(source, false);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(code, source);
    }

    #[test_log::test]
    fn test_one_failing_reference_does_not_stop_others() {
        let (errors, code) = rewrite_references("<a style={tw`p-1`} css={tw`p-2`} />", false);
        assert_eq!(errors.len(), 1);
        assert_eq!(code, r#"<a style={tw`p-1`} css={gen("p-2")} />"#);
    }
}
