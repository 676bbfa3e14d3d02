//! Turns a (possibly rewritten) tree back into source text.
//!
//! Subtrees nothing touched are copied verbatim from the original source, so
//! formatting and comments survive. Rewritten subtrees are regenerated.

use crate::ast::*;

/// Links a regenerated node in the output back to where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// Byte offset in the printed output.
    pub generated: usize,
    pub original: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Printed {
    pub code: String,
    pub mappings: Vec<Mapping>,
}

pub fn print(tree: &Tree) -> Printed {
    print_node(tree, tree.root())
}

pub fn print_node(tree: &Tree, id: NodeId) -> Printed {
    let mut printer = Printer {
        tree,
        out: String::with_capacity(tree.source().len()),
        mappings: Vec::new(),
    };
    printer.emit(id);
    Printed {
        code: printer.out,
        mappings: printer.mappings,
    }
}

struct Printer<'a> {
    tree: &'a Tree,
    out: String,
    mappings: Vec<Mapping>,
}

impl Printer<'_> {
    fn emit(&mut self, id: NodeId) {
        let node = self.tree.node(id);
        if let Some(span) = node.span {
            if !node.is_dirty() {
                self.out.push_str(&self.tree.source()[span.range()]);
                return;
            }
            self.mappings.push(Mapping {
                generated: self.out.len(),
                original: span,
            });
        }

        match &node.kind {
            NodeKind::Program { body: items } | NodeKind::Fragment { parts: items } => {
                for item in items {
                    self.emit(*item);
                }
            }
            NodeKind::Code(text) | NodeKind::Text(text) => self.out.push_str(text),
            NodeKind::Import(import) => self.out.push_str(&import.raw),
            NodeKind::Element {
                opening,
                children,
                closing,
            } => {
                self.emit(*opening);
                for child in children {
                    self.emit(*child);
                }
                if let Some(closing) = closing {
                    self.out.push_str(closing);
                }
            }
            NodeKind::OpeningElement {
                name,
                attributes,
                self_closing,
            } => {
                self.out.push('<');
                self.out.push_str(name);
                for attribute in attributes {
                    self.out.push(' ');
                    self.emit(*attribute);
                }
                self.out.push_str(if *self_closing { " />" } else { ">" });
            }
            NodeKind::Attribute { name, value } => {
                self.out.push_str(name);
                if let Some(value) = value {
                    self.out.push('=');
                    self.emit(*value);
                }
            }
            NodeKind::SpreadAttribute { argument } => {
                self.out.push_str("{...");
                self.emit(*argument);
                self.out.push('}');
            }
            NodeKind::ExprContainer { expression } => {
                self.out.push('{');
                if let Some(expression) = expression {
                    self.emit(*expression);
                }
                self.out.push('}');
            }
            NodeKind::Str { value, quote } => {
                let in_attribute = node
                    .parent
                    .is_some_and(|parent| self.tree.node_type(parent) == NodeType::Attribute);
                if in_attribute {
                    self.emit_attribute_string(value, *quote);
                } else {
                    self.emit_js_string(value, *quote);
                }
            }
            NodeKind::Ident(name) => self.out.push_str(name),
            NodeKind::Array { elements } => {
                self.out.push('[');
                self.emit_list(elements);
                self.out.push(']');
            }
            NodeKind::Member { object, property } => {
                self.emit(*object);
                self.out.push('.');
                self.out.push_str(property);
            }
            NodeKind::Call { callee, arguments } => {
                self.emit(*callee);
                self.out.push('(');
                self.emit_list(arguments);
                self.out.push(')');
            }
            NodeKind::TaggedTemplate {
                tag,
                quasis,
                expressions,
            } => {
                self.emit(*tag);
                self.out.push('`');
                for (index, quasi) in quasis.iter().enumerate() {
                    self.out.push_str(quasi);
                    if let Some(expression) = expressions.get(index) {
                        self.out.push_str("${");
                        self.emit(*expression);
                        self.out.push('}');
                    }
                }
                self.out.push('`');
            }
        }
    }

    fn emit_js_string(&mut self, value: &str, quote: char) {
        self.out.push(quote);
        for c in value.chars() {
            if c == quote || c == '\\' {
                self.out.push('\\');
            }
            self.out.push(c);
        }
        self.out.push(quote);
    }

    /// JSX attribute strings have no escapes: the value is written as is
    /// between quotes it doesn't contain, or as an expression when it
    /// contains both kinds.
    fn emit_attribute_string(&mut self, value: &str, quote: char) {
        let other = if quote == '"' { '\'' } else { '"' };
        match [quote, other].into_iter().find(|q| !value.contains(*q)) {
            Some(q) => {
                self.out.push(q);
                self.out.push_str(value);
                self.out.push(q);
            }
            None => {
                self.out.push('{');
                self.emit_js_string(value, '"');
                self.out.push('}');
            }
        }
    }

    fn emit_list(&mut self, items: &[NodeId]) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.out.push_str(", ");
            }
            self.emit(*item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[test_log::test]
    fn test_untouched_source_round_trips() {
        let source = "import tw from 'twin.macro'\n\n// keep me\nexport const A = () => (\n  <div   tw=\"mt-2\"\n    css={[ a ,b ]}>\n    {cond && <span>hi</span>}\n  </div>\n)\n";
        let tree = parse(source).unwrap();
        let printed = print(&tree);
        assert_eq!(printed.code, source);
        assert!(printed.mappings.is_empty());
    }

    #[test_log::test]
    fn test_dirty_element_is_regenerated() {
        let source = "x = <div   a=\"1\"\n  b={c}>text</div>;";
        let mut tree = parse(source).unwrap();
        let opening = tree
            .descendants(tree.root())
            .into_iter()
            .find(|id| tree.node_type(*id) == NodeType::OpeningElement)
            .unwrap();
        let first = tree.attributes(opening)[0];
        tree.remove(first);
        assert_eq!(print(&tree).code, "x = <div b={c}>text</div>;");
    }

    #[test_log::test]
    fn test_synthetic_nodes() {
        let mut tree = parse("").unwrap();
        let callee = tree.alloc_synthetic(NodeKind::Ident("f".to_string()));
        let argument = tree.alloc_synthetic(NodeKind::Str {
            value: "say \"hi\"".to_string(),
            quote: '"',
        });
        let call = tree.alloc_synthetic(NodeKind::Call {
            callee,
            arguments: vec![argument],
        });
        assert_eq!(print_node(&tree, call).code, r#"f("say \"hi\"")"#);
    }

    #[test_log::test]
    fn test_attribute_strings_are_not_escaped() {
        let mut tree = parse("").unwrap();
        let mut attribute = |value: &str| {
            let value = tree.alloc_synthetic(NodeKind::Str {
                value: value.to_string(),
                quote: '"',
            });
            let attribute = tree.alloc_synthetic(NodeKind::Attribute {
                name: "data-tw".to_string(),
                value: Some(value),
            });
            print_node(&tree, attribute).code
        };
        assert_eq!(attribute(r"a\b"), r#"data-tw="a\b""#);
        assert_eq!(attribute(r#"before:content-["*"]"#), r#"data-tw='before:content-["*"]'"#);
        assert_eq!(attribute(r#"a-['x'] b-["y"]"#), r#"data-tw={"a-['x'] b-[\"y\"]"}"#);
    }

    #[test_log::test]
    fn test_replacement_records_original_location() {
        let source = "const s = tw`mt-2`;";
        let mut tree = parse(source).unwrap();
        let template = tree
            .descendants(tree.root())
            .into_iter()
            .find(|id| tree.node_type(*id) == NodeType::TaggedTemplate)
            .unwrap();
        let replacement = tree.alloc_synthetic(NodeKind::Ident("styles".to_string()));
        tree.replace_with_location(template, replacement);

        let printed = print(&tree);
        assert_eq!(printed.code, "const s = styles;");
        let mapping = printed
            .mappings
            .iter()
            .find(|mapping| mapping.original == Span::new(10, 18))
            .unwrap();
        assert_eq!(mapping.generated, 10);
    }
}
