//! Partial JavaScript/JSX parser.
//!
//! Only what the rewrite needs is modelled: imports, JSX elements with their
//! attributes and children, tagged templates, and the handful of expression
//! forms that appear in `tw`/`css` props. Everything else stays opaque
//! [`NodeKind::Code`], scanned just deep enough to find nested JSX.

use thiserror::Error;

use crate::ast::*;
use crate::tokenizer::*;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

/// Parses a whole module into a tree.
pub fn parse(source: &str) -> Result<Tree, ParseError> {
    let mut tree = Tree::new(source);
    let body = Parser::new(source, &mut tree, false).parse_code(0, source.len())?;
    tree.set_body(body);
    log::trace!("parse: {} nodes", tree.len());
    Ok(tree)
}

impl Tree {
    /// Parses an expression snippet into detached, synthetic nodes of this
    /// tree. Used when a style generator hands back source code.
    pub fn parse_detached(&mut self, code: &str) -> Result<NodeId, ParseError> {
        Parser::new(code, self, true).parse_expression(0, code.len())
    }
}

struct Parser<'a> {
    src: &'a str,
    tree: &'a mut Tree,
    synthetic: bool,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, tree: &'a mut Tree, synthetic: bool) -> Self {
        Self {
            src,
            tree,
            synthetic,
        }
    }

    fn node(&mut self, kind: NodeKind, lo: usize, hi: usize) -> NodeId {
        if self.synthetic {
            self.tree.alloc_synthetic(kind)
        } else {
            self.tree.alloc(kind, Span::new(lo, hi))
        }
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> ParseError {
        ParseError {
            message: message.into(),
            offset,
        }
    }

    fn flush_code(&mut self, parts: &mut Vec<NodeId>, lo: usize, hi: usize) {
        if lo < hi {
            let code = self.src[lo..hi].to_string();
            parts.push(self.node(NodeKind::Code(code), lo, hi));
        }
    }

    /// Scans opaque code in `lo..hi`, lifting out imports, JSX and tagged templates.
    fn parse_code(&mut self, lo: usize, hi: usize) -> Result<Vec<NodeId>, ParseError> {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut parts = Vec::new();
        let mut flushed = lo;
        let mut i = lo;

        while i < hi {
            match bytes[i] {
                b'"' | b'\'' => {
                    i = skip_string(bytes, i).unwrap_or(i + 1);
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    i = skip_line_comment(bytes, i);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = skip_block_comment(bytes, i).unwrap_or(hi);
                }
                b'`' => {
                    if let Some(tag_lo) = self.tag_start(flushed, i) {
                        self.flush_code(&mut parts, flushed, tag_lo);
                        let (node, end) = self.parse_tagged_template(tag_lo, i)?;
                        parts.push(node);
                        i = end;
                        flushed = end;
                    } else {
                        i = skip_template(src, i)
                            .ok_or_else(|| self.error("Unterminated template literal", i))?;
                    }
                }
                b'i' if self.import_starts(lo, i) => match self.parse_import(i, hi) {
                    Some((node, end)) => {
                        self.flush_code(&mut parts, flushed, i);
                        parts.push(node);
                        i = end;
                        flushed = end;
                    }
                    None => i += 1,
                },
                b'<' if jsx_may_start(src, i) => match self.parse_element(i, hi)? {
                    Some((node, end)) => {
                        self.flush_code(&mut parts, flushed, i);
                        parts.push(node);
                        i = end;
                        flushed = end;
                    }
                    None => i += 1,
                },
                _ => i += 1,
            }
        }

        self.flush_code(&mut parts, flushed, hi.max(flushed));
        Ok(parts)
    }

    fn import_starts(&self, lo: usize, i: usize) -> bool {
        let bytes = self.src.as_bytes();
        self.src[i..].starts_with("import")
            && bytes
                .get(i + 6)
                .is_some_and(|b| b.is_ascii_whitespace() || *b == b'{' || *b == b'*')
            && (i == lo || !is_ident_char(bytes[i - 1]))
            && at_line_start(self.src, i)
    }

    /// Start of the identifier (or `a.b` chain) tagging the template at `tick`.
    fn tag_start(&self, flushed: usize, tick: usize) -> Option<usize> {
        let bytes = self.src.as_bytes();
        let mut start = tick;
        while start > flushed && (is_ident_char(bytes[start - 1]) || bytes[start - 1] == b'.') {
            start -= 1;
        }
        let tag = &self.src[start..tick];
        if tag.is_empty() || !is_ident_start(bytes[start]) || tag.split('.').any(str::is_empty) {
            return None;
        }
        if !tag.contains('.') && ends_with_keyword(tag) {
            return None;
        }
        Some(start)
    }

    fn parse_tag(&mut self, lo: usize, hi: usize) -> NodeId {
        let src = self.src;
        let mut segments = src[lo..hi].split('.');
        let first = segments.next().unwrap_or_default();
        let mut end = lo + first.len();
        let mut node = self.node(NodeKind::Ident(first.to_string()), lo, end);
        for property in segments {
            end += 1 + property.len();
            node = self.node(
                NodeKind::Member {
                    object: node,
                    property: property.to_string(),
                },
                lo,
                end,
            );
        }
        node
    }

    fn parse_tagged_template(&mut self, tag_lo: usize, tick: usize) -> Result<(NodeId, usize), ParseError> {
        let tag = self.parse_tag(tag_lo, tick);
        self.finish_tagged_template(tag, tag_lo, tick)
    }

    fn finish_tagged_template(
        &mut self,
        tag: NodeId,
        lo: usize,
        tick: usize,
    ) -> Result<(NodeId, usize), ParseError> {
        let parts = template_parts(self.src, tick)
            .ok_or_else(|| self.error("Unterminated template literal", tick))?;
        let expressions = parts
            .expressions
            .iter()
            .map(|(expr_lo, expr_hi)| self.parse_expression(*expr_lo, *expr_hi))
            .collect::<Result<Vec<_>, _>>()?;
        let node = self.node(
            NodeKind::TaggedTemplate {
                tag,
                quasis: parts.quasis,
                expressions,
            },
            lo,
            parts.end,
        );
        Ok((node, parts.end))
    }

    /// `import … from '…'` starting at `lo`. Dynamic `import(…)` and anything
    /// without a source string is left to the code scanner.
    fn parse_import(&mut self, lo: usize, hi: usize) -> Option<(NodeId, usize)> {
        let src = self.src;
        let bytes = src.as_bytes();
        let clause_lo = lo + "import".len();

        let mut quote = clause_lo;
        while quote < hi && bytes[quote] != b'"' && bytes[quote] != b'\'' {
            if matches!(bytes[quote], b'(' | b';') {
                return None;
            }
            quote += 1;
        }
        if quote >= hi {
            return None;
        }
        let source_end = skip_string(bytes, quote)?;
        let source = src[quote + 1..source_end - 1].to_string();

        let clause = src[clause_lo..quote].trim();
        let clause = clause.strip_suffix("from").unwrap_or(clause).trim();
        let clause = clause.strip_prefix("type ").unwrap_or(clause);
        let (default, named) = parse_import_clause(clause);

        let mut end = source_end;
        while end < hi && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
        if end < hi && bytes[end] == b';' {
            end += 1;
        }
        if src[end..].starts_with("\r\n") {
            end += 2;
        } else if src[end..].starts_with('\n') {
            end += 1;
        }

        let import = ImportDecl {
            source,
            default,
            named,
            raw: src[lo..end].to_string(),
        };
        Some((self.node(NodeKind::Import(import), lo, end), end))
    }

    /// Parses an expression spanning `lo..hi`. Forms outside the modelled
    /// subset become a [`NodeKind::Fragment`].
    fn parse_expression(&mut self, lo: usize, hi: usize) -> Result<NodeId, ParseError> {
        let bytes = self.src.as_bytes();
        let start = skip_whitespace(bytes, lo, hi);
        let mut end = hi;
        while end > start && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        if start == end {
            return Ok(self.node(NodeKind::Fragment { parts: vec![] }, lo, hi));
        }

        if let Some((node, stop)) = self.parse_primary(start, end)? {
            if skip_whitespace(bytes, stop, end) == end {
                return Ok(node);
            }
        }

        let parts = self.parse_code(start, end)?;
        Ok(self.node(NodeKind::Fragment { parts }, start, end))
    }

    fn parse_primary(&mut self, lo: usize, hi: usize) -> Result<Option<(NodeId, usize)>, ParseError> {
        let src = self.src;
        let bytes = src.as_bytes();

        let (node, end) = match bytes[lo] {
            b'"' | b'\'' => {
                let Some(end) = skip_string(bytes, lo).filter(|end| *end <= hi) else {
                    return Ok(None);
                };
                let value = unescape_js(&src[lo + 1..end - 1]);
                let kind = NodeKind::Str {
                    value,
                    quote: bytes[lo] as char,
                };
                (self.node(kind, lo, end), end)
            }
            b'[' => {
                let Some(close) = find_matching(src, lo).filter(|close| *close < hi) else {
                    return Ok(None);
                };
                let Some(segments) = split_top_level(src, lo + 1, close) else {
                    return Ok(None);
                };
                let elements = segments
                    .into_iter()
                    .map(|(seg_lo, seg_hi)| self.parse_expression(seg_lo, seg_hi))
                    .collect::<Result<Vec<_>, _>>()?;
                (self.node(NodeKind::Array { elements }, lo, close + 1), close + 1)
            }
            b'<' => return self.parse_element(lo, hi),
            b if is_ident_start(b) => {
                let end = scan_identifier(bytes, lo);
                let ident = src[lo..end].to_string();
                (self.node(NodeKind::Ident(ident), lo, end), end)
            }
            _ => return Ok(None),
        };

        self.parse_postfix(node, lo, end, hi)
    }

    /// Member access, calls and template tags following a primary expression.
    fn parse_postfix(
        &mut self,
        mut node: NodeId,
        lo: usize,
        mut pos: usize,
        hi: usize,
    ) -> Result<Option<(NodeId, usize)>, ParseError> {
        let src = self.src;
        let bytes = src.as_bytes();

        while pos < hi {
            match bytes[pos] {
                b'.' if pos + 1 < hi && is_ident_start(bytes[pos + 1]) => {
                    let end = scan_identifier(bytes, pos + 1);
                    let property = src[pos + 1..end].to_string();
                    node = self.node(NodeKind::Member { object: node, property }, lo, end);
                    pos = end;
                }
                b'(' => {
                    let Some(close) = find_matching(src, pos).filter(|close| *close < hi) else {
                        return Ok(None);
                    };
                    let Some(segments) = split_top_level(src, pos + 1, close) else {
                        return Ok(None);
                    };
                    let arguments = segments
                        .into_iter()
                        .map(|(arg_lo, arg_hi)| self.parse_expression(arg_lo, arg_hi))
                        .collect::<Result<Vec<_>, _>>()?;
                    node = self.node(
                        NodeKind::Call {
                            callee: node,
                            arguments,
                        },
                        lo,
                        close + 1,
                    );
                    pos = close + 1;
                }
                b'`' => {
                    if template_parts(src, pos).map_or(true, |parts| parts.end > hi) {
                        return Ok(None);
                    }
                    let (template, end) = self.finish_tagged_template(node, lo, pos)?;
                    node = template;
                    pos = end;
                }
                _ => break,
            }
        }
        Ok(Some((node, pos)))
    }

    fn parse_container_expression(&mut self, lo: usize, hi: usize) -> Result<Option<NodeId>, ParseError> {
        if self.src[lo..hi].trim().is_empty() {
            return Ok(None);
        }
        self.parse_expression(lo, hi).map(Some)
    }

    /// Parses the JSX element opening at `lo`.
    ///
    /// Returns `Ok(None)` when the text turns out not to be a tag at all, and
    /// an error once a well-formed opening tag has no matching close.
    fn parse_element(&mut self, lo: usize, hi: usize) -> Result<Option<(NodeId, usize)>, ParseError> {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut pos = lo + 1;
        if pos >= hi {
            return Ok(None);
        }

        let name_end = if bytes[pos] == b'>' {
            pos
        } else {
            let end = scan_jsx_name(bytes, pos);
            if end == pos {
                return Ok(None);
            }
            end
        };
        let name = src[pos..name_end].to_string();
        pos = name_end;

        let mut attributes = Vec::new();
        let self_closing = loop {
            pos = skip_whitespace(bytes, pos, hi);
            if pos >= hi {
                return Ok(None);
            }
            match bytes[pos] {
                b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                    pos += 2;
                    break true;
                }
                b'>' => {
                    pos += 1;
                    break false;
                }
                b'{' => {
                    let Some(close) = find_matching(src, pos).filter(|close| *close < hi) else {
                        return Ok(None);
                    };
                    let inner = skip_whitespace(bytes, pos + 1, close);
                    if !src[inner..close].starts_with("...") {
                        return Ok(None);
                    }
                    let argument = self.parse_expression(inner + 3, close)?;
                    attributes.push(self.node(NodeKind::SpreadAttribute { argument }, pos, close + 1));
                    pos = close + 1;
                }
                b if is_ident_start(b) => match self.parse_attribute(pos, hi)? {
                    Some((attribute, end)) => {
                        attributes.push(attribute);
                        pos = end;
                    }
                    None => return Ok(None),
                },
                _ => return Ok(None),
            }
        };

        let opening = self.node(
            NodeKind::OpeningElement {
                name: name.clone(),
                attributes,
                self_closing,
            },
            lo,
            pos,
        );

        if self_closing {
            let element = self.node(
                NodeKind::Element {
                    opening,
                    children: vec![],
                    closing: None,
                },
                lo,
                pos,
            );
            return Ok(Some((element, pos)));
        }

        let (children, closing, end) = self.parse_children(&name, lo, pos, hi)?;
        let element = self.node(
            NodeKind::Element {
                opening,
                children,
                closing: Some(closing),
            },
            lo,
            end,
        );
        Ok(Some((element, end)))
    }

    fn parse_attribute(&mut self, lo: usize, hi: usize) -> Result<Option<(NodeId, usize)>, ParseError> {
        let src = self.src;
        let bytes = src.as_bytes();
        let name_end = scan_jsx_name(bytes, lo);
        let name = src[lo..name_end].to_string();

        let eq = skip_whitespace(bytes, name_end, hi);
        if eq >= hi || bytes[eq] != b'=' {
            let attribute = self.node(NodeKind::Attribute { name, value: None }, lo, name_end);
            return Ok(Some((attribute, name_end)));
        }

        let value_lo = skip_whitespace(bytes, eq + 1, hi);
        if value_lo >= hi {
            return Ok(None);
        }
        let (value, end) = match bytes[value_lo] {
            quote @ (b'"' | b'\'') => {
                // JSX attribute strings have no escapes.
                let Some(offset) = src[value_lo + 1..hi].find(quote as char) else {
                    return Ok(None);
                };
                let close = value_lo + 1 + offset;
                let kind = NodeKind::Str {
                    value: src[value_lo + 1..close].to_string(),
                    quote: quote as char,
                };
                (self.node(kind, value_lo, close + 1), close + 1)
            }
            b'{' => {
                let Some(close) = find_matching(src, value_lo).filter(|close| *close < hi) else {
                    return Ok(None);
                };
                let expression = self.parse_container_expression(value_lo + 1, close)?;
                let container = self.node(NodeKind::ExprContainer { expression }, value_lo, close + 1);
                (container, close + 1)
            }
            b'<' => match self.parse_element(value_lo, hi)? {
                Some(parsed) => parsed,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        let attribute = self.node(
            NodeKind::Attribute {
                name,
                value: Some(value),
            },
            lo,
            end,
        );
        Ok(Some((attribute, end)))
    }

    fn parse_children(
        &mut self,
        name: &str,
        lo: usize,
        mut pos: usize,
        hi: usize,
    ) -> Result<(Vec<NodeId>, String, usize), ParseError> {
        let src = self.src;
        let bytes = src.as_bytes();
        let mut children = Vec::new();

        loop {
            if pos >= hi {
                return Err(self.error(format!("Unclosed JSX element <{name}>: reached end of input"), lo));
            }

            if src[pos..].starts_with("</") {
                let close_lo = pos;
                let name_lo = skip_whitespace(bytes, pos + 2, hi);
                let name_end = scan_jsx_name(bytes, name_lo);
                let close_name = &src[name_lo..name_end];
                let gt = skip_whitespace(bytes, name_end, hi);
                if gt >= hi || bytes[gt] != b'>' {
                    return Err(self.error(format!("Malformed closing tag for <{name}>"), close_lo));
                }
                if close_name != name {
                    return Err(self.error(
                        format!("Unexpected closing tag </{close_name}>, expected </{name}>"),
                        close_lo,
                    ));
                }
                return Ok((children, src[close_lo..gt + 1].to_string(), gt + 1));
            }

            match bytes[pos] {
                b'<' => match self.parse_element(pos, hi)? {
                    Some((child, end)) => {
                        children.push(child);
                        pos = end;
                    }
                    None => return Err(self.error(format!("Unexpected `<` inside <{name}>"), pos)),
                },
                b'{' => {
                    let close = find_matching(src, pos)
                        .filter(|close| *close < hi)
                        .ok_or_else(|| self.error("Unclosed JSX expression container", pos))?;
                    let expression = self.parse_container_expression(pos + 1, close)?;
                    children.push(self.node(NodeKind::ExprContainer { expression }, pos, close + 1));
                    pos = close + 1;
                }
                _ => {
                    let end = src[pos..hi]
                        .find(['<', '{'])
                        .map(|offset| pos + offset)
                        .unwrap_or(hi);
                    let text = src[pos..end].to_string();
                    children.push(self.node(NodeKind::Text(text), pos, end));
                    pos = end;
                }
            }
        }
    }
}

/// Default binding and named specifiers of an import clause.
fn parse_import_clause(clause: &str) -> (Option<String>, Vec<ImportSpecifier>) {
    let mut named = Vec::new();
    let mut head = clause;

    if let Some(open) = clause.find('{') {
        let close = clause[open..].find('}').map(|c| open + c).unwrap_or(clause.len());
        for specifier in clause[open + 1..close].split(',') {
            let specifier = specifier.trim();
            let specifier = specifier.strip_prefix("type ").unwrap_or(specifier);
            if specifier.is_empty() {
                continue;
            }
            let (imported, local) = specifier
                .split_once(" as ")
                .map(|(imported, local)| (imported.trim(), local.trim()))
                .unwrap_or((specifier, specifier));
            named.push(ImportSpecifier {
                imported: imported.to_string(),
                local: local.to_string(),
            });
        }
        head = &clause[..open];
    }

    let default = head
        .split(',')
        .map(str::trim)
        .find(|part| !part.is_empty() && !part.starts_with('*'))
        .map(str::to_string);

    (default, named)
}
