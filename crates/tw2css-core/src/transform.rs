//! Traversal driver: parses a file, feeds every attribute and every
//! style-builder reference to the handlers, and prints the result.

use crate::ast::{ImportDecl, ImportSpecifier, NodeId, NodeKind, NodeType, Tree};
use crate::config::Config;
use crate::constants::STYLE_BUILDER_EXPORT;
use crate::error::TransformError;
use crate::parser::parse;
use crate::printer::{print, Mapping};
use crate::rewriter::{handle_tw_function, handle_tw_property, Collaborators};
use crate::state::CompilationState;
use crate::tokenizer::mentions_identifier;
use crate::Error;

/// A node-level error that was reported instead of failing the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub code: String,
    pub mappings: Vec<Mapping>,
    pub has_tw_prop: bool,
    pub has_css_prop: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// The style-builder import of a file and the local name it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleImport {
    pub node: NodeId,
    pub local: String,
}

/// Finds the first import from one of `sources` and the name it binds the
/// style builder to: the default import, or a named `tw` import.
pub fn find_style_import(tree: &Tree, sources: &[String]) -> Option<StyleImport> {
    tree.kind(tree.root()).children().into_iter().find_map(|id| {
        let NodeKind::Import(import) = tree.kind(id) else {
            return None;
        };
        if !sources.iter().any(|source| *source == import.source) {
            return None;
        }
        let local = import.default.clone().or_else(|| {
            import
                .named
                .iter()
                .find(|specifier| specifier.imported == STYLE_BUILDER_EXPORT)
                .map(|specifier| specifier.local.clone())
        })?;
        Some(StyleImport { node: id, local })
    })
}

/// Every attached identifier node called `name`, in document order.
fn references_to(tree: &Tree, name: &str) -> Vec<NodeId> {
    tree.descendants(tree.root())
        .into_iter()
        .filter(|id| matches!(tree.kind(*id), NodeKind::Ident(ident) if ident == name))
        .collect()
}

/// Whether `name` is still used outside import declarations: as an
/// identifier node, as a JSX tag, or as a token of unparsed code.
fn is_referenced(tree: &Tree, name: &str) -> bool {
    tree.descendants(tree.root())
        .into_iter()
        .any(|id| match tree.kind(id) {
            NodeKind::Ident(ident) => ident == name,
            NodeKind::Code(code) => mentions_identifier(code, name),
            NodeKind::OpeningElement { name: tag, .. } => tag.split('.').next() == Some(name),
            _ => false,
        })
}

/// Removes the style-builder import once nothing uses it. Other bindings of
/// the same declaration that are still in use keep the declaration alive
/// without the style builder.
fn strip_style_import(tree: &mut Tree, import: &StyleImport) {
    let NodeKind::Import(decl) = tree.kind(import.node) else {
        return;
    };
    let decl = decl.clone();
    if is_referenced(tree, &import.local) {
        log::debug!("transform: keeping import, {} is still referenced", import.local);
        return;
    }
    // Namespace bindings aren't tracked, so the declaration can't be rebuilt.
    if decl.raw.contains('*') {
        log::debug!("transform: keeping namespace import from {}", decl.source);
        return;
    }

    let siblings_in_use = decl
        .default
        .iter()
        .chain(decl.named.iter().map(|specifier| &specifier.local))
        .any(|local| *local != import.local && is_referenced(tree, local));
    if !siblings_in_use {
        tree.remove(import.node);
        return;
    }

    log::debug!("transform: dropping {} from the import of {}", import.local, decl.source);
    let replacement = tree.alloc_synthetic(NodeKind::Import(without_binding(&decl, &import.local)));
    tree.replace_with_location(import.node, replacement);
}

/// `import` with the binding named `local` taken out of its clause.
fn without_binding(import: &ImportDecl, local: &str) -> ImportDecl {
    let default = import.default.clone().filter(|default| default != local);
    let named: Vec<ImportSpecifier> = import
        .named
        .iter()
        .filter(|specifier| specifier.local != local)
        .cloned()
        .collect();

    let mut clause = Vec::new();
    if let Some(default) = &default {
        clause.push(default.clone());
    }
    if !named.is_empty() {
        let specifiers: Vec<String> = named
            .iter()
            .map(|specifier| {
                if specifier.imported == specifier.local {
                    specifier.local.clone()
                } else {
                    format!("{} as {}", specifier.imported, specifier.local)
                }
            })
            .collect();
        clause.push(format!("{{ {} }}", specifiers.join(", ")));
    }

    // The first quote opens the module source; everything from there on is kept.
    let tail = match import.raw.find(|c: char| c == '\'' || c == '"') {
        Some(quote) => import.raw[quote..].to_string(),
        None => format!("'{}'\n", import.source),
    };
    ImportDecl {
        source: import.source.clone(),
        default,
        named,
        raw: format!("import {} from {tail}", clause.join(", ")),
    }
}

/// Runs the whole rewrite over `source` with the given collaborators.
pub fn transform_with(
    source: &str,
    config: &Config,
    collaborators: &Collaborators<'_>,
) -> Result<TransformOutput, Error> {
    let mut tree = parse(source).map_err(|error| {
        let (line, column) = crate::tokenizer::line_col(source, error.offset);
        Error::Parse {
            line,
            column,
            source: error,
        }
    })?;
    let mut state = CompilationState::new(config);
    let mut reporter = Reporter {
        continue_on_error: config.options.continue_on_error,
        diagnostics: Vec::new(),
    };

    let style_import = find_style_import(&tree, &config.options.import_sources);
    state.styled_identifier = style_import.as_ref().map(|import| import.local.clone());
    log::debug!("transform: style builder bound to {:?}", state.styled_identifier);

    // Attributes are collected up front: handlers add and remove siblings.
    let attributes: Vec<NodeId> = if config.options.require_import && style_import.is_none() {
        log::debug!("transform: no style-builder import, leaving tw props alone");
        Vec::new()
    } else {
        tree.descendants(tree.root())
            .into_iter()
            .filter(|id| tree.node_type(*id) == NodeType::Attribute)
            .collect()
    };
    for attribute in attributes {
        if !tree.is_attached(attribute) {
            continue;
        }
        if let Err(error) = handle_tw_property(&mut tree, attribute, &mut state, collaborators) {
            reporter.report(&tree, error)?;
        }
    }

    if let Some(import) = &style_import {
        let references = references_to(&tree, &import.local);
        log::debug!("transform: {} reference(s) to {}", references.len(), import.local);
        for error in handle_tw_function(&mut tree, &references, &mut state, collaborators) {
            reporter.report(&tree, error)?;
        }

        if config.options.strip_import {
            strip_style_import(&mut tree, import);
        }
    }

    let printed = print(&tree);
    Ok(TransformOutput {
        code: printed.code,
        mappings: printed.mappings,
        has_tw_prop: state.has_tw_prop,
        has_css_prop: state.has_css_prop,
        diagnostics: reporter.diagnostics,
    })
}

/// Applies the fatal-or-recoverable policy to node errors.
struct Reporter {
    continue_on_error: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    fn report(&mut self, tree: &Tree, error: TransformError) -> Result<(), Error> {
        let (line, column) = error
            .span()
            .map(|span| tree.line_col(span.lo))
            .unwrap_or((1, 1));
        if !self.continue_on_error {
            return Err(Error::Transform {
                line,
                column,
                source: error,
            });
        }
        log::warn!("{line}:{column}: {error}");
        self.diagnostics.push(Diagnostic {
            line,
            column,
            message: error.to_string(),
        });
        Ok(())
    }
}
