pub mod ast;
pub mod config;
pub mod constants;
pub mod debug;
pub mod error;
pub mod parser;
pub mod printer;
pub mod rewriter;
pub mod state;
pub mod style;
pub mod template;
pub mod tokenizer;
pub mod transform;

use thiserror::Error;

use config::Config;
use debug::DataAttributeAnnotator;
use rewriter::Collaborators;
use style::RuntimeCallGenerator;
use template::StaticTemplateParser;

pub use error::TransformError;
pub use parser::ParseError;
pub use transform::{transform_with, Diagnostic, TransformOutput};

/// Rewrites every `tw` prop and `tw` template in a JS/JSX module, using the
/// collaborators described by `config`.
pub fn transform(source: &str, config: &Config) -> Result<TransformOutput, Error> {
    let generator = RuntimeCallGenerator::new(&config.generator.callee);
    let annotator = DataAttributeAnnotator::new(config.debug.enabled, &config.debug.attribute);
    let collaborators = Collaborators {
        generator: &generator,
        template_parser: &StaticTemplateParser,
        annotator: &annotator,
    };
    transform_with(source, config, &collaborators)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{line}:{column}: {source}")]
    Parse {
        line: usize,
        column: usize,
        source: ParseError,
    },
    #[error("{line}:{column}: {source}")]
    Transform {
        line: usize,
        column: usize,
        source: TransformError,
    },
}

impl Error {
    /// 1-based line and column the error points at.
    pub fn location(&self) -> (usize, usize) {
        match self {
            Self::Parse { line, column, .. } | Self::Transform { line, column, .. } => (*line, *column),
        }
    }
}
