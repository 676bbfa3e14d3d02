use js_sys::{Function, Reflect};
use tw2css_core::ast::{NodeId, Tree};
use tw2css_core::config::Config;
use tw2css_core::debug::DataAttributeAnnotator;
use tw2css_core::rewriter::Collaborators;
use tw2css_core::state::CompilationState;
use tw2css_core::style::{RuntimeCallGenerator, StyleGenerator};
use tw2css_core::template::StaticTemplateParser;
use tw2css_core::TransformError;
use wasm_bindgen::prelude::*;

/// Rewrites `tw` props and templates in `source`.
///
/// `options` has the same shape as the TOML config (`{ options, generator,
/// debug }`). An optional `generate(classes) => string` function replaces the
/// default style generator; the string it returns is parsed as an expression.
#[wasm_bindgen]
pub fn transform(source: &str, options: JsValue) -> Result<String, JsError> {
    let config = if options.is_undefined() || options.is_null() {
        Config::default()
    } else {
        serde_wasm_bindgen::from_value(options.clone()).map_err(|e| JsError::new(&e.to_string()))?
    };

    let annotator = DataAttributeAnnotator::new(config.debug.enabled, &config.debug.attribute);
    let output = match get_function(&options, "generate") {
        Some(callback) => {
            let generator = JsStyleGenerator { callback };
            let collaborators = Collaborators {
                generator: &generator,
                template_parser: &StaticTemplateParser,
                annotator: &annotator,
            };
            tw2css_core::transform_with(source, &config, &collaborators)
        }
        None => {
            let generator = RuntimeCallGenerator::new(&config.generator.callee);
            let collaborators = Collaborators {
                generator: &generator,
                template_parser: &StaticTemplateParser,
                annotator: &annotator,
            };
            tw2css_core::transform_with(source, &config, &collaborators)
        }
    }
    .map_err(|e| JsError::new(&e.to_string()))?;

    Ok(output.code)
}

/// Style generator backed by a JS callback returning expression source.
struct JsStyleGenerator {
    callback: Function,
}

impl StyleGenerator for JsStyleGenerator {
    fn generate(
        &self,
        raw_classes: &str,
        tree: &mut Tree,
        _state: &mut CompilationState,
    ) -> Result<NodeId, TransformError> {
        let failed = |message: String| TransformError::Generator { message, span: None };

        let result = self
            .callback
            .call1(&JsValue::NULL, &JsValue::from_str(raw_classes))
            .map_err(|e| failed(e.as_string().unwrap_or_else(|| "generate() threw".to_string())))?;
        let code = result
            .as_string()
            .ok_or_else(|| failed("generate() must return a string".to_string()))?;
        tree.parse_detached(&code).map_err(|e| failed(e.to_string()))
    }
}

fn get_function(obj: &JsValue, key: &str) -> Option<Function> {
    if obj.is_undefined() || obj.is_null() {
        return None;
    }
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .filter(|v| v.is_function())
        .map(|v| v.unchecked_into())
}
