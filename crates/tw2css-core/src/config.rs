use serde::Deserialize;

use crate::constants::{DEFAULT_DEBUG_ATTRIBUTE, DEFAULT_GENERATOR_CALLEE, DEFAULT_IMPORT_SOURCE};

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub generator: GeneratorOptions,
    #[serde(default)]
    pub debug: DebugOptions,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Options {
    /// Allow `tw` templates outside the `css` prop.
    #[serde(default)]
    pub allow_style_prop: bool,
    /// Remove the style-builder import once it has been compiled away.
    #[serde(default = "default_true")]
    pub strip_import: bool,
    /// Report failing nodes as diagnostics instead of failing the file.
    #[serde(default)]
    pub continue_on_error: bool,
    /// Only rewrite `tw` props in files that import the style builder.
    #[serde(default)]
    pub require_import: bool,
    #[serde(default = "default_import_sources")]
    pub import_sources: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            allow_style_prop: false,
            strip_import: true,
            continue_on_error: false,
            require_import: false,
            import_sources: default_import_sources(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeneratorOptions {
    /// Runtime function the default generator calls with the class string.
    #[serde(default = "default_callee")]
    pub callee: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            callee: default_callee(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DebugOptions {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_debug_attribute")]
    pub attribute: String,
}

impl Default for DebugOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            attribute: default_debug_attribute(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_import_sources() -> Vec<String> {
    vec![DEFAULT_IMPORT_SOURCE.to_string()]
}

fn default_callee() -> String {
    DEFAULT_GENERATOR_CALLEE.to_string()
}

fn default_debug_attribute() -> String {
    DEFAULT_DEBUG_ATTRIBUTE.to_string()
}

impl Config {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }
}
