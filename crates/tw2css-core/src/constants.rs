/// Attribute compiled away into [`STYLE_ATTRIBUTE`].
pub const SHORTHAND_ATTRIBUTE: &str = "tw";

/// Attribute holding the final style expression(s).
pub const STYLE_ATTRIBUTE: &str = "css";

/// Named export of the style builder, used when there is no default import.
pub const STYLE_BUILDER_EXPORT: &str = "tw";

pub const DEFAULT_IMPORT_SOURCE: &str = "twin.macro";

pub const DEFAULT_GENERATOR_CALLEE: &str = "twStyles";

pub const DEFAULT_DEBUG_ATTRIBUTE: &str = "data-tw";
