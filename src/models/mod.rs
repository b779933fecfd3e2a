pub mod block;
pub mod document;
pub mod loaders;
pub mod section;

pub use block::{
    validate_sequence, BlockNode, CellAttrs, ExtraAttrs, HeadingAttrs, Mark, NodeCensus, NodeKind,
    OrderedListAttrs, DEFAULT_HEADING_LEVEL,
};
pub use document::{Document, TemplateFingerprint, DEFAULT_TITLE};
pub use loaders::{load_document, load_json, load_registry, save_json};
pub use section::{HeadingMatch, SectionPattern, SectionRange, SectionRegistry};
