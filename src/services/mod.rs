pub mod boundary_cache;
pub mod json_repair;
pub mod patch_applier;
pub mod placeholder;
pub mod prompt_builder;
pub mod recovery;
pub mod reference_store;
pub mod section_locator;

pub use boundary_cache::{BoundaryCache, DocumentSnapshot, SectionResolver};
pub use patch_applier::Replacement;
pub use placeholder::PlaceholderFiller;
pub use recovery::{recover, Recovered, RecoveryStage};
pub use reference_store::{section_material, InMemoryReferenceStore, ReferenceStore};
