pub mod json_loader;
pub mod toml_loader;

pub use json_loader::{load_document, load_json, save_json};
pub use toml_loader::load_registry;
