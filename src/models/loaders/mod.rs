pub mod json_loader;
pub mod toml_loader;

pub use json_loader::{load_all_form_files, load_form_json, FormFile};
pub use toml_loader::load_toml;
