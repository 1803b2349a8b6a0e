//! Low-level infrastructure shared by every Laminark process: project-tag
//! hashing, data-directory resolution, and the once-per-process config file.

pub mod config;
pub mod path;

pub use config::{Config, load_config};
pub use path::{Error, Result, discover_project_root, project_tag_from_root, resolve_data_dir};
