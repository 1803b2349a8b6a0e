//! Domain types shared by every Laminark crate: closed sum types for the
//! observation/graph/path taxonomies, the persisted record shapes, and the
//! hook IPC envelope. No I/O and no business logic lives here.

pub mod domain;
pub mod error;
mod util;

pub use domain::*;
pub use error::{Error, Result};
pub use util::{normalize_whitespace, truncate};
