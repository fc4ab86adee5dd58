//! imagecheck core
//!
//! Image catalog loading, change detection, dependency expansion and the
//! build-order graph for monorepo container images.

pub mod catalog;
pub mod detect;
pub mod error;
pub mod expand;
pub mod graph;
pub mod model;
pub mod summary;
pub mod versions;

pub use catalog::{CatalogEntry, ImageCatalog};
pub use detect::detect_changed_images;
pub use error::{CatalogError, Result};
pub use expand::{EXPANSION_FACTOR, ImageSet, expand_dependents};
pub use graph::ImageGraph;
pub use model::*;
pub use summary::{changed_images_file_name, changes_description, report_path_prefix};
pub use versions::{ResultVersion, gen_versions};
