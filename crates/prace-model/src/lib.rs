mod domain;
pub use domain::*;

mod catalog;
pub use catalog::{Catalog, CatalogContext, JobTemplate};

mod error;
pub use error::ModelError;
