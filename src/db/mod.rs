pub mod catalog;

pub use catalog::{Catalog, GenreColumn};
