//! Product catalog: the paginated, read-only product listing

pub mod api;
pub mod models;
pub mod store;

pub use api::CatalogState;
pub use models::{NewProduct, PageParams, Pagination, Product};
pub use store::ProductStore;
