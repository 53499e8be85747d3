pub mod product;
pub mod repository;
pub mod service;

pub use product::{NewProduct, Product, ProductFilter, ProductListing, ProductStatus, ProductUpdate};
pub use repository::{CatalogLookup, ProductRepository};
pub use service::{CatalogError, ProductService};
