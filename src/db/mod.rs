//! Embedded reference data compiled into the crate.
//!
//! The periodic table lives in `data/elements.toml` and is parsed once on first access.

mod loader;
mod schema;
mod store;

pub use schema::ElementRecord;
pub use store::get_store;
