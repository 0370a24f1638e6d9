//! Calibre catalog: models and read-only store.

pub mod book;
mod catalog;

pub use catalog::Catalog;
