//! Larder storage: products, recipes, menus, pantries and shopping lists kept
//! either as JSON collection files or in a SQLite database.
//!
//! Both backends implement [`store::Collection`] for every record type from
//! `larder-core`, and [`store::Store`] picks one of them at runtime.

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod store;

pub use config::Config;
pub use db::SqlStore;
pub use error::{Result, StoreError};
pub use files::FileStore;
pub use store::{copy_all, Backend, Collection, CopySummary, Storage, Store};
