pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod observability;
pub mod table;

pub use cache::{CachedExecutor, NoCache, ResultCache, TtlCache};
pub use db::{QueryExecutor, SqliteExecutor};
pub use error::StoreError;
pub use table::{Cell, MoonWeek, SqlParam, Table};
