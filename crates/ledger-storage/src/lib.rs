//! The outbound storage port (§6) and its dialects: in-memory for tests,
//! SQL (sqlx::Any) for production, and a caching composite over either.

pub mod cached;
pub mod memory;
pub mod port;
pub mod sql;

pub use cached::CachedStore;
pub use memory::MemoryStore;
pub use port::LedgerStore;
pub use sql::SqlStore;
