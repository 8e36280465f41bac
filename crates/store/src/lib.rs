//! Playgate data access layer
//!
//! Repositories are expressed as two traits: [`Store`] for plain reads and
//! for opening transactional scopes, and [`StoreTx`] for every mutating call
//! that must happen inside one database transaction. The store never opens
//! its own outermost transaction for engine work; the wallet engine and the
//! AML analyzer own their transaction boundaries.
//!
//! Two backends ship: Postgres (sqlx, `SELECT … FOR UPDATE` row locks) for
//! production, and an in-memory implementation with the same transactional
//! semantics for tests.

pub mod error;
pub mod memory;
pub mod postgres;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::{AlertFilter, DeadLetter, Store, StoreTx, TransactionFilter};
