pub mod api;
pub mod config;
pub mod csv;
pub mod engine;
pub mod model;
pub mod store;

pub use engine::{Balances, Ledger, LedgerError, SpendPlan};
pub use model::{Operation, Payer, Points, Transaction};
pub use store::{LedgerStore, MemoryStore, SqliteStore};
