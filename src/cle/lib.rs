mod account_report;
pub mod history;
pub mod ids;
pub mod input;
mod ledger;
pub mod models;
mod money;
mod result;
pub mod settings;
pub mod stores;
mod transaction;
pub mod validator;

pub use account_report::AccountReport;
pub use ledger::{
    ApplicationError, InternalFault, LedgerEngine, LedgerError, TransactionResult,
};
pub use money::{Money, MoneyError};
pub use result::Result;
pub use settings::LedgerSettings;
pub use transaction::{RequestedType, TransactionCommand};
pub use validator::RejectionReason;

use std::sync::Arc;

use stores::MemoryStore;

/// Engine backed by the in-memory store, which also answers ownership checks
pub type MemoryLedger = LedgerEngine<MemoryStore, MemoryStore>;

pub fn build_memory_ledger(settings: LedgerSettings) -> (Arc<MemoryStore>, MemoryLedger) {
    let store = Arc::new(MemoryStore::new());
    let engine = LedgerEngine::new(Arc::clone(&store), Arc::clone(&store), settings);

    return (store, engine);
}
