mod account;
mod cash_transaction;
mod paged_list;

pub use account::Account;
pub use cash_transaction::{
    CashTransaction,
    Initiator,
    PendingTransaction,
    TransactionData,
    TransactionStatus,
    TransactionType,
};
pub use paged_list::PagedList;
