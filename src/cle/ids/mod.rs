mod account_id;
mod currency_id;
mod customer_id;
mod reference_no;
mod transaction_id;

pub use account_id::AccountId;
pub use currency_id::CurrencyId;
pub use customer_id::CustomerId;
pub use reference_no::ReferenceNo;
pub use transaction_id::TransactionId;
