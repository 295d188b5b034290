//! Transactions module - append-only ledgers and idempotent ingestion.

mod ingest_service;
mod transactions_model;
mod transactions_traits;


// Re-export the public interface
pub use ingest_service::IngestService;
pub use transactions_model::{
    normalize_minor_units, BankTransaction, CryptoTransaction, IngestOutcome,
    NewBankTransaction, NewCryptoTransaction, TxDirection, WithdrawalStatus,
};
pub use transactions_traits::{
    BankFeedTrait, BankTransactionRepositoryTrait, CryptoTransactionRepositoryTrait,
    ExchangeFeedTrait, IngestServiceTrait,
};
