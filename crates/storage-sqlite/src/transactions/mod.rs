//! SQLite storage implementation for the two transaction ledgers.

mod bank_repository;
mod crypto_repository;
mod model;

pub use bank_repository::BankTransactionRepository;
pub use crypto_repository::CryptoTransactionRepository;
pub use model::{BankTransactionDB, CryptoTransactionDB};
