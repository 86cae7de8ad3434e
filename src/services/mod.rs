//! Business logic services

pub mod lending;

pub use lending::{parse_position, BookSelection, LendingCore, LoanReceipt, SearchField, SortKey};
