pub mod poll_repository;
pub mod tally_repository;

pub use poll_repository::*;
pub use tally_repository::*;
