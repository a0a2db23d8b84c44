pub mod cdr;
pub mod data_session;
pub mod error;
pub mod network_attach;
pub mod payload;
pub mod sim;
pub mod summary;
pub mod tac;
