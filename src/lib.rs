pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod master;
pub mod session;
pub mod sync;
pub mod vault;
