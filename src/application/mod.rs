pub mod client;
pub mod library;
