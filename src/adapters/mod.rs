pub mod http;
pub mod local;
pub mod memory;
pub mod postgres;
