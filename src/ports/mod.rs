pub mod book_repository;
pub mod borrow_read_model;
pub mod library_api;

pub use book_repository::{BookQuery, BookRepository, BorrowOutcome, SortField, SortOrder};
pub use borrow_read_model::BorrowReadModel;
pub use library_api::{LibraryApi, RemoteError};
