mod errors;
mod library_service;

pub use errors::{LibraryApplicationError, Result};
pub use library_service::{
    ServiceDependencies, borrow_book, borrow_summary, create_book, delete_book, get_book,
    list_books, update_book,
};
