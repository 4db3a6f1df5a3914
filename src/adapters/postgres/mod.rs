pub mod book_repository;
pub mod borrow_read_model;

// パブリックに型を再エクスポート
pub use book_repository::BookRepository as PostgresBookRepository;
pub use borrow_read_model::BorrowReadModel as PostgresBorrowReadModel;
