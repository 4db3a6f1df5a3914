use crate::domain::{BookId, BookValidationError, BorrowBookError};
use thiserror::Error;

/// 台帳アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LibraryApplicationError {
    /// 書籍が存在しない
    #[error("Book not found: {0}")]
    BookNotFound(BookId),

    /// 書籍の内容が不正
    #[error("Invalid book: {0}")]
    InvalidBook(#[from] BookValidationError),

    /// 貸出取引が拒否された
    #[error("Borrow rejected: {0}")]
    BorrowRejected(#[from] BorrowBookError),

    /// 競合が続き書き込めなかった
    #[error("Book {0} was modified concurrently")]
    ConcurrentModification(BookId),

    /// BookRepositoryのエラー
    #[error("Book repository error")]
    RepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// BorrowReadModelのエラー
    #[error("Borrow read model error")]
    ReadModelError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LibraryApplicationError {
    /// クライアントに返すエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            LibraryApplicationError::BookNotFound(_) => "BOOK_NOT_FOUND",
            LibraryApplicationError::InvalidBook(_) => "INVALID_BOOK",
            LibraryApplicationError::BorrowRejected(BorrowBookError::InvalidQuantity) => {
                "INVALID_QUANTITY"
            }
            LibraryApplicationError::BorrowRejected(BorrowBookError::InsufficientCopies {
                ..
            }) => "INSUFFICIENT_COPIES",
            LibraryApplicationError::BorrowRejected(BorrowBookError::DueDateInPast { .. }) => {
                "DUE_DATE_IN_PAST"
            }
            LibraryApplicationError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            LibraryApplicationError::RepositoryError(_) => "REPOSITORY_ERROR",
            LibraryApplicationError::ReadModelError(_) => "READ_MODEL_ERROR",
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LibraryApplicationError>;
