use crate::application::library::{self, LibraryApplicationError, ServiceDependencies};
use crate::domain::{
    Book, BookId, BookPatch, Borrow, BorrowRequest, BorrowSummary, NewBook,
    commands::{BorrowBook, CreateBook, UpdateBook},
};
use crate::ports::{
    BookQuery, RemoteError,
    library_api::{LibraryApi, Result},
};
use async_trait::async_trait;
use chrono::Utc;

/// プロセス内の台帳を直接呼び出すLibraryApi実装
///
/// HTTPを介さずにアプリケーション層を呼び出す。エラーはHTTP版と同じ分類に変換する。
#[derive(Clone)]
pub struct LocalLibraryApi {
    deps: ServiceDependencies,
}

impl LocalLibraryApi {
    pub fn new(deps: ServiceDependencies) -> Self {
        Self { deps }
    }
}

impl From<LibraryApplicationError> for RemoteError {
    fn from(err: LibraryApplicationError) -> Self {
        match err {
            LibraryApplicationError::BookNotFound(_) => RemoteError::NotFound,
            LibraryApplicationError::InvalidBook(_)
            | LibraryApplicationError::BorrowRejected(_)
            | LibraryApplicationError::ConcurrentModification(_) => RemoteError::Rejected {
                code: err.code().to_string(),
                message: err.to_string(),
            },
            LibraryApplicationError::RepositoryError(_)
            | LibraryApplicationError::ReadModelError(_) => RemoteError::Transport(Box::new(err)),
        }
    }
}

#[async_trait]
impl LibraryApi for LocalLibraryApi {
    async fn get_book(&self, book_id: &BookId) -> Result<Book> {
        Ok(library::get_book(&self.deps, book_id).await?)
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        Ok(library::list_books(&self.deps, query).await?)
    }

    async fn create_book(&self, book: &NewBook) -> Result<Book> {
        let cmd = CreateBook {
            book: book.clone(),
            created_at: Utc::now(),
        };
        Ok(library::create_book(&self.deps, cmd).await?)
    }

    async fn update_book(&self, book_id: &BookId, patch: &BookPatch) -> Result<Book> {
        let cmd = UpdateBook {
            book_id: book_id.clone(),
            patch: patch.clone(),
            updated_at: Utc::now(),
        };
        Ok(library::update_book(&self.deps, cmd).await?)
    }

    async fn delete_book(&self, book_id: &BookId) -> Result<()> {
        Ok(library::delete_book(&self.deps, book_id).await?)
    }

    async fn borrow(&self, request: &BorrowRequest) -> Result<Borrow> {
        let cmd = BorrowBook {
            book_id: request.book_id().clone(),
            quantity: request.quantity(),
            due_date: request.due_date(),
            requested_at: Utc::now(),
        };
        Ok(library::borrow_book(&self.deps, cmd).await?)
    }

    async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>> {
        Ok(library::borrow_summary(&self.deps).await?)
    }
}
