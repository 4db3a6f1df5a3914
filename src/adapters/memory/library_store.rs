use crate::domain::{
    Book, BookId, Borrow, BorrowSummary, borrow_book, commands::BorrowBook, summarize,
};
use crate::ports::book_repository::{BookQuery, BookRepository, BorrowOutcome, Result};
use crate::ports::borrow_read_model::BorrowReadModel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct StoreState {
    books: HashMap<BookId, Book>,
    borrows: Vec<Borrow>,
}

/// 台帳のインメモリ実装
///
/// BookRepositoryとBorrowReadModelを1つの状態で実装する。
/// すべての書き込みを1つのロックで直列化するため、
/// 在庫の減算と貸出記録の追加は原子的に行われる。
/// DATABASE_URL未設定時の本番用ストアとテストで使用する。
#[derive(Debug, Default)]
pub struct InMemoryLibraryStore {
    state: Mutex<StoreState>,
}

impl InMemoryLibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BookRepository for InMemoryLibraryStore {
    async fn insert(&self, book: Book) -> Result<()> {
        let mut state = self.lock();
        if state.books.contains_key(&book.id) {
            return Err(format!("Book {} already exists", book.id).into());
        }
        state.books.insert(book.id.clone(), book);
        Ok(())
    }

    async fn get_by_id(&self, book_id: &BookId) -> Result<Option<Book>> {
        Ok(self.lock().books.get(book_id).cloned())
    }

    async fn list(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let books: Vec<Book> = self.lock().books.values().cloned().collect();
        Ok(query.apply(books))
    }

    async fn replace(&self, book: Book, expected_version: u64) -> Result<bool> {
        let mut state = self.lock();
        match state.books.get_mut(&book.id) {
            Some(current) if current.version == expected_version => {
                *current = book;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, book_id: &BookId) -> Result<bool> {
        Ok(self.lock().books.remove(book_id).is_some())
    }

    /// ストアのロックを保持したまま最新の在庫で検証・減算する
    async fn borrow_copies(&self, cmd: &BorrowBook) -> Result<BorrowOutcome> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(current) = state.books.get_mut(&cmd.book_id) else {
            return Ok(BorrowOutcome::BookNotFound);
        };

        match borrow_book(
            current,
            cmd.quantity,
            cmd.due_date,
            cmd.requested_at.date_naive(),
            cmd.requested_at,
        ) {
            Ok((updated, event)) => {
                *current = updated.clone();
                let borrow = Borrow::from(event);
                state.borrows.push(borrow.clone());
                Ok(BorrowOutcome::Recorded {
                    book: updated,
                    borrow,
                })
            }
            Err(err) => Ok(BorrowOutcome::Rejected(err)),
        }
    }
}

#[async_trait]
impl BorrowReadModel for InMemoryLibraryStore {
    async fn find_by_book_id(&self, book_id: &BookId) -> Result<Vec<Borrow>> {
        Ok(self
            .lock()
            .borrows
            .iter()
            .filter(|b| &b.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn summary(&self) -> Result<Vec<BorrowSummary>> {
        let state = self.lock();
        let books: Vec<Book> = state.books.values().cloned().collect();
        Ok(summarize(&state.borrows, &books))
    }
}
