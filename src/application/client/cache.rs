use crate::domain::{Book, BookId};
use crate::ports::{BookQuery, LibraryApi, library_api::Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 書籍スナップショットのキャッシュ
///
/// 書籍IDと一覧の検索条件をキーにしたread-throughキャッシュ。
/// 台帳側の状態を変える操作が成功したら、呼び出し側が明示的に`invalidate`する。
/// 無効化されるまでは同じスナップショットを返す。
#[derive(Debug, Default)]
pub struct BookCache {
    books: Mutex<HashMap<BookId, Book>>,
    lists: Mutex<HashMap<BookQuery, Vec<Book>>>,
}

impl BookCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュ済みのスナップショットを取得する
    pub fn get(&self, book_id: &BookId) -> Option<Book> {
        lock(&self.books).get(book_id).cloned()
    }

    /// キャッシュ済みの一覧を取得する
    pub fn get_list(&self, query: &BookQuery) -> Option<Vec<Book>> {
        lock(&self.lists).get(query).cloned()
    }

    /// 書籍1件を読み込む（キャッシュになければ台帳から取得）
    pub async fn load_book(&self, api: &dyn LibraryApi, book_id: &BookId) -> Result<Book> {
        if let Some(book) = self.get(book_id) {
            return Ok(book);
        }

        let book = api.get_book(book_id).await?;
        lock(&self.books).insert(book_id.clone(), book.clone());

        Ok(book)
    }

    /// 書籍一覧を読み込む（キャッシュになければ台帳から取得）
    pub async fn load_list(&self, api: &dyn LibraryApi, query: &BookQuery) -> Result<Vec<Book>> {
        if let Some(books) = self.get_list(query) {
            return Ok(books);
        }

        let books = api.list_books(query).await?;
        lock(&self.lists).insert(query.clone(), books.clone());

        Ok(books)
    }

    /// 書籍1件のスナップショットを破棄する
    ///
    /// 一覧にも同じ書籍が含まれうるため、一覧キャッシュもすべて破棄する。
    pub fn invalidate(&self, book_id: &BookId) {
        lock(&self.books).remove(book_id);
        self.invalidate_lists();
    }

    /// 一覧キャッシュをすべて破棄する
    pub fn invalidate_lists(&self) {
        lock(&self.lists).clear();
    }
}
