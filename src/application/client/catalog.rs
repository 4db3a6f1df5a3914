use crate::domain::{Book, BookId, BookPatch, BorrowSummary, NewBook};
use crate::ports::{BookQuery, LibraryApi, library_api::Result};
use std::sync::Arc;

use super::cache::BookCache;

/// 書籍カタログのクライアント
///
/// 一覧・詳細・登録・編集・削除画面が使うデータ層。
/// 読み込みはキャッシュ経由、変更が成功したら該当キーと一覧を無効化する。
/// 貸出ワークフローと同じキャッシュを共有する。
#[derive(Clone)]
pub struct CatalogClient {
    api: Arc<dyn LibraryApi>,
    cache: Arc<BookCache>,
}

impl CatalogClient {
    pub fn new(api: Arc<dyn LibraryApi>, cache: Arc<BookCache>) -> Self {
        Self { api, cache }
    }

    pub async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        self.cache.load_list(self.api.as_ref(), query).await
    }

    pub async fn get_book(&self, book_id: &BookId) -> Result<Book> {
        self.cache.load_book(self.api.as_ref(), book_id).await
    }

    pub async fn create_book(&self, book: &NewBook) -> Result<Book> {
        let created = self.api.create_book(book).await?;
        self.cache.invalidate_lists();
        Ok(created)
    }

    pub async fn update_book(&self, book_id: &BookId, patch: &BookPatch) -> Result<Book> {
        let updated = self.api.update_book(book_id, patch).await?;
        self.cache.invalidate(book_id);
        Ok(updated)
    }

    pub async fn delete_book(&self, book_id: &BookId) -> Result<()> {
        self.api.delete_book(book_id).await?;
        self.cache.invalidate(book_id);
        Ok(())
    }

    /// 貸出集計は貸出のたびに変わるためキャッシュしない
    pub async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>> {
        self.api.borrow_summary().await
    }
}
