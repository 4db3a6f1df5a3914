use crate::domain::{Book, BookId, BookPatch, Borrow, BorrowRequest, BorrowSummary, NewBook};
use async_trait::async_trait;
use thiserror::Error;

use super::book_repository::BookQuery;

/// リモート台帳呼び出しのエラー
///
/// 1回のリクエストに対する終端結果。リトライはしない。
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 対象の書籍が存在しない
    #[error("Not found")]
    NotFound,

    /// 台帳がリクエストを拒否した（在庫不足、検証エラーなど）
    #[error("Rejected ({code}): {message}")]
    Rejected { code: String, message: String },

    /// 通信・インフラの障害
    #[error("Transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// 図書館APIポート
///
/// クライアントから見たリモート台帳の契約。
/// 台帳だけが在庫数を変更でき、クライアントは差分（貸出）を依頼するのみ。
#[async_trait]
pub trait LibraryApi: Send + Sync {
    /// 書籍を1件取得する
    async fn get_book(&self, book_id: &BookId) -> Result<Book>;

    /// 書籍一覧を取得する
    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>>;

    /// 書籍を登録する
    async fn create_book(&self, book: &NewBook) -> Result<Book>;

    /// 書籍情報を更新する
    async fn update_book(&self, book_id: &BookId, patch: &BookPatch) -> Result<Book>;

    /// 書籍を削除する
    async fn delete_book(&self, book_id: &BookId) -> Result<()>;

    /// 貸出取引を依頼する
    ///
    /// 台帳が在庫数を原子的に検証・減算する。クライアントの事前検証とは独立に
    /// 拒否されることがある。
    async fn borrow(&self, request: &BorrowRequest) -> Result<Borrow>;

    /// 書籍ごとの貸出集計を取得する
    async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>>;
}
