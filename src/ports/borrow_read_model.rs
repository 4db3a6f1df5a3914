use crate::domain::{BookId, Borrow, BorrowSummary};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出Read Modelポート
///
/// 貸出記録の参照と集計を提供する。書き込みは`BookRepository::borrow_copies`が行う。
#[async_trait]
pub trait BorrowReadModel: Send + Sync {
    /// 書籍の貸出記録を取得する（古い順）
    async fn find_by_book_id(&self, book_id: &BookId) -> Result<Vec<Borrow>>;

    /// 書籍ごとの貸出冊数を集計する
    ///
    /// 合計冊数の降順、同数ならタイトル順。削除済みの書籍は含めない。
    async fn summary(&self) -> Result<Vec<BorrowSummary>>;
}
