use chrono::NaiveDate;
use thiserror::Error;

/// 書籍登録・更新のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookValidationError {
    /// タイトルが空
    #[error("Title must not be blank")]
    BlankTitle,
    /// 著者が空
    #[error("Author must not be blank")]
    BlankAuthor,
    /// ISBNが空
    #[error("ISBN must not be blank")]
    BlankIsbn,
}

/// クライアント側の貸出事前検証のエラー
///
/// ネットワークに出る前に弾かれる。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BorrowValidationError {
    /// 数量が1未満
    #[error("Quantity must be at least 1")]
    QuantityNotPositive,
    /// 数量が在庫数を超えている
    #[error("Quantity exceeds available copies.")]
    QuantityExceedsCopies { requested: u32, available: u32 },
    /// 返却期限が未入力
    #[error("Due date is required")]
    DueDateMissing,
    /// 返却期限が日付として解釈できない
    #[error("Malformed due date: {0}")]
    MalformedDueDate(String),
}

/// 台帳側の貸出取引のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BorrowBookError {
    /// 数量が1未満
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    /// 在庫不足（同時貸出で減った場合を含む）
    #[error("Insufficient copies: requested {requested}, available {available}")]
    InsufficientCopies { requested: u32, available: u32 },
    /// 返却期限が過去
    #[error("Due date {due_date} is before {today}")]
    DueDateInPast { due_date: NaiveDate, today: NaiveDate },
}
