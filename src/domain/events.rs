use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BorrowId};

/// イベント：書籍が貸し出された
///
/// 台帳が在庫を減らした事実。貸出記録として永続化される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookBorrowed {
    pub borrow_id: BorrowId,
    pub book_id: BookId,
    pub quantity: u32,
    pub due_date: NaiveDate,
    pub borrowed_at: DateTime<Utc>,
    pub remaining_copies: u32,
}
