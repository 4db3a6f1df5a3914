use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Book, BookBorrowed, BookId, BorrowId, BorrowValidationError};

/// 返却期限の入力フォーマット（`<input type="date">`と同じ）
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// 検証済みの貸出リクエスト
///
/// `validate`を通してのみ生成できる。送信後は破棄される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowRequest {
    book_id: BookId,
    quantity: u32,
    due_date: NaiveDate,
}

impl BorrowRequest {
    pub fn book_id(&self) -> &BookId {
        &self.book_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }
}

/// 純粋関数：貸出リクエストを事前検証する
///
/// ビジネスルール：
/// - 数量は1以上
/// - 数量はスナップショットの在庫数以下
/// - 返却期限が入力されていること
///
/// 在庫0の書籍は数量にかかわらず失敗する。
/// 返却期限が未来日かどうかは台帳が判定する。
pub fn validate(
    book: &Book,
    quantity: u32,
    due_date: Option<NaiveDate>,
) -> Result<BorrowRequest, BorrowValidationError> {
    if quantity < 1 {
        return Err(BorrowValidationError::QuantityNotPositive);
    }

    if quantity > book.copies {
        return Err(BorrowValidationError::QuantityExceedsCopies {
            requested: quantity,
            available: book.copies,
        });
    }

    let due_date = due_date.ok_or(BorrowValidationError::DueDateMissing)?;

    Ok(BorrowRequest {
        book_id: book.id.clone(),
        quantity,
        due_date,
    })
}

/// フォームの返却期限文字列を解釈する
///
/// 空文字は未入力として`None`を返す。
pub fn parse_due_date(raw: &str) -> Result<Option<NaiveDate>, BorrowValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT)
        .map(Some)
        .map_err(|_| BorrowValidationError::MalformedDueDate(raw.to_string()))
}

/// 貸出記録 - 台帳が受理した取引
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrow {
    pub id: BorrowId,
    pub book_id: BookId,
    pub quantity: u32,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<BookBorrowed> for Borrow {
    fn from(event: BookBorrowed) -> Self {
        Self {
            id: event.borrow_id,
            book_id: event.book_id,
            quantity: event.quantity,
            due_date: event.due_date,
            created_at: event.borrowed_at,
        }
    }
}

/// 貸出集計 - 書籍ごとの貸出冊数合計
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowSummary {
    pub book_id: BookId,
    pub title: String,
    pub isbn: String,
    pub total_quantity: u64,
}

/// 並び順：合計冊数の降順、同数ならタイトル順
pub fn order_summaries(summaries: &mut [BorrowSummary]) {
    summaries.sort_by(|a, b| {
        b.total_quantity
            .cmp(&a.total_quantity)
            .then_with(|| a.title.cmp(&b.title))
    });
}

/// 純粋関数：貸出記録を書籍ごとに集計する
///
/// 削除済みの書籍への貸出は集計に含めない。
pub fn summarize(borrows: &[Borrow], books: &[Book]) -> Vec<BorrowSummary> {
    let books: HashMap<&BookId, &Book> = books.iter().map(|b| (&b.id, b)).collect();

    let mut totals: HashMap<&BookId, u64> = HashMap::new();
    for borrow in borrows {
        if books.contains_key(&borrow.book_id) {
            *totals.entry(&borrow.book_id).or_default() += u64::from(borrow.quantity);
        }
    }

    let mut summaries: Vec<BorrowSummary> = totals
        .into_iter()
        .map(|(book_id, total_quantity)| {
            let book = books[book_id];
            BorrowSummary {
                book_id: book.id.clone(),
                title: book.title.clone(),
                isbn: book.isbn.clone(),
                total_quantity,
            }
        })
        .collect();

    order_summaries(&mut summaries);
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Genre, availability};
    use chrono::Duration;

    fn book(title: &str, copies: u32) -> Book {
        let now = Utc::now();
        Book {
            id: BookId::generate(),
            title: title.to_string(),
            author: "Author".to_string(),
            genre: Genre::Science,
            isbn: format!("isbn-{}", title),
            description: String::new(),
            copies,
            available: availability(copies),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn due() -> Option<NaiveDate> {
        Some(Utc::now().date_naive() + Duration::days(7))
    }

    #[test]
    fn test_validate_passes_within_copies() {
        let book = book("Cosmos", 3);
        for quantity in 1..=3 {
            let request = validate(&book, quantity, due()).unwrap();
            assert_eq!(request.quantity(), quantity);
            assert_eq!(request.book_id(), &book.id);
        }
    }

    #[test]
    fn test_validate_fails_iff_outside_range() {
        let book = book("Cosmos", 4);
        for quantity in 0..10 {
            let passes = validate(&book, quantity, due()).is_ok();
            assert_eq!(passes, (1..=book.copies).contains(&quantity));
        }
    }

    #[test]
    fn test_validate_rejects_quantity_over_copies() {
        let book = book("Cosmos", 3);
        assert_eq!(
            validate(&book, 5, due()).unwrap_err(),
            BorrowValidationError::QuantityExceedsCopies {
                requested: 5,
                available: 3
            }
        );
    }

    #[test]
    fn test_validate_always_fails_without_copies() {
        let book = book("Cosmos", 0);
        for quantity in [0, 1, 2, 100, u32::MAX] {
            assert!(validate(&book, quantity, due()).is_err());
        }
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let book = book("Cosmos", 3);
        assert_eq!(
            validate(&book, 0, due()).unwrap_err(),
            BorrowValidationError::QuantityNotPositive
        );
    }

    #[test]
    fn test_validate_requires_due_date() {
        let book = book("Cosmos", 3);
        assert_eq!(
            validate(&book, 1, None).unwrap_err(),
            BorrowValidationError::DueDateMissing
        );
    }

    #[test]
    fn test_validate_does_not_check_due_date_is_future() {
        let book = book("Cosmos", 3);
        let past = Utc::now().date_naive() - Duration::days(30);
        assert!(validate(&book, 1, Some(past)).is_ok());
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(parse_due_date("").unwrap(), None);
        assert_eq!(parse_due_date("  ").unwrap(), None);
        assert_eq!(
            parse_due_date("2026-11-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 11, 1)
        );
        assert_eq!(
            parse_due_date("2026-13-01").unwrap_err(),
            BorrowValidationError::MalformedDueDate("2026-13-01".to_string())
        );
        assert!(parse_due_date("next week").is_err());
    }

    #[test]
    fn test_quantity_exceeds_copies_message_is_a_failure_message() {
        let err = BorrowValidationError::QuantityExceedsCopies {
            requested: 5,
            available: 3,
        };
        assert_eq!(err.to_string(), "Quantity exceeds available copies.");
    }

    #[test]
    fn test_summarize_groups_by_book() {
        let cosmos = book("Cosmos", 5);
        let dune = book("Dune", 5);
        let now = Utc::now();
        let borrow = |book: &Book, quantity| Borrow {
            id: BorrowId::new(),
            book_id: book.id.clone(),
            quantity,
            due_date: now.date_naive(),
            created_at: now,
        };

        let borrows = vec![borrow(&cosmos, 1), borrow(&dune, 2), borrow(&cosmos, 3)];
        let summaries = summarize(&borrows, &[cosmos.clone(), dune.clone()]);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].book_id, cosmos.id);
        assert_eq!(summaries[0].total_quantity, 4);
        assert_eq!(summaries[0].isbn, cosmos.isbn);
        assert_eq!(summaries[1].title, "Dune");
        assert_eq!(summaries[1].total_quantity, 2);
    }

    #[test]
    fn test_summarize_skips_deleted_books() {
        let cosmos = book("Cosmos", 5);
        let now = Utc::now();
        let borrows = vec![Borrow {
            id: BorrowId::new(),
            book_id: BookId::new("deleted"),
            quantity: 1,
            due_date: now.date_naive(),
            created_at: now,
        }];

        assert!(summarize(&borrows, &[cosmos]).is_empty());
    }
}
