use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BookBorrowed, BookId, BookValidationError, BorrowBookError, BorrowId, Genre,
    commands::CreateBook,
};

/// Book集約 - 台帳が管理する1タイトル分の在庫
///
/// 不変条件：`available == (copies > 0)`
/// availableは派生値であり、独立して書き換えられることはない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    // 識別子
    pub id: BookId,

    // 書誌情報
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: String,

    // 在庫
    pub copies: u32,
    pub available: bool,

    // 楽観的排他制御用のリビジョン
    pub version: u64,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// availableがcopiesと整合しているか
    pub fn is_consistent(&self) -> bool {
        self.available == availability(self.copies)
    }
}

/// 在庫数から貸出可否を導出する
pub fn availability(copies: u32) -> bool {
    copies > 0
}

/// 登録する書籍の内容
///
/// availableは受け取らない。台帳が在庫数から導出する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: String,
    pub copies: u32,
}

/// 書籍情報の部分更新
///
/// 指定されたフィールドだけを置き換える。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<Genre>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies: Option<u32>,
}

fn check_descriptive_fields(book: &Book) -> Result<(), BookValidationError> {
    if book.title.trim().is_empty() {
        return Err(BookValidationError::BlankTitle);
    }
    if book.author.trim().is_empty() {
        return Err(BookValidationError::BlankAuthor);
    }
    if book.isbn.trim().is_empty() {
        return Err(BookValidationError::BlankIsbn);
    }
    Ok(())
}

/// 純粋関数：書籍を登録する
///
/// ビジネスルール：
/// - タイトル、著者、ISBNは必須
/// - availableは在庫数から導出する
/// - リビジョンは1から始まる
pub fn create_book(cmd: CreateBook, id: BookId) -> Result<Book, BookValidationError> {
    let new_book = cmd.book;
    let book = Book {
        id,
        title: new_book.title,
        author: new_book.author,
        genre: new_book.genre,
        isbn: new_book.isbn,
        description: new_book.description,
        copies: new_book.copies,
        available: availability(new_book.copies),
        version: 1,
        created_at: cmd.created_at,
        updated_at: cmd.created_at,
    };

    check_descriptive_fields(&book)?;

    Ok(book)
}

/// 純粋関数：書籍情報を更新する
///
/// 在庫数が変わった場合もavailableは再計算される。
/// 副作用なし。新しいBookを返す。
pub fn update_book(
    book: &Book,
    patch: BookPatch,
    updated_at: DateTime<Utc>,
) -> Result<Book, BookValidationError> {
    let copies = patch.copies.unwrap_or(book.copies);

    let updated = Book {
        title: patch.title.unwrap_or_else(|| book.title.clone()),
        author: patch.author.unwrap_or_else(|| book.author.clone()),
        genre: patch.genre.unwrap_or(book.genre),
        isbn: patch.isbn.unwrap_or_else(|| book.isbn.clone()),
        description: patch
            .description
            .unwrap_or_else(|| book.description.clone()),
        copies,
        available: availability(copies),
        version: book.version + 1,
        updated_at,
        ..book.clone()
    };

    check_descriptive_fields(&updated)?;

    Ok(updated)
}

/// 純粋関数：書籍を貸し出す（台帳側の取引）
///
/// ビジネスルール：
/// - 数量は1以上
/// - 数量は現在の在庫数以下
/// - 返却期限は当日以降
/// - 在庫数を減らし、availableを再計算する
///
/// 副作用なし。新しいBookとイベントを返す。
pub fn borrow_book(
    book: &Book,
    quantity: u32,
    due_date: NaiveDate,
    today: NaiveDate,
    borrowed_at: DateTime<Utc>,
) -> Result<(Book, BookBorrowed), BorrowBookError> {
    if quantity == 0 {
        return Err(BorrowBookError::InvalidQuantity);
    }

    let remaining = book
        .copies
        .checked_sub(quantity)
        .ok_or(BorrowBookError::InsufficientCopies {
            requested: quantity,
            available: book.copies,
        })?;

    if due_date < today {
        return Err(BorrowBookError::DueDateInPast { due_date, today });
    }

    let new_book = Book {
        copies: remaining,
        available: availability(remaining),
        version: book.version + 1,
        updated_at: borrowed_at,
        ..book.clone()
    };

    let event = BookBorrowed {
        borrow_id: BorrowId::new(),
        book_id: book.id.clone(),
        quantity,
        due_date,
        borrowed_at,
        remaining_copies: remaining,
    };

    Ok((new_book, event))
}
