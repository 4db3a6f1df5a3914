use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Book, BookId, BookPatch, Borrow, BorrowId, BorrowRequest, BorrowSummary, Genre, NewBook,
    commands::{BorrowBook, CreateBook},
};
use crate::ports::{BookQuery, SortField, SortOrder};

/// 成功レスポンスの共通エンベロープ
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}

/// 書籍レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: String,
    pub copies: u32,
    pub available: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.as_str().to_string(),
            title: book.title,
            author: book.author,
            genre: book.genre,
            isbn: book.isbn,
            description: book.description,
            copies: book.copies,
            available: book.available,
            version: book.version,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

impl From<BookResponse> for Book {
    fn from(response: BookResponse) -> Self {
        Self {
            id: BookId::new(response.id),
            title: response.title,
            author: response.author,
            genre: response.genre,
            isbn: response.isbn,
            description: response.description,
            copies: response.copies,
            available: response.available,
            version: response.version,
            created_at: response.created_at,
            updated_at: response.updated_at,
        }
    }
}

/// 書籍登録リクエスト（POST /api/books）
///
/// `available`は受け取っても無視する。台帳が在庫数から導出する。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    #[serde(default)]
    pub description: String,
    pub copies: u32,
    #[serde(default, skip_serializing)]
    pub available: Option<bool>,
}

impl CreateBookRequest {
    pub fn to_command(self, created_at: DateTime<Utc>) -> CreateBook {
        CreateBook {
            book: NewBook {
                title: self.title,
                author: self.author,
                genre: self.genre,
                isbn: self.isbn,
                description: self.description,
                copies: self.copies,
            },
            created_at,
        }
    }
}

impl From<&NewBook> for CreateBookRequest {
    fn from(book: &NewBook) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            isbn: book.isbn.clone(),
            description: book.description.clone(),
            copies: book.copies,
            available: None,
        }
    }
}

/// 書籍更新リクエスト（PUT /api/books/:id）
///
/// 指定されたフィールドだけを更新する。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<u32>,
    #[serde(default, skip_serializing)]
    pub available: Option<bool>,
}

impl From<UpdateBookRequest> for BookPatch {
    fn from(req: UpdateBookRequest) -> Self {
        Self {
            title: req.title,
            author: req.author,
            genre: req.genre,
            isbn: req.isbn,
            description: req.description,
            copies: req.copies,
        }
    }
}

impl From<&BookPatch> for UpdateBookRequest {
    fn from(patch: &BookPatch) -> Self {
        Self {
            title: patch.title.clone(),
            author: patch.author.clone(),
            genre: patch.genre,
            isbn: patch.isbn.clone(),
            description: patch.description.clone(),
            copies: patch.copies,
            available: None,
        }
    }
}

/// 貸出リクエスト（POST /api/borrow）
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowBookRequest {
    pub book: String,
    pub quantity: u32,
    pub due_date: NaiveDate,
}

impl BorrowBookRequest {
    pub fn to_command(self, requested_at: DateTime<Utc>) -> BorrowBook {
        BorrowBook {
            book_id: BookId::new(self.book),
            quantity: self.quantity,
            due_date: self.due_date,
            requested_at,
        }
    }
}

impl From<&BorrowRequest> for BorrowBookRequest {
    fn from(request: &BorrowRequest) -> Self {
        Self {
            book: request.book_id().as_str().to_string(),
            quantity: request.quantity(),
            due_date: request.due_date(),
        }
    }
}

/// 貸出レスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowResponse {
    pub id: Uuid,
    pub book: String,
    pub quantity: u32,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Borrow> for BorrowResponse {
    fn from(borrow: Borrow) -> Self {
        Self {
            id: borrow.id.value(),
            book: borrow.book_id.as_str().to_string(),
            quantity: borrow.quantity,
            due_date: borrow.due_date,
            created_at: borrow.created_at,
        }
    }
}

impl From<BorrowResponse> for Borrow {
    fn from(response: BorrowResponse) -> Self {
        Self {
            id: BorrowId::from_uuid(response.id),
            book_id: BookId::new(response.book),
            quantity: response.quantity,
            due_date: response.due_date,
            created_at: response.created_at,
        }
    }
}

/// 貸出集計の書籍情報
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryBook {
    pub id: String,
    pub title: String,
    pub isbn: String,
}

/// 貸出集計レスポンス（GET /api/borrow）
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummaryResponse {
    pub book: SummaryBook,
    pub total_quantity: u64,
}

impl From<BorrowSummary> for BorrowSummaryResponse {
    fn from(summary: BorrowSummary) -> Self {
        Self {
            book: SummaryBook {
                id: summary.book_id.as_str().to_string(),
                title: summary.title,
                isbn: summary.isbn,
            },
            total_quantity: summary.total_quantity,
        }
    }
}

impl From<BorrowSummaryResponse> for BorrowSummary {
    fn from(response: BorrowSummaryResponse) -> Self {
        Self {
            book_id: BookId::new(response.book.id),
            title: response.book.title,
            isbn: response.book.isbn,
            total_quantity: response.total_quantity,
        }
    }
}

/// 書籍一覧取得のクエリパラメータ
///
/// - filter: ジャンルで絞り込み（例: FICTION）
/// - sortBy: createdAt, title, copies
/// - sort: asc, desc
/// - limit: 最大件数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBooksQuery {
    pub filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

impl ListBooksQuery {
    /// クエリパラメータのパースとバリデーション
    pub fn to_query(&self) -> Result<BookQuery, String> {
        let genre = self
            .filter
            .as_deref()
            .map(str::parse::<Genre>)
            .transpose()?;

        let sort_by = match self.sort_by.as_deref() {
            None | Some("createdAt") => SortField::CreatedAt,
            Some("title") => SortField::Title,
            Some("copies") => SortField::Copies,
            Some(other) => return Err(format!("Invalid sortBy: {}", other)),
        };

        let order = match self.sort.as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => return Err(format!("Invalid sort: {}", other)),
        };

        Ok(BookQuery {
            genre,
            sort_by,
            order,
            limit: self.limit,
        })
    }
}

/// BookQueryをクエリパラメータに変換する（クライアント用）
pub fn query_params(query: &BookQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("sortBy", query.sort_by.as_str().to_string()),
        ("sort", query.order.as_str().to_string()),
    ];
    if let Some(genre) = query.genre {
        params.push(("filter", genre.as_str().to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}
