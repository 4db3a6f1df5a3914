use crate::application::library::{
    ServiceDependencies, borrow_book as execute_borrow_book, borrow_summary as execute_summary,
    create_book as execute_create_book, delete_book as execute_delete_book,
    get_book as execute_get_book, list_books as execute_list_books,
    update_book as execute_update_book,
};
use crate::domain::{BookId, commands::UpdateBook};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{
    error::ApiError,
    extractors::{AppJson, AppQuery},
    types::{
        ApiResponse, BookResponse, BorrowBookRequest, BorrowResponse, BorrowSummaryResponse,
        CreateBookRequest, ListBooksQuery, UpdateBookRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Book handlers
// ============================================================================

/// GET /api/books - 書籍一覧
///
/// クエリパラメータ:
/// - filter: ジャンル
/// - sortBy: createdAt（既定）, title, copies
/// - sort: desc（既定）, asc
/// - limit: 最大件数
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<ListBooksQuery>,
) -> Result<Json<ApiResponse<Vec<BookResponse>>>, ApiError> {
    let query = query.to_query().map_err(ApiError::BadRequest)?;

    let books = execute_list_books(&state.service_deps, &query).await?;

    Ok(Json(ApiResponse::ok(
        "Books retrieved successfully",
        books.into_iter().map(BookResponse::from).collect(),
    )))
}

/// POST /api/books - 書籍を登録
///
/// availableは在庫数から導出される。
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateBookRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookResponse>>), ApiError> {
    let cmd = req.to_command(chrono::Utc::now());

    let book = execute_create_book(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Book created successfully", book.into())),
    ))
}

/// GET /api/books/:id - 書籍詳細
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<ApiResponse<BookResponse>>, ApiError> {
    let book = execute_get_book(&state.service_deps, &BookId::new(book_id)).await?;

    Ok(Json(ApiResponse::ok(
        "Book retrieved successfully",
        book.into(),
    )))
}

/// PUT /api/books/:id - 書籍情報を更新
///
/// 指定されたフィールドだけを更新する。在庫数を変えるとavailableも再計算される。
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    AppJson(req): AppJson<UpdateBookRequest>,
) -> Result<Json<ApiResponse<BookResponse>>, ApiError> {
    let cmd = UpdateBook {
        book_id: BookId::new(book_id),
        patch: req.into(),
        updated_at: chrono::Utc::now(),
    };

    let book = execute_update_book(&state.service_deps, cmd).await?;

    Ok(Json(ApiResponse::ok("Book updated successfully", book.into())))
}

/// DELETE /api/books/:id - 書籍を削除
///
/// 貸出記録は履歴として残るが、集計からは除外される。
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    execute_delete_book(&state.service_deps, &BookId::new(book_id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Borrow handlers
// ============================================================================

/// POST /api/borrow - 書籍を貸し出す
///
/// 強制されるビジネスルール:
/// - 書籍が存在すること
/// - 数量が1以上かつ現在の在庫数以下であること
/// - 返却期限が当日以降であること
///
/// 在庫の減算とavailableの再計算は原子的に行われる。
pub async fn create_borrow(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<BorrowBookRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BorrowResponse>>), ApiError> {
    let cmd = req.to_command(chrono::Utc::now());

    let borrow = execute_borrow_book(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Book borrowed successfully", borrow.into())),
    ))
}

/// GET /api/borrow - 書籍ごとの貸出集計
pub async fn borrow_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<BorrowSummaryResponse>>>, ApiError> {
    let summaries = execute_summary(&state.service_deps).await?;

    Ok(Json(ApiResponse::ok(
        "Borrowed books summary retrieved successfully",
        summaries
            .into_iter()
            .map(BorrowSummaryResponse::from)
            .collect(),
    )))
}
