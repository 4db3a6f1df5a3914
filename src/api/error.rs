use crate::application::library::LibraryApplicationError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Application(LibraryApplicationError),
    BadRequest(String),
}

impl From<LibraryApplicationError> for ApiError {
    fn from(err: LibraryApplicationError) -> Self {
        ApiError::Application(err)
    }
}

// エクストラクタの拒否理由もエラーエンベロープに載せる
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),

            ApiError::Application(err) => {
                let code = err.code();
                match err {
                    // 404 Not Found - リクエストされたリソースが存在しない
                    LibraryApplicationError::BookNotFound(_) => {
                        (StatusCode::NOT_FOUND, code, err.to_string())
                    }

                    // 422 Unprocessable Entity - ビジネスルール違反
                    LibraryApplicationError::InvalidBook(_)
                    | LibraryApplicationError::BorrowRejected(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, code, err.to_string())
                    }

                    // 409 Conflict - 同時更新が続いた
                    LibraryApplicationError::ConcurrentModification(_) => {
                        (StatusCode::CONFLICT, code, err.to_string())
                    }

                    // 500 Internal Server Error - システム障害
                    // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                    LibraryApplicationError::RepositoryError(ref e)
                    | LibraryApplicationError::ReadModelError(ref e) => {
                        tracing::error!("{}: {}", err, e);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            code,
                            "An unexpected error occurred".to_string(),
                        )
                    }
                }
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
