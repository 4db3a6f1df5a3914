use axum::extract::{FromRequest, FromRequestParts};

use super::error::ApiError;

/// ボディのパース失敗をエラーエンベロープで返すJSONエクストラクタ
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// クエリ文字列のパース失敗をエラーエンベロープで返すエクストラクタ
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
