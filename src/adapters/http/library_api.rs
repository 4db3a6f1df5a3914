use crate::api::types::{
    ApiResponse, BookResponse, BorrowBookRequest, BorrowResponse, BorrowSummaryResponse,
    CreateBookRequest, ErrorResponse, UpdateBookRequest, query_params,
};
use crate::domain::{Book, BookId, BookPatch, Borrow, BorrowRequest, BorrowSummary, NewBook};
use crate::ports::{
    BookQuery, RemoteError,
    library_api::{LibraryApi, Result},
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

/// HTTP経由のLibraryApi実装
///
/// 台帳サーバーのREST APIを呼び出す。1回の呼び出しにつき1リクエストで、リトライはしない。
///
/// ステータスの対応:
/// - 2xx: エンベロープの`data`を返す
/// - 404: NotFound
/// - その他の4xx: Rejected（エラーボディの`error`と`message`）
/// - 5xx・通信失敗・デコード失敗: Transport
#[derive(Clone)]
pub struct HttpLibraryApi {
    client: Client,
    base_url: String,
}

impl HttpLibraryApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 書籍IDは1つのパスセグメントとしてパーセントエンコードする
    fn book_url(&self, book_id: &BookId) -> Result<Url> {
        let mut url = Url::parse(&self.url("/api/books"))
            .map_err(|e| RemoteError::Transport(Box::new(e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                RemoteError::Transport(
                    format!("Base URL cannot hold a path: {}", self.base_url).into(),
                )
            })?
            .push(book_id.as_str());
        Ok(url)
    }

    /// リクエストを送信し、成功レスポンスだけを返す
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound);
        }

        let body = response.text().await.map_err(transport)?;

        if status.is_client_error() {
            let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(error) => (error.error, error.message),
                Err(_) => (format!("HTTP_{}", status.as_u16()), body),
            };
            tracing::debug!(%status, %code, "Ledger rejected request");
            return Err(RemoteError::Rejected { code, message });
        }

        tracing::warn!(%status, "Ledger returned server error");
        Err(RemoteError::Transport(
            format!("Unexpected status {}: {}", status, body).into(),
        ))
    }

    /// エンベロープを外して`data`を取り出す
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let envelope: ApiResponse<T> = response.json().await.map_err(transport)?;
        Ok(envelope.data)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(Box::new(err))
}

#[async_trait]
impl LibraryApi for HttpLibraryApi {
    async fn get_book(&self, book_id: &BookId) -> Result<Book> {
        let book: BookResponse = self.fetch(self.client.get(self.book_url(book_id)?)).await?;
        Ok(book.into())
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let request = self
            .client
            .get(self.url("/api/books"))
            .query(&query_params(query));
        let books: Vec<BookResponse> = self.fetch(request).await?;
        Ok(books.into_iter().map(Book::from).collect())
    }

    async fn create_book(&self, book: &NewBook) -> Result<Book> {
        let request = self
            .client
            .post(self.url("/api/books"))
            .json(&CreateBookRequest::from(book));
        let created: BookResponse = self.fetch(request).await?;
        Ok(created.into())
    }

    async fn update_book(&self, book_id: &BookId, patch: &BookPatch) -> Result<Book> {
        let request = self
            .client
            .put(self.book_url(book_id)?)
            .json(&UpdateBookRequest::from(patch));
        let updated: BookResponse = self.fetch(request).await?;
        Ok(updated.into())
    }

    async fn delete_book(&self, book_id: &BookId) -> Result<()> {
        self.execute(self.client.delete(self.book_url(book_id)?))
            .await?;
        Ok(())
    }

    async fn borrow(&self, request: &BorrowRequest) -> Result<Borrow> {
        let request = self
            .client
            .post(self.url("/api/borrow"))
            .json(&BorrowBookRequest::from(request));
        let borrow: BorrowResponse = self.fetch(request).await?;
        Ok(borrow.into())
    }

    async fn borrow_summary(&self) -> Result<Vec<BorrowSummary>> {
        let summaries: Vec<BorrowSummaryResponse> =
            self.fetch(self.client.get(self.url("/api/borrow"))).await?;
        Ok(summaries.into_iter().map(BorrowSummary::from).collect())
    }
}
