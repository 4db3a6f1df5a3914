use crate::domain::{BookId, BorrowValidationError};
use crate::ports::RemoteError;
use thiserror::Error;

/// 貸出ワークフローのエラー種別
///
/// 状態として保持するための複製可能な分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowErrorKind {
    NotFound,
    ValidationFailed,
    TransactionRejected,
    TransportError,
    SubmissionInFlight,
    AttemptFinished,
}

/// 貸出ワークフローのエラー
#[derive(Debug, Error)]
pub enum BorrowWorkflowError {
    /// 書籍IDが解決できない
    #[error("Book not found: {0}")]
    NotFound(BookId),

    /// ローカルの事前検証に失敗（ネットワークには出ていない）
    #[error("{0}")]
    ValidationFailed(#[from] BorrowValidationError),

    /// 台帳が取引を拒否した
    #[error("Transaction rejected ({code}): {message}")]
    TransactionRejected { code: String, message: String },

    /// 通信・インフラの障害
    #[error("Transport error")]
    TransportError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 送信中のリクエストがある
    #[error("A borrow request is already in flight")]
    SubmissionInFlight,

    /// この試行は終了済み（resetが必要）
    #[error("Borrow attempt already finished; reset before submitting again")]
    AttemptFinished,
}

impl BorrowWorkflowError {
    pub fn kind(&self) -> BorrowErrorKind {
        match self {
            BorrowWorkflowError::NotFound(_) => BorrowErrorKind::NotFound,
            BorrowWorkflowError::ValidationFailed(_) => BorrowErrorKind::ValidationFailed,
            BorrowWorkflowError::TransactionRejected { .. } => {
                BorrowErrorKind::TransactionRejected
            }
            BorrowWorkflowError::TransportError(_) => BorrowErrorKind::TransportError,
            BorrowWorkflowError::SubmissionInFlight => BorrowErrorKind::SubmissionInFlight,
            BorrowWorkflowError::AttemptFinished => BorrowErrorKind::AttemptFinished,
        }
    }

    /// リモートエラーをそのまま呼び出し元へ伝える形に変換する
    pub(crate) fn from_remote(err: RemoteError, book_id: &BookId) -> Self {
        match err {
            RemoteError::NotFound => BorrowWorkflowError::NotFound(book_id.clone()),
            RemoteError::Rejected { code, message } => {
                BorrowWorkflowError::TransactionRejected { code, message }
            }
            RemoteError::Transport(e) => BorrowWorkflowError::TransportError(e),
        }
    }
}
