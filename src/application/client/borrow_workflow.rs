use crate::domain::{self, Book, BookId, Borrow, BorrowRequest, BorrowValidationError};
use crate::ports::LibraryApi;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::cache::BookCache;
use super::errors::{BorrowErrorKind, BorrowWorkflowError};

/// 通知の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// 表示層に渡す通知
///
/// 失敗は必ず`NoticeLevel::Error`で通知する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// 失敗した貸出試行の記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowFailure {
    pub kind: BorrowErrorKind,
    pub message: String,
}

impl BorrowFailure {
    fn notice(&self) -> Notice {
        let message = match self.kind {
            BorrowErrorKind::ValidationFailed => self.message.clone(),
            BorrowErrorKind::NotFound => "Book not found.".to_string(),
            _ => "Borrow failed.".to_string(),
        };
        Notice {
            level: NoticeLevel::Error,
            message,
        }
    }
}

/// 貸出試行の状態
///
/// `Idle → Validating → Submitting → {Succeeded | Failed}`
/// 終端状態から`Submitting`へは`reset`で`Idle`に戻さない限り遷移しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowState {
    Idle,
    Validating,
    Submitting,
    Succeeded(Borrow),
    Failed(BorrowFailure),
}

impl BorrowState {
    /// リクエストが処理中か（送信ボタンを無効化すべきか）
    pub fn is_in_flight(&self) -> bool {
        matches!(self, BorrowState::Validating | BorrowState::Submitting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BorrowState::Succeeded(_) | BorrowState::Failed(_))
    }

    /// 結果に応じた通知（終端状態のみ）
    pub fn notice(&self) -> Option<Notice> {
        match self {
            BorrowState::Succeeded(_) => Some(Notice {
                level: NoticeLevel::Success,
                message: "Borrowed successfully!".to_string(),
            }),
            BorrowState::Failed(failure) => Some(failure.notice()),
            _ => None,
        }
    }
}

/// 貸出ワークフロー
///
/// 利用者の貸出意図とリモート台帳の間を取り持つ。
/// ネットワークに出る前にスナップショットで事前検証し、
/// 成功した取引の後はスナップショットを破棄して再取得させる。
///
/// 1インスタンスが1つの画面に対応し、同時に処理できる試行は1つだけ。
pub struct BorrowWorkflow {
    api: Arc<dyn LibraryApi>,
    cache: Arc<BookCache>,
    state: Mutex<BorrowState>,
}

impl BorrowWorkflow {
    pub fn new(api: Arc<dyn LibraryApi>, cache: Arc<BookCache>) -> Self {
        Self {
            api,
            cache,
            state: Mutex::new(BorrowState::Idle),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BorrowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 現在の状態
    pub fn state(&self) -> BorrowState {
        self.lock_state().clone()
    }

    /// 送信可能か
    pub fn can_submit(&self) -> bool {
        matches!(*self.lock_state(), BorrowState::Idle)
    }

    /// 終端状態から`Idle`に戻す
    ///
    /// 処理中の場合は戻せない。
    pub fn reset(&self) -> Result<(), BorrowWorkflowError> {
        let mut state = self.lock_state();
        if state.is_in_flight() {
            return Err(BorrowWorkflowError::SubmissionInFlight);
        }
        *state = BorrowState::Idle;
        Ok(())
    }

    /// 書籍のスナップショットを取得する
    ///
    /// キャッシュ済みなら台帳には問い合わせない。リトライはしない。
    ///
    /// # エラー
    /// - NotFound: IDが空、または台帳に存在しない
    /// - TransportError: 通信障害
    pub async fn load_book(&self, book_id: &BookId) -> Result<Book, BorrowWorkflowError> {
        if book_id.is_blank() {
            return Err(BorrowWorkflowError::NotFound(book_id.clone()));
        }

        self.cache
            .load_book(self.api.as_ref(), book_id)
            .await
            .map_err(|e| BorrowWorkflowError::from_remote(e, book_id))
    }

    /// 貸出リクエストを事前検証する（純粋関数）
    ///
    /// `1 <= quantity <= book.copies`かつ返却期限が入力されていれば成功。
    pub fn validate(
        book: &Book,
        quantity: u32,
        due_date: Option<NaiveDate>,
    ) -> Result<BorrowRequest, BorrowValidationError> {
        domain::validate(book, quantity, due_date)
    }

    /// 貸出取引を送信する
    ///
    /// 処理フロー：
    /// 1. `Idle → Validating`（処理中・終了済みなら拒否）
    /// 2. スナップショットで事前検証（失敗時は送信せず`Failed`）
    /// 3. `Submitting`で台帳に1回だけ送信
    /// 4. 成功時はスナップショットを破棄して`Succeeded`
    ///
    /// 失敗はリトライせず、そのまま呼び出し元へ返す。
    pub async fn submit_borrow(
        &self,
        book_id: &BookId,
        quantity: u32,
        due_date: Option<NaiveDate>,
    ) -> Result<Borrow, BorrowWorkflowError> {
        self.begin()?;

        let request = match self.prepare(book_id, quantity, due_date).await {
            Ok(request) => request,
            Err(err) => return Err(self.fail(err)),
        };

        self.transition(BorrowState::Submitting);
        tracing::debug!(book_id = %book_id, quantity, "Submitting borrow request");

        match self.api.borrow(&request).await {
            Ok(borrow) => {
                // 台帳の在庫が変わったのでスナップショットは古い
                self.cache.invalidate(book_id);
                self.transition(BorrowState::Succeeded(borrow.clone()));
                tracing::info!(book_id = %book_id, quantity, "Borrow succeeded");
                Ok(borrow)
            }
            Err(err) => {
                let err = BorrowWorkflowError::from_remote(err, book_id);
                if matches!(
                    err.kind(),
                    BorrowErrorKind::TransactionRejected | BorrowErrorKind::NotFound
                ) {
                    // 拒否された場合もスナップショットが古い可能性が高い
                    self.cache.invalidate(book_id);
                }
                tracing::warn!(book_id = %book_id, quantity, "Borrow failed: {}", err);
                Err(self.fail(err))
            }
        }
    }

    fn begin(&self) -> Result<(), BorrowWorkflowError> {
        let mut state = self.lock_state();
        match *state {
            BorrowState::Idle => {
                *state = BorrowState::Validating;
                Ok(())
            }
            BorrowState::Validating | BorrowState::Submitting => {
                Err(BorrowWorkflowError::SubmissionInFlight)
            }
            BorrowState::Succeeded(_) | BorrowState::Failed(_) => {
                Err(BorrowWorkflowError::AttemptFinished)
            }
        }
    }

    async fn prepare(
        &self,
        book_id: &BookId,
        quantity: u32,
        due_date: Option<NaiveDate>,
    ) -> Result<BorrowRequest, BorrowWorkflowError> {
        let book = self.load_book(book_id).await?;
        let request = Self::validate(&book, quantity, due_date)?;
        Ok(request)
    }

    fn transition(&self, next: BorrowState) {
        *self.lock_state() = next;
    }

    fn fail(&self, err: BorrowWorkflowError) -> BorrowWorkflowError {
        self.transition(BorrowState::Failed(BorrowFailure {
            kind: err.kind(),
            message: err.to_string(),
        }));
        err
    }
}
