use library_ledger::adapters::local::LocalLibraryApi;
use library_ledger::application::client::{
    BookCache, BorrowErrorKind, BorrowState, BorrowWorkflow, BorrowWorkflowError, CatalogClient,
    NoticeLevel,
};
use library_ledger::domain::{
    Book, BookId, BookPatch, Borrow, BorrowRequest, BorrowSummary, BorrowValidationError,
    NewBook, parse_due_date,
};
use library_ledger::ports::{BookQuery, LibraryApi, RemoteError, library_api};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

mod common;

// ============================================================================
// テスト用のLibraryApi
// ============================================================================

/// 呼び出し回数を数えるLibraryApi
///
/// 事前検証で弾かれたときにネットワークへ出ていないことを確認する。
struct CountingApi {
    inner: Arc<dyn LibraryApi>,
    get_book_calls: AtomicUsize,
    list_calls: AtomicUsize,
    borrow_calls: AtomicUsize,
    fail_borrow: bool,
}

impl CountingApi {
    fn new(inner: Arc<dyn LibraryApi>) -> Self {
        Self {
            inner,
            get_book_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            borrow_calls: AtomicUsize::new(0),
            fail_borrow: false,
        }
    }

    /// 貸出だけが通信障害で失敗する
    fn failing_borrow(inner: Arc<dyn LibraryApi>) -> Self {
        Self {
            fail_borrow: true,
            ..Self::new(inner)
        }
    }

    fn get_book_calls(&self) -> usize {
        self.get_book_calls.load(Ordering::SeqCst)
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn borrow_calls(&self) -> usize {
        self.borrow_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LibraryApi for CountingApi {
    async fn get_book(&self, book_id: &BookId) -> library_api::Result<Book> {
        self.get_book_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_book(book_id).await
    }

    async fn list_books(&self, query: &BookQuery) -> library_api::Result<Vec<Book>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_books(query).await
    }

    async fn create_book(&self, book: &NewBook) -> library_api::Result<Book> {
        self.inner.create_book(book).await
    }

    async fn update_book(&self, book_id: &BookId, patch: &BookPatch) -> library_api::Result<Book> {
        self.inner.update_book(book_id, patch).await
    }

    async fn delete_book(&self, book_id: &BookId) -> library_api::Result<()> {
        self.inner.delete_book(book_id).await
    }

    async fn borrow(&self, request: &BorrowRequest) -> library_api::Result<Borrow> {
        self.borrow_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_borrow {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        self.inner.borrow(request).await
    }

    async fn borrow_summary(&self) -> library_api::Result<Vec<BorrowSummary>> {
        self.inner.borrow_summary().await
    }
}

/// 貸出の送信を外部から止めておけるLibraryApi
struct GatedApi {
    inner: Arc<dyn LibraryApi>,
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl LibraryApi for GatedApi {
    async fn get_book(&self, book_id: &BookId) -> library_api::Result<Book> {
        self.inner.get_book(book_id).await
    }

    async fn list_books(&self, query: &BookQuery) -> library_api::Result<Vec<Book>> {
        self.inner.list_books(query).await
    }

    async fn create_book(&self, book: &NewBook) -> library_api::Result<Book> {
        self.inner.create_book(book).await
    }

    async fn update_book(&self, book_id: &BookId, patch: &BookPatch) -> library_api::Result<Book> {
        self.inner.update_book(book_id, patch).await
    }

    async fn delete_book(&self, book_id: &BookId) -> library_api::Result<()> {
        self.inner.delete_book(book_id).await
    }

    async fn borrow(&self, request: &BorrowRequest) -> library_api::Result<Borrow> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.borrow(request).await
    }

    async fn borrow_summary(&self) -> library_api::Result<Vec<BorrowSummary>> {
        self.inner.borrow_summary().await
    }
}

// ============================================================================
// ヘルパー関数
// ============================================================================

fn local_api() -> Arc<dyn LibraryApi> {
    Arc::new(LocalLibraryApi::new(common::in_memory_deps()))
}

async fn seed(api: &dyn LibraryApi, title: &str, copies: u32) -> Book {
    api.create_book(&common::new_book(title, copies))
        .await
        .expect("Failed to seed book")
}

// ============================================================================
// 書籍の読み込み
// ============================================================================

#[tokio::test]
async fn test_load_book_is_cached_until_invalidated() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 3).await;
    let api = Arc::new(CountingApi::new(ledger));
    let cache = Arc::new(BookCache::new());
    let workflow = BorrowWorkflow::new(api.clone(), cache.clone());

    let first = workflow.load_book(&book.id).await.unwrap();
    let second = workflow.load_book(&book.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(api.get_book_calls(), 1);

    cache.invalidate(&book.id);
    workflow.load_book(&book.id).await.unwrap();
    assert_eq!(api.get_book_calls(), 2);
}

#[tokio::test]
async fn test_load_book_with_blank_id_does_not_call_ledger() {
    let api = Arc::new(CountingApi::new(local_api()));
    let workflow = BorrowWorkflow::new(api.clone(), Arc::new(BookCache::new()));

    let result = workflow.load_book(&BookId::new("")).await;

    assert!(matches!(result, Err(BorrowWorkflowError::NotFound(_))));
    assert_eq!(api.get_book_calls(), 0);
}

#[tokio::test]
async fn test_load_unknown_book_returns_not_found() {
    let workflow = BorrowWorkflow::new(local_api(), Arc::new(BookCache::new()));

    let result = workflow.load_book(&BookId::new("missing")).await;

    assert!(matches!(result, Err(BorrowWorkflowError::NotFound(_))));
}

// ============================================================================
// 貸出の送信
// ============================================================================

#[tokio::test]
async fn test_borrow_all_copies_then_refetch_shows_unavailable() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 2).await;
    let api = Arc::new(CountingApi::new(ledger));
    let workflow = BorrowWorkflow::new(api.clone(), Arc::new(BookCache::new()));

    let snapshot = workflow.load_book(&book.id).await.unwrap();
    assert_eq!(snapshot.copies, 2);

    let borrow = workflow
        .submit_borrow(&book.id, 2, Some(common::days_from_today(7)))
        .await
        .unwrap();

    assert_eq!(borrow.quantity, 2);
    assert_eq!(workflow.state(), BorrowState::Succeeded(borrow));
    let notice = workflow.state().notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Borrowed successfully!");

    // 成功後はスナップショットが破棄され、再取得される
    let refreshed = workflow.load_book(&book.id).await.unwrap();
    assert_eq!(refreshed.copies, 0);
    assert!(!refreshed.available);
    assert_eq!(api.get_book_calls(), 2);
}

#[tokio::test]
async fn test_quantity_above_copies_fails_without_network_call() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 3).await;
    let api = Arc::new(CountingApi::new(ledger.clone()));
    let workflow = BorrowWorkflow::new(api.clone(), Arc::new(BookCache::new()));

    let result = workflow
        .submit_borrow(&book.id, 5, Some(common::days_from_today(7)))
        .await;

    assert!(matches!(
        result,
        Err(BorrowWorkflowError::ValidationFailed(
            BorrowValidationError::QuantityExceedsCopies {
                requested: 5,
                available: 3
            }
        ))
    ));
    assert_eq!(api.borrow_calls(), 0);

    let state = workflow.state();
    match &state {
        BorrowState::Failed(failure) => assert_eq!(failure.kind, BorrowErrorKind::ValidationFailed),
        other => panic!("Expected Failed, got {:?}", other),
    }
    let notice = state.notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Quantity exceeds available copies.");

    // 台帳の在庫は変わらない
    assert_eq!(ledger.get_book(&book.id).await.unwrap().copies, 3);
}

#[tokio::test]
async fn test_missing_due_date_fails_without_network_call() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 3).await;
    let api = Arc::new(CountingApi::new(ledger));
    let workflow = BorrowWorkflow::new(api.clone(), Arc::new(BookCache::new()));

    let due_date = parse_due_date("").unwrap();
    let result = workflow.submit_borrow(&book.id, 1, due_date).await;

    assert!(matches!(
        result,
        Err(BorrowWorkflowError::ValidationFailed(
            BorrowValidationError::DueDateMissing
        ))
    ));
    assert_eq!(api.borrow_calls(), 0);
}

#[tokio::test]
async fn test_past_due_date_is_rejected_by_ledger() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 3).await;
    let workflow = BorrowWorkflow::new(ledger, Arc::new(BookCache::new()));

    let result = workflow
        .submit_borrow(&book.id, 1, Some(common::yesterday()))
        .await;

    match result {
        Err(BorrowWorkflowError::TransactionRejected { code, .. }) => {
            assert_eq!(code, "DUE_DATE_IN_PAST");
        }
        other => panic!("Expected TransactionRejected, got {:?}", other),
    }
    assert_eq!(workflow.state().notice().unwrap().message, "Borrow failed.");
}

#[tokio::test]
async fn test_submit_unknown_book_fails_with_not_found() {
    let workflow = BorrowWorkflow::new(local_api(), Arc::new(BookCache::new()));

    let result = workflow
        .submit_borrow(&BookId::new("missing"), 1, Some(common::days_from_today(7)))
        .await;

    assert!(matches!(result, Err(BorrowWorkflowError::NotFound(_))));
    assert_eq!(workflow.state().notice().unwrap().message, "Book not found.");
}

#[tokio::test]
async fn test_transport_error_is_reported_and_snapshot_kept() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 3).await;
    let api = Arc::new(CountingApi::failing_borrow(ledger));
    let cache = Arc::new(BookCache::new());
    let workflow = BorrowWorkflow::new(api.clone(), cache.clone());

    let result = workflow
        .submit_borrow(&book.id, 1, Some(common::days_from_today(7)))
        .await;

    assert!(matches!(result, Err(BorrowWorkflowError::TransportError(_))));
    assert_eq!(api.borrow_calls(), 1);
    assert!(cache.get(&book.id).is_some());

    let notice = workflow.state().notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Borrow failed.");
}

#[tokio::test]
async fn test_two_screens_racing_for_last_copy() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 1).await;

    // 画面ごとにキャッシュを持ち、どちらも在庫1のスナップショットを見ている
    let first_cache = Arc::new(BookCache::new());
    let second_cache = Arc::new(BookCache::new());
    let first = BorrowWorkflow::new(ledger.clone(), first_cache.clone());
    let second = BorrowWorkflow::new(ledger.clone(), second_cache.clone());
    first.load_book(&book.id).await.unwrap();
    second.load_book(&book.id).await.unwrap();

    let due_date = Some(common::days_from_today(7));
    let (a, b) = tokio::join!(
        first.submit_borrow(&book.id, 1, due_date),
        second.submit_borrow(&book.id, 1, due_date),
    );

    let results = [a, b];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let rejection = results
        .into_iter()
        .find_map(|r| r.err())
        .expect("One borrow must be rejected");
    match rejection {
        BorrowWorkflowError::TransactionRejected { code, .. } => {
            assert_eq!(code, "INSUFFICIENT_COPIES");
        }
        other => panic!("Expected TransactionRejected, got {:?}", other),
    }

    // 成功した画面も拒否された画面もスナップショットを破棄している
    assert!(first_cache.get(&book.id).is_none());
    assert!(second_cache.get(&book.id).is_none());
    assert!(first.state().is_terminal());
    assert!(second.state().is_terminal());
    assert_eq!(ledger.get_book(&book.id).await.unwrap().copies, 0);
}

// ============================================================================
// 状態遷移
// ============================================================================

#[tokio::test]
async fn test_finished_attempt_requires_reset() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 5).await;
    let workflow = BorrowWorkflow::new(ledger, Arc::new(BookCache::new()));
    let due_date = Some(common::days_from_today(7));

    assert!(workflow.can_submit());
    workflow.submit_borrow(&book.id, 1, due_date).await.unwrap();
    assert!(workflow.state().is_terminal());
    assert!(!workflow.can_submit());

    let again = workflow.submit_borrow(&book.id, 1, due_date).await;
    assert!(matches!(again, Err(BorrowWorkflowError::AttemptFinished)));

    workflow.reset().unwrap();
    assert_eq!(workflow.state(), BorrowState::Idle);
    workflow.submit_borrow(&book.id, 1, due_date).await.unwrap();
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_refused() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 5).await;
    let gate = Arc::new(GatedApi {
        inner: ledger.clone(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let workflow = Arc::new(BorrowWorkflow::new(gate.clone(), Arc::new(BookCache::new())));
    let due_date = Some(common::days_from_today(7));

    let task = {
        let workflow = workflow.clone();
        let book_id = book.id.clone();
        tokio::spawn(async move { workflow.submit_borrow(&book_id, 1, due_date).await })
    };

    gate.entered.notified().await;
    assert_eq!(workflow.state(), BorrowState::Submitting);
    assert!(workflow.state().is_in_flight());
    assert!(!workflow.can_submit());

    let second = workflow.submit_borrow(&book.id, 1, due_date).await;
    assert!(matches!(second, Err(BorrowWorkflowError::SubmissionInFlight)));
    assert!(matches!(
        workflow.reset(),
        Err(BorrowWorkflowError::SubmissionInFlight)
    ));

    gate.release.notify_one();
    let borrow = task.await.unwrap().unwrap();

    assert_eq!(workflow.state(), BorrowState::Succeeded(borrow));
    // 2回目の送信は台帳に届いていない
    assert_eq!(ledger.get_book(&book.id).await.unwrap().copies, 4);
}

// ============================================================================
// カタログクライアント
// ============================================================================

#[tokio::test]
async fn test_catalog_invalidates_after_mutations() {
    let api = Arc::new(CountingApi::new(local_api()));
    let catalog = CatalogClient::new(api.clone(), Arc::new(BookCache::new()));
    let query = BookQuery::default();

    assert!(catalog.list_books(&query).await.unwrap().is_empty());
    assert!(catalog.list_books(&query).await.unwrap().is_empty());
    assert_eq!(api.list_calls(), 1);

    let created = catalog.create_book(&common::new_book("Dune", 2)).await.unwrap();
    assert_eq!(catalog.list_books(&query).await.unwrap().len(), 1);
    assert_eq!(api.list_calls(), 2);

    catalog.get_book(&created.id).await.unwrap();
    let updated = catalog
        .update_book(
            &created.id,
            &BookPatch {
                copies: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.available);
    assert_eq!(catalog.get_book(&created.id).await.unwrap(), updated);
    assert_eq!(api.get_book_calls(), 2);

    catalog.delete_book(&created.id).await.unwrap();
    assert!(matches!(
        catalog.get_book(&created.id).await,
        Err(RemoteError::NotFound)
    ));
    assert!(catalog.list_books(&query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_catalog_borrow_summary_reflects_workflow() {
    let ledger = local_api();
    let book = seed(ledger.as_ref(), "Dune", 5).await;
    let cache = Arc::new(BookCache::new());
    let catalog = CatalogClient::new(ledger.clone(), cache.clone());
    let workflow = BorrowWorkflow::new(ledger, cache);

    workflow
        .submit_borrow(&book.id, 3, Some(common::days_from_today(7)))
        .await
        .unwrap();

    let summary = catalog.borrow_summary().await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].title, "Dune");
    assert_eq!(summary[0].total_quantity, 3);
}
