use crate::domain::{
    self, Book, BookId, Borrow, BorrowSummary,
    commands::{BorrowBook, CreateBook, UpdateBook},
};
use crate::ports::*;
use std::sync::Arc;

use super::errors::{LibraryApplicationError, Result};

/// リビジョン競合時の最大試行回数
const MAX_WRITE_ATTEMPTS: usize = 3;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞いは持たず、各ユースケース関数に引数として渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub book_repository: Arc<dyn BookRepository>,
    pub borrow_read_model: Arc<dyn BorrowReadModel>,
}

/// リポジトリから書籍を読み込むヘルパー関数
///
/// # エラー
/// - RepositoryError: 読み込み失敗
/// - BookNotFound: 書籍が存在しない
async fn load_book(repository: &Arc<dyn BookRepository>, book_id: &BookId) -> Result<Book> {
    repository
        .get_by_id(book_id)
        .await
        .map_err(LibraryApplicationError::RepositoryError)?
        .ok_or_else(|| LibraryApplicationError::BookNotFound(book_id.clone()))
}

/// 書籍を登録する
///
/// ビジネスルール：
/// - タイトル、著者、ISBNは必須
/// - availableは在庫数から導出する（入力値は受け付けない）
pub async fn create_book(deps: &ServiceDependencies, cmd: CreateBook) -> Result<Book> {
    let book = domain::create_book(cmd, BookId::generate())?;

    deps.book_repository
        .insert(book.clone())
        .await
        .map_err(LibraryApplicationError::RepositoryError)?;

    tracing::info!(book_id = %book.id, copies = book.copies, "Book created");

    Ok(book)
}

/// IDで書籍を取得する
pub async fn get_book(deps: &ServiceDependencies, book_id: &BookId) -> Result<Book> {
    load_book(&deps.book_repository, book_id).await
}

/// 検索条件に合う書籍一覧を取得する
pub async fn list_books(deps: &ServiceDependencies, query: &BookQuery) -> Result<Vec<Book>> {
    deps.book_repository
        .list(query)
        .await
        .map_err(LibraryApplicationError::RepositoryError)
}

/// 書籍情報を更新する
///
/// ビジネスルール：
/// - 書籍が存在すること
/// - 更新後もタイトル、著者、ISBNは必須
/// - 在庫数が変わればavailableを再計算する
///
/// リビジョンが競合した場合は最新の状態を読み直して再適用する。
pub async fn update_book(deps: &ServiceDependencies, cmd: UpdateBook) -> Result<Book> {
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = load_book(&deps.book_repository, &cmd.book_id).await?;
        let updated = domain::update_book(&current, cmd.patch.clone(), cmd.updated_at)?;

        let written = deps
            .book_repository
            .replace(updated.clone(), current.version)
            .await
            .map_err(LibraryApplicationError::RepositoryError)?;

        if written {
            tracing::info!(book_id = %updated.id, version = updated.version, "Book updated");
            return Ok(updated);
        }

        tracing::debug!(book_id = %cmd.book_id, attempt, "Version conflict on update");
    }

    Err(LibraryApplicationError::ConcurrentModification(cmd.book_id))
}

/// 書籍を削除する
pub async fn delete_book(deps: &ServiceDependencies, book_id: &BookId) -> Result<()> {
    let deleted = deps
        .book_repository
        .delete(book_id)
        .await
        .map_err(LibraryApplicationError::RepositoryError)?;

    if !deleted {
        return Err(LibraryApplicationError::BookNotFound(book_id.clone()));
    }

    tracing::info!(book_id = %book_id, "Book deleted");

    Ok(())
}

/// 書籍を貸し出す（台帳の取引）
///
/// ビジネスルール：
/// - 書籍が存在すること
/// - 数量が1以上かつ現在の在庫数以下であること
/// - 返却期限がリクエスト日以降であること
///
/// 検証・在庫の減算・貸出記録はストア内で1つの原子的な操作として行う。
/// 同時に貸出があっても在庫が足りる限りすべて受理され、
/// 最後の1冊を借りられるのは1件だけになる。
///
/// # 戻り値
/// 受理された貸出記録
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<Borrow> {
    let outcome = deps
        .book_repository
        .borrow_copies(&cmd)
        .await
        .map_err(LibraryApplicationError::RepositoryError)?;

    match outcome {
        BorrowOutcome::Recorded { book, borrow } => {
            tracing::info!(
                book_id = %borrow.book_id,
                borrow_id = %borrow.id.value(),
                quantity = borrow.quantity,
                remaining = book.copies,
                "Book borrowed"
            );
            Ok(borrow)
        }
        BorrowOutcome::Rejected(err) => {
            tracing::info!(book_id = %cmd.book_id, quantity = cmd.quantity, "Borrow rejected: {}", err);
            Err(err.into())
        }
        BorrowOutcome::BookNotFound => Err(LibraryApplicationError::BookNotFound(cmd.book_id)),
    }
}

/// 書籍ごとの貸出集計を取得する
pub async fn borrow_summary(deps: &ServiceDependencies) -> Result<Vec<BorrowSummary>> {
    deps.borrow_read_model
        .summary()
        .await
        .map_err(LibraryApplicationError::ReadModelError)
}
