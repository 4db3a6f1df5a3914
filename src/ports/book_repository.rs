use crate::domain::{Book, BookId, Borrow, BorrowBookError, Genre, commands::BorrowBook};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 一覧の並び替えキー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    Copies,
}

impl SortField {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::Title => "title",
            SortField::Copies => "copies",
        }
    }
}

/// 並び順
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// 書籍一覧の検索条件
///
/// 既定は登録日時の降順、件数制限なし。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookQuery {
    pub genre: Option<Genre>,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl BookQuery {
    /// メモリ上の書籍列に検索条件を適用する
    ///
    /// 同値のときはIDで順序を固定する。
    pub fn apply(&self, books: impl IntoIterator<Item = Book>) -> Vec<Book> {
        let mut books: Vec<Book> = books
            .into_iter()
            .filter(|book| self.genre.is_none_or(|genre| book.genre == genre))
            .collect();

        books.sort_by(|a, b| {
            let ordering = match self.sort_by {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Title => a.title.cmp(&b.title),
                SortField::Copies => a.copies.cmp(&b.copies),
            };
            let ordering = match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        if let Some(limit) = self.limit {
            books.truncate(limit);
        }

        books
    }
}

/// 貸出取引の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowOutcome {
    /// 受理され、在庫と貸出記録が書き込まれた
    Recorded { book: Book, borrow: Borrow },
    /// 数量・在庫・返却期限のルールで拒否された（何も書き込まれない）
    Rejected(BorrowBookError),
    /// 書籍が存在しない
    BookNotFound,
}

/// 書籍リポジトリポート
///
/// 台帳の在庫状態を永続化する。書籍情報の置き換えはリビジョンによる
/// 楽観的排他制御を伴い、競合時は`false`を返す。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 新しい書籍を保存する
    async fn insert(&self, book: Book) -> Result<()>;

    /// IDで書籍を取得する
    async fn get_by_id(&self, book_id: &BookId) -> Result<Option<Book>>;

    /// 検索条件に合う書籍を取得する
    async fn list(&self, query: &BookQuery) -> Result<Vec<Book>>;

    /// 書籍を置き換える
    ///
    /// 保存済みのリビジョンが`expected_version`と一致する場合のみ書き込む。
    async fn replace(&self, book: Book, expected_version: u64) -> Result<bool>;

    /// 書籍を削除する
    ///
    /// 存在しなかった場合は`false`を返す。
    async fn delete(&self, book_id: &BookId) -> Result<bool>;

    /// 貸出取引を実行する
    ///
    /// 在庫の検証・減算と貸出記録の追加を1つの原子的な操作として行う。
    /// 同じ書籍への貸出はストア内で直列化され、リビジョン競合は呼び出し元に返らない。
    async fn borrow_copies(&self, cmd: &BorrowBook) -> Result<BorrowOutcome>;
}
