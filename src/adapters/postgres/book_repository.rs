use crate::domain::{Book, BookId, Borrow, Genre, borrow_book, commands::BorrowBook};
use crate::ports::book_repository::{
    BookQuery, BookRepository as BookRepositoryTrait, BorrowOutcome, Result, SortField, SortOrder,
};
use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};
use std::str::FromStr;

fn invalid_data(message: String) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// PostgreSQLの行データをBookに変換する
///
/// copies・versionのi64から符号なし整数への変換と、
/// genreの文字列からの変換でエラーハンドリングを行う。
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let copies_i64: i64 = row.get("copies");
    let copies: u32 = copies_i64
        .try_into()
        .map_err(|_| invalid_data(format!("copies out of range: {}", copies_i64)))?;

    let version_i64: i64 = row.get("version");
    let version: u64 = version_i64
        .try_into()
        .map_err(|_| invalid_data(format!("version out of range: {}", version_i64)))?;

    let genre_str: &str = row.get("genre");
    let genre = Genre::from_str(genre_str).map_err(invalid_data)?;

    Ok(Book {
        id: BookId::new(row.get::<String, _>("id")),
        title: row.get("title"),
        author: row.get("author"),
        genre,
        isbn: row.get("isbn"),
        description: row.get("description"),
        copies,
        available: row.get("available"),
        version,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| invalid_data(format!("value out of range: {}", value)))
}

/// リビジョンが一致する行だけを更新する
///
/// 更新した行数を返す（0なら競合または存在しない）。
async fn update_if_version<'e, E: PgExecutor<'e>>(
    executor: E,
    book: &Book,
    expected_version: u64,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET
            title = $2,
            author = $3,
            genre = $4,
            isbn = $5,
            description = $6,
            copies = $7,
            available = $8,
            version = $9,
            updated_at = $10
        WHERE id = $1 AND version = $11
        "#,
    )
    .bind(book.id.as_str())
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.genre.as_str())
    .bind(&book.isbn)
    .bind(&book.description)
    .bind(i64::from(book.copies))
    .bind(book.available)
    .bind(to_i64(book.version)?)
    .bind(book.updated_at)
    .bind(to_i64(expected_version)?)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// BookRepositoryのPostgreSQL実装
///
/// 書き込みはすべて`version`列による楽観的排他制御を行う。
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    /// PostgreSQLコネクションプールから新しいBookRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn insert(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                id,
                title,
                author,
                genre,
                isbn,
                description,
                copies,
                available,
                version,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(book.id.as_str())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre.as_str())
        .bind(&book.isbn)
        .bind(&book.description)
        .bind(i64::from(book.copies))
        .bind(book.available)
        .bind(to_i64(book.version)?)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, book_id: &BookId) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT
                id, title, author, genre, isbn, description,
                copies, available, version, created_at, updated_at
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(book_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    /// 検索条件に合う書籍を取得する
    ///
    /// 並び替え列は列挙型から固定の列名に対応づけるため、
    /// 利用者の入力がSQLに埋め込まれることはない。
    async fn list(&self, query: &BookQuery) -> Result<Vec<Book>> {
        let column = match query.sort_by {
            SortField::CreatedAt => "created_at",
            SortField::Title => "title",
            SortField::Copies => "copies",
        };
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let limit = query
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let sql = format!(
            r#"
            SELECT
                id, title, author, genre, isbn, description,
                copies, available, version, created_at, updated_at
            FROM books
            WHERE ($1::VARCHAR IS NULL OR genre = $1)
            ORDER BY {} {}, id ASC
            LIMIT $2
            "#,
            column, direction
        );

        let rows = sqlx::query(&sql)
            .bind(query.genre.map(|g| g.as_str()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn replace(&self, book: Book, expected_version: u64) -> Result<bool> {
        let updated = update_if_version(&self.pool, &book, expected_version).await?;
        Ok(updated == 1)
    }

    async fn delete(&self, book_id: &BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 在庫の検証・減算と貸出記録の追加を1トランザクションで行う
    ///
    /// `SELECT ... FOR UPDATE`で行をロックしてから最新の在庫で検証するため、
    /// 同じ書籍への貸出は直列化される。拒否時はロールバックして何も書き込まない。
    async fn borrow_copies(&self, cmd: &BorrowBook) -> Result<BorrowOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT
                id, title, author, genre, isbn, description,
                copies, available, version, created_at, updated_at
            FROM books
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(cmd.book_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(BorrowOutcome::BookNotFound);
        };
        let current = map_row_to_book(&row)?;

        let (updated, event) = match borrow_book(
            &current,
            cmd.quantity,
            cmd.due_date,
            cmd.requested_at.date_naive(),
            cmd.requested_at,
        ) {
            Ok(result) => result,
            Err(err) => {
                tx.rollback().await?;
                return Ok(BorrowOutcome::Rejected(err));
            }
        };

        // 行ロック中なのでリビジョンは必ず一致する
        let written = update_if_version(&mut *tx, &updated, current.version).await?;
        if written != 1 {
            tx.rollback().await?;
            return Err(invalid_data(format!(
                "Book {} changed while locked",
                current.id
            )));
        }

        let borrow = Borrow::from(event);
        sqlx::query(
            r#"
            INSERT INTO borrows (id, book_id, quantity, due_date, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(borrow.id.value())
        .bind(borrow.book_id.as_str())
        .bind(i64::from(borrow.quantity))
        .bind(borrow.due_date)
        .bind(borrow.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BorrowOutcome::Recorded {
            book: updated,
            borrow,
        })
    }
}
