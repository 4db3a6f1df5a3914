use crate::domain::{BookId, Borrow, BorrowId, BorrowSummary};
use crate::ports::borrow_read_model::{BorrowReadModel as BorrowReadModelTrait, Result};
use async_trait::async_trait;
use futures::stream::{StreamExt, TryStreamExt};
use sqlx::{PgPool, Row, postgres::PgRow};

fn out_of_range(column: &str, value: i64) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{} out of range: {}", column, value),
    ))
}

/// PostgreSQLの行データをBorrowに変換する
fn map_row_to_borrow(row: &PgRow) -> Result<Borrow> {
    let quantity_i64: i64 = row.get("quantity");
    let quantity: u32 = quantity_i64
        .try_into()
        .map_err(|_| out_of_range("quantity", quantity_i64))?;

    Ok(Borrow {
        id: BorrowId::from_uuid(row.get("id")),
        book_id: BookId::new(row.get::<String, _>("book_id")),
        quantity,
        due_date: row.get("due_date"),
        created_at: row.get("created_at"),
    })
}

/// BorrowReadModelのPostgreSQL実装
///
/// 貸出記録は`BookRepository::borrow_copies`が書き込む。
/// 集計は書籍テーブルと結合するため、削除済みの書籍は含まれない。
pub struct BorrowReadModel {
    pool: PgPool,
}

impl BorrowReadModel {
    /// PostgreSQLコネクションプールから新しいBorrowReadModelを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowReadModelTrait for BorrowReadModel {
    async fn find_by_book_id(&self, book_id: &BookId) -> Result<Vec<Borrow>> {
        sqlx::query(
            r#"
            SELECT id, book_id, quantity, due_date, created_at
            FROM borrows
            WHERE book_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(book_id.as_str())
        .fetch(&self.pool)
        .map(|row| -> Result<Borrow> { map_row_to_borrow(&row?) })
        .try_collect()
        .await
    }

    async fn summary(&self) -> Result<Vec<BorrowSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT
                b.id AS book_id,
                b.title,
                b.isbn,
                SUM(br.quantity)::BIGINT AS total_quantity
            FROM borrows br
            JOIN books b ON b.id = br.book_id
            GROUP BY b.id, b.title, b.isbn
            ORDER BY total_quantity DESC, b.title ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let total_i64: i64 = row.get("total_quantity");
                let total_quantity: u64 = total_i64
                    .try_into()
                    .map_err(|_| out_of_range("total_quantity", total_i64))?;

                Ok(BorrowSummary {
                    book_id: BookId::new(row.get::<String, _>("book_id")),
                    title: row.get("title"),
                    isbn: row.get("isbn"),
                    total_quantity,
                })
            })
            .collect()
    }
}
