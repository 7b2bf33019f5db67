use crate::db::connection::DbPool;
use crate::db::models::Poll;
use sqlx::Error;
use sqlx::Row;

/// Every option of every stored poll, in storage order. Duplicates across
/// polls are kept.
pub async fn list_current_options(pool: &DbPool) -> Result<Vec<String>, Error> {
    let rows = sqlx::query("SELECT options FROM polls ORDER BY title")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .flat_map(|r| r.get::<Vec<String>, _>("options"))
        .collect())
}

pub async fn get_all_polls(pool: &DbPool) -> Result<Vec<Poll>, Error> {
    let rows = sqlx::query_as::<_, Poll>("SELECT id, title, options, results FROM polls ORDER BY title")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
