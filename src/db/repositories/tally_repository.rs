use crate::db::connection::DbPool;
use sqlx::Error;

/// Add `delta` to `results[option]` on every poll that lists `option`.
///
/// A single statement, so concurrent flushes from several counters add up
/// instead of overwriting each other. Returns the number of polls touched.
pub async fn increment_results(pool: &DbPool, option: &str, delta: i64) -> Result<u64, Error> {
    let result = sqlx::query(
        r#"
        UPDATE polls
        SET results = jsonb_set(
            results,
            ARRAY[$1::text],
            to_jsonb(COALESCE((results ->> $1::text)::bigint, 0) + $2::bigint),
            true
        )
        WHERE $1::text = ANY(options)
        "#,
    )
    .bind(option)
    .bind(delta)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
