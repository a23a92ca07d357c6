use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Opens the pool and makes sure the schema exists.
pub async fn connect(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(url)
        .await?;
    init(&pool).await?;
    Ok(pool)
}

pub async fn init(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            sender_id   TEXT NOT NULL,
            receiver_id TEXT NOT NULL,
            message     TEXT NOT NULL,
            read        BOOLEAN NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages (receiver_id, read)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
