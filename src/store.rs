use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// A persisted direct message. `read` flips only through [`MessageStore::mark_read`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("message text must not be empty")]
    EmptyBody,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Durable home of messages. The relay only ever calls `create`; the read
/// side serves the REST endpoints.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores a new message. The store assigns the id and the creation
    /// timestamp; the read flag starts out false.
    async fn create(
        &self,
        sender_id: &str,
        receiver_id: &str,
        message: &str,
    ) -> Result<Message, StoreError>;

    /// Both directions of the conversation between `a` and `b`, oldest first.
    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<Message>, StoreError>;

    /// Unread counts for `receiver_id`, grouped by sender.
    async fn unread_by_sender(&self, receiver_id: &str) -> Result<Vec<(String, i64)>, StoreError>;

    /// Marks everything `sender_id` sent to `receiver_id` as read.
    /// Returns how many rows flipped.
    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn create(
        &self,
        sender_id: &str,
        receiver_id: &str,
        message: &str,
    ) -> Result<Message, StoreError> {
        if message.is_empty() {
            return Err(StoreError::EmptyBody);
        }

        let id = Uuid::now_v7().to_string();
        let created_at = OffsetDateTime::now_utc().format(&Rfc3339)?;

        sqlx::query(
            "INSERT INTO messages (id,sender_id,receiver_id,message,read,created_at)
             VALUES (?,?,?,?,0,?)",
        )
        .bind(&id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(message)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id,
            sender_id: sender_id.to_owned(),
            receiver_id: receiver_id.to_owned(),
            message: message.to_owned(),
            read: false,
            created_at,
        })
    }

    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<Message>, StoreError> {
        let messages = sqlx::query_as(
            "SELECT id,sender_id,receiver_id,message,read,created_at FROM messages
             WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)
             ORDER BY created_at ASC, id ASC",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn unread_by_sender(&self, receiver_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        let counts = sqlx::query_as(
            "SELECT sender_id, COUNT(*) FROM messages
             WHERE receiver_id=? AND read=0
             GROUP BY sender_id",
        )
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE messages SET read=1
             WHERE sender_id=? AND receiver_id=? AND read=0",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn create_defaults() {
        let store = store().await;
        let msg = store.create("u1", "u2", "hi").await.unwrap();

        assert_eq!(msg.sender_id, "u1");
        assert_eq!(msg.receiver_id, "u2");
        assert_eq!(msg.message, "hi");
        assert!(!msg.read);
        assert!(OffsetDateTime::parse(&msg.created_at, &Rfc3339).is_ok());
        assert!(Uuid::parse_str(&msg.id).is_ok());
    }

    #[tokio::test]
    async fn create_rejects_empty_body() {
        let store = store().await;
        assert!(matches!(
            store.create("u1", "u2", "").await,
            Err(StoreError::EmptyBody)
        ));
        assert!(store.conversation("u1", "u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn conversation_is_symmetric_and_ordered() {
        let store = store().await;
        store.create("u1", "u2", "first").await.unwrap();
        store.create("u2", "u1", "second").await.unwrap();
        store.create("u1", "u3", "other pair").await.unwrap();

        let forward = store.conversation("u1", "u2").await.unwrap();
        let backward = store.conversation("u2", "u1").await.unwrap();

        assert_eq!(forward.len(), 2);
        assert_eq!(forward[0].message, "first");
        assert_eq!(forward[1].message, "second");
        assert_eq!(
            forward.iter().map(|m| &m.id).collect::<Vec<_>>(),
            backward.iter().map(|m| &m.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn unread_counts_group_by_sender() {
        let store = store().await;
        store.create("u1", "me", "a").await.unwrap();
        store.create("u1", "me", "b").await.unwrap();
        store.create("u2", "me", "c").await.unwrap();
        store.create("me", "u1", "outgoing").await.unwrap();

        let mut counts = store.unread_by_sender("me").await.unwrap();
        counts.sort();
        assert_eq!(counts, vec![("u1".to_owned(), 2), ("u2".to_owned(), 1)]);
    }

    #[tokio::test]
    async fn mark_read_flips_one_direction_only() {
        let store = store().await;
        store.create("u1", "me", "a").await.unwrap();
        store.create("u1", "me", "b").await.unwrap();
        store.create("u2", "me", "c").await.unwrap();

        let flipped = store.mark_read("u1", "me").await.unwrap();
        assert_eq!(flipped, 2);

        let counts = store.unread_by_sender("me").await.unwrap();
        assert_eq!(counts, vec![("u2".to_owned(), 1)]);

        // already read, nothing left to flip
        assert_eq!(store.mark_read("u1", "me").await.unwrap(), 0);
    }
}
