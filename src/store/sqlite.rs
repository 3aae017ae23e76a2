//! SQLite-backed conversation collection.
//!
//! Each conversation is one row; its version history lives in a second table
//! keyed by `(conversation_id, version_number)`, so duplicate version numbers
//! are rejected by the database itself. Appends and deletes run in a
//! transaction on the connection thread.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::ids::ConversationId;
use super::types::{
    Conversation, ConversationSummary, ConversationUpdate, DocumentVersion, Message,
    NewConversation,
};
use super::{ConversationStore, StoreFuture};

/// Table holding one row per conversation.
const CONVERSATIONS_TABLE: &str = "conversations";
/// Table holding the append-only version history.
const VERSIONS_TABLE: &str = "document_versions";

/// `SQLite` implementation of the conversation store.
pub struct SqliteConversationStore {
    conn: Connection,
}

impl SqliteConversationStore {
    /// Open (or create) a database file and initialize the schema.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening conversation store at {}", path.display());
        let conn = Connection::open(path).await?;
        Self::new(conn).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::new(conn).await
    }

    /// Initialize the store on an existing connection and create tables if needed.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Connection) -> StoreResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {CONVERSATIONS_TABLE} (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    messages_json TEXT NOT NULL,
                    uploaded_by TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{CONVERSATIONS_TABLE}_updated
                    ON {CONVERSATIONS_TABLE} (updated_at DESC);
                CREATE TABLE IF NOT EXISTS {VERSIONS_TABLE} (
                    conversation_id TEXT NOT NULL,
                    version_number INTEGER NOT NULL,
                    content TEXT NOT NULL,
                    notes TEXT NOT NULL,
                    uploaded_by TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    PRIMARY KEY (conversation_id, version_number)
                );"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }
}

/// Raw conversation row before decoding.
struct ConversationRow {
    id: String,
    title: String,
    messages_json: String,
    uploaded_by: String,
    created_at: i64,
    updated_at: i64,
}

/// Raw version row before decoding.
struct VersionRow {
    version_number: u32,
    content: String,
    notes: String,
    uploaded_by: String,
    created_at: i64,
}

impl VersionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            version_number: row.get(0)?,
            content: row.get(1)?,
            notes: row.get(2)?,
            uploaded_by: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn decode(self) -> StoreResult<DocumentVersion> {
        Ok(DocumentVersion {
            version_number: self.version_number,
            content: self.content,
            notes: self.notes,
            uploaded_by: self.uploaded_by,
            timestamp: from_millis(self.created_at)?,
        })
    }
}

fn from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))
}

fn parse_id(raw: &str) -> StoreResult<ConversationId> {
    ConversationId::from_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("invalid conversation id {raw:?}: {e}")))
}

const VERSION_COLUMNS: &str = "version_number, content, notes, uploaded_by, created_at";

impl ConversationStore for SqliteConversationStore {
    fn list_all(&self) -> StoreFuture<'_, StoreResult<Vec<ConversationSummary>>> {
        Box::pin(async move {
            let rows = self
                .conn
                .call(|conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT c.id, c.title, c.uploaded_by, c.created_at, c.updated_at,
                                COUNT(v.version_number), COALESCE(MAX(v.version_number), 0)
                         FROM {CONVERSATIONS_TABLE} c
                         LEFT JOIN {VERSIONS_TABLE} v ON v.conversation_id = c.id
                         GROUP BY c.id
                         ORDER BY c.updated_at DESC"
                    ))?;
                    let rows = stmt
                        .query_map([], |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, i64>(3)?,
                                row.get::<_, i64>(4)?,
                                row.get::<_, u32>(5)?,
                                row.get::<_, u32>(6)?,
                            ))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter()
                .map(
                    |(id, title, uploaded_by, created_at, updated_at, count, latest)| {
                        Ok(ConversationSummary {
                            id: parse_id(&id)?,
                            title,
                            uploaded_by,
                            created_at: from_millis(created_at)?,
                            updated_at: from_millis(updated_at)?,
                            version_count: count,
                            latest_version: latest,
                        })
                    },
                )
                .collect()
        })
    }

    fn get_by_id(&self, id: ConversationId) -> StoreFuture<'_, StoreResult<Option<Conversation>>> {
        Box::pin(async move {
            let id_str = id.to_string();
            let found = self
                .conn
                .call(move |conn| {
                    let row = conn
                        .query_row(
                            &format!(
                                "SELECT id, title, messages_json, uploaded_by, created_at, updated_at
                                 FROM {CONVERSATIONS_TABLE}
                                 WHERE id = ?1"
                            ),
                            rusqlite::params![id_str],
                            |row| {
                                Ok(ConversationRow {
                                    id: row.get(0)?,
                                    title: row.get(1)?,
                                    messages_json: row.get(2)?,
                                    uploaded_by: row.get(3)?,
                                    created_at: row.get(4)?,
                                    updated_at: row.get(5)?,
                                })
                            },
                        )
                        .optional()?;

                    let Some(row) = row else {
                        return Ok(None);
                    };

                    let mut stmt = conn.prepare(&format!(
                        "SELECT {VERSION_COLUMNS}
                         FROM {VERSIONS_TABLE}
                         WHERE conversation_id = ?1
                         ORDER BY version_number ASC"
                    ))?;
                    let versions = stmt
                        .query_map(rusqlite::params![id_str], VersionRow::from_row)?
                        .collect::<Result<Vec<_>, _>>()?;

                    Ok(Some((row, versions)))
                })
                .await?;

            let Some((row, versions)) = found else {
                return Ok(None);
            };

            let messages: Vec<Message> = serde_json::from_str(&row.messages_json)?;
            let document_versions = versions
                .into_iter()
                .map(VersionRow::decode)
                .collect::<StoreResult<Vec<_>>>()?;

            Ok(Some(Conversation {
                id: parse_id(&row.id)?,
                title: row.title,
                messages,
                document_versions,
                uploaded_by: row.uploaded_by,
                created_at: from_millis(row.created_at)?,
                updated_at: from_millis(row.updated_at)?,
            }))
        })
    }

    fn create(&self, new: NewConversation) -> StoreFuture<'_, StoreResult<ConversationId>> {
        Box::pin(async move {
            let id = ConversationId::new();
            let id_str = id.to_string();
            let messages_json = serde_json::to_string(&new.messages)?;
            let now_ms = Utc::now().timestamp_millis();
            let content = new.initial_content.unwrap_or_default();

            self.conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute(
                        &format!(
                            "INSERT INTO {CONVERSATIONS_TABLE}
                                (id, title, messages_json, uploaded_by, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?5)"
                        ),
                        rusqlite::params![id_str, new.title, messages_json, new.uploaded_by, now_ms],
                    )?;
                    tx.execute(
                        &format!(
                            "INSERT INTO {VERSIONS_TABLE}
                                (conversation_id, version_number, content, notes, uploaded_by, created_at)
                             VALUES (?1, 1, ?2, ?3, ?4, ?5)"
                        ),
                        rusqlite::params![id_str, content, new.notes, new.uploaded_by, now_ms],
                    )?;
                    tx.commit()?;
                    Ok(())
                })
                .await?;

            info!("Created conversation {id}");
            Ok(id)
        })
    }

    fn update(
        &self,
        id: ConversationId,
        update: ConversationUpdate,
    ) -> StoreFuture<'_, StoreResult<u32>> {
        Box::pin(async move {
            let id_str = id.to_string();
            let messages_json = serde_json::to_string(&update.messages)?;
            let now_ms = Utc::now().timestamp_millis();

            let appended = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    let exists: i64 = tx.query_row(
                        &format!("SELECT COUNT(*) FROM {CONVERSATIONS_TABLE} WHERE id = ?1"),
                        rusqlite::params![id_str],
                        |row| row.get(0),
                    )?;
                    if exists == 0 {
                        return Ok(None);
                    }

                    let latest: Option<(u32, String)> = tx
                        .query_row(
                            &format!(
                                "SELECT version_number, content
                                 FROM {VERSIONS_TABLE}
                                 WHERE conversation_id = ?1
                                 ORDER BY version_number DESC
                                 LIMIT 1"
                            ),
                            rusqlite::params![id_str],
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )
                        .optional()?;

                    let next = latest.as_ref().map_or(1, |(n, _)| n + 1);
                    let content = update
                        .new_content
                        .or_else(|| latest.map(|(_, content)| content))
                        .unwrap_or_default();

                    tx.execute(
                        &format!(
                            "UPDATE {CONVERSATIONS_TABLE}
                             SET title = ?1, messages_json = ?2, uploaded_by = ?3, updated_at = ?4
                             WHERE id = ?5"
                        ),
                        rusqlite::params![
                            update.title,
                            messages_json,
                            update.uploaded_by,
                            now_ms,
                            id_str
                        ],
                    )?;
                    tx.execute(
                        &format!(
                            "INSERT INTO {VERSIONS_TABLE}
                                (conversation_id, version_number, content, notes, uploaded_by, created_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                        ),
                        rusqlite::params![
                            id_str,
                            next,
                            content,
                            update.notes,
                            update.uploaded_by,
                            now_ms
                        ],
                    )?;
                    tx.commit()?;
                    Ok(Some(next))
                })
                .await?;

            let version = appended.ok_or(StoreError::NotFound(id))?;
            debug!("Appended version {version} to conversation {id}");
            Ok(version)
        })
    }

    fn delete(&self, id: ConversationId) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let id_str = id.to_string();
            let removed = self
                .conn
                .call(move |conn| {
                    let tx = conn.transaction()?;
                    tx.execute(
                        &format!("DELETE FROM {VERSIONS_TABLE} WHERE conversation_id = ?1"),
                        rusqlite::params![id_str],
                    )?;
                    let removed = tx.execute(
                        &format!("DELETE FROM {CONVERSATIONS_TABLE} WHERE id = ?1"),
                        rusqlite::params![id_str],
                    )?;
                    tx.commit()?;
                    Ok(removed)
                })
                .await?;

            if removed == 0 {
                return Err(StoreError::NotFound(id));
            }
            info!("Deleted conversation {id}");
            Ok(())
        })
    }

    fn version_content(
        &self,
        id: ConversationId,
        version_number: u32,
    ) -> StoreFuture<'_, StoreResult<Option<String>>> {
        Box::pin(async move {
            let id_str = id.to_string();
            let content = self
                .conn
                .call(move |conn| {
                    let content = conn
                        .query_row(
                            &format!(
                                "SELECT content FROM {VERSIONS_TABLE}
                                 WHERE conversation_id = ?1 AND version_number = ?2"
                            ),
                            rusqlite::params![id_str, version_number],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(content)
                })
                .await?;
            Ok(content)
        })
    }

    fn latest_version(
        &self,
        id: ConversationId,
    ) -> StoreFuture<'_, StoreResult<Option<DocumentVersion>>> {
        Box::pin(async move {
            let id_str = id.to_string();
            let row = self
                .conn
                .call(move |conn| {
                    let row = conn
                        .query_row(
                            &format!(
                                "SELECT {VERSION_COLUMNS}
                                 FROM {VERSIONS_TABLE}
                                 WHERE conversation_id = ?1
                                 ORDER BY version_number DESC
                                 LIMIT 1"
                            ),
                            rusqlite::params![id_str],
                            VersionRow::from_row,
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;
            row.map(VersionRow::decode).transpose()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::Sender;

    fn new_conversation(content: Option<&str>) -> NewConversation {
        NewConversation {
            title: "Residential lease".to_string(),
            messages: vec![
                Message::new(Sender::User, "I need a lease"),
                Message::new(Sender::Model, "Who is the landlord?"),
            ],
            initial_content: content.map(str::to_string),
            uploaded_by: "anonymous".to_string(),
            notes: "Initial Version".to_string(),
        }
    }

    fn update_with(content: Option<&str>) -> ConversationUpdate {
        ConversationUpdate {
            title: "Residential lease (revised)".to_string(),
            messages: vec![Message::new(Sender::User, "Change the rent")],
            new_content: content.map(str::to_string),
            uploaded_by: "alice".to_string(),
            notes: "Version update via AI editor".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_has_initial_version() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let id = store.create(new_conversation(Some("# Lease"))).await.unwrap();

        let conversation = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(conversation.id, id);
        assert_eq!(conversation.title, "Residential lease");
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.document_versions.len(), 1);

        let first = &conversation.document_versions[0];
        assert_eq!(first.version_number, 1);
        assert_eq!(first.content, "# Lease");
        assert_eq!(first.notes, "Initial Version");
    }

    #[tokio::test]
    async fn test_create_without_content_still_has_a_version() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let id = store.create(new_conversation(None)).await.unwrap();

        let content = store.version_content(id, 1).await.unwrap();
        assert_eq!(content.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_update_appends_next_version_and_keeps_history() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let id = store.create(new_conversation(Some("v1"))).await.unwrap();

        assert_eq!(store.update(id, update_with(Some("v2"))).await.unwrap(), 2);
        assert_eq!(store.update(id, update_with(Some("v3"))).await.unwrap(), 3);

        let conversation = store.get_by_id(id).await.unwrap().unwrap();
        let numbers: Vec<u32> = conversation
            .document_versions
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(store.version_content(id, 1).await.unwrap().as_deref(), Some("v1"));
        assert_eq!(store.version_content(id, 2).await.unwrap().as_deref(), Some("v2"));
        assert_eq!(conversation.title, "Residential lease (revised)");
        assert_eq!(conversation.uploaded_by, "alice");
        assert_eq!(conversation.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_update_without_content_carries_latest_forward() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let id = store.create(new_conversation(Some("draft"))).await.unwrap();

        let version = store.update(id, update_with(None)).await.unwrap();
        assert_eq!(version, 2);

        let latest = store.latest_version(id).await.unwrap().unwrap();
        assert_eq!(latest.version_number, 2);
        assert_eq!(latest.content, "draft");
        assert_eq!(latest.uploaded_by, "alice");
    }

    #[tokio::test]
    async fn test_update_unknown_conversation_is_not_found() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let err = store
            .update(ConversationId::new(), update_with(Some("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_version_is_none() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let id = store.create(new_conversation(Some("v1"))).await.unwrap();
        assert!(store.version_content(id, 7).await.unwrap().is_none());
        assert!(store.version_content(ConversationId::new(), 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_conversation_and_versions() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let id = store.create(new_conversation(Some("v1"))).await.unwrap();

        store.delete(id).await.unwrap();

        assert!(store.get_by_id(id).await.unwrap().is_none());
        assert!(store.version_content(id, 1).await.unwrap().is_none());
        assert!(matches!(
            store.delete(id).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_all_summarizes_newest_first() {
        let store = SqliteConversationStore::open_in_memory().await.unwrap();
        let older = store.create(new_conversation(Some("a"))).await.unwrap();
        let newer = store.create(new_conversation(Some("b"))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.update(older, update_with(Some("a2"))).await.unwrap();

        let summaries = store.list_all().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, older);
        assert_eq!(summaries[0].version_count, 2);
        assert_eq!(summaries[0].latest_version, 2);
        assert_eq!(summaries[1].id, newer);
        assert_eq!(summaries[1].version_count, 1);
    }
}
