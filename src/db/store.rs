use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};
use tokio::sync::{watch, Mutex};
use tokio_rusqlite::Connection;

use crate::error::Result;

use super::schema::SCHEMA;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

/// Full contents of one collection, in insertion order.
pub type Snapshot = Vec<Document>;

/// Live view of one collection. Dropping it unsubscribes.
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
    pending: Option<Snapshot>,
}

impl Subscription {
    pub fn new(rx: watch::Receiver<Snapshot>, initial: Snapshot) -> Self {
        Self {
            rx,
            pending: Some(initial),
        }
    }

    /// The newest snapshot, if one arrived since the last call.
    pub fn take_changed(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.pending.take() {
            return Some(initial);
        }
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// Waits for the next snapshot. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.pending.take() {
            return Some(initial);
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Reactive document/collection backend.
///
/// Collections are addressed by slash-separated paths. Every write to a path
/// pushes a fresh snapshot to that path's subscribers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn subscribe(&self, path: &str) -> Result<Subscription>;

    /// Inserts a document under a generated id and returns the id.
    async fn add(&self, path: &str, data: Map<String, Value>) -> Result<String>;

    async fn delete(&self, path: &str, id: &str) -> Result<()>;

    async fn get(&self, path: &str, id: &str) -> Result<Option<Document>>;

    /// Shallow-merges top-level `fields` into the document, creating it if absent.
    async fn set_merge(&self, path: &str, id: &str, fields: Map<String, Value>) -> Result<()>;

    async fn query_eq(&self, path: &str, field: &str, value: &Value) -> Result<Vec<Document>>;
}

pub struct SqliteStore {
    conn: Connection,
    watchers: Mutex<HashMap<String, watch::Sender<Snapshot>>>,
}

impl SqliteStore {
    /// Opens the store at `db_path`; `:memory:` gives a private in-memory store.
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory().await?
        } else {
            Connection::open(db_path).await?
        };

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            watchers: Mutex::new(HashMap::new()),
        })
    }

    async fn load_collection(&self, path: &str) -> Result<Snapshot> {
        let collection = path.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map(params![collection], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, data)| document_from_row(path, id, &data))
            .collect())
    }

    async fn notify(&self, path: &str) {
        let mut watchers = self.watchers.lock().await;
        let Some(sender) = watchers.get(path) else {
            return;
        };
        if sender.receiver_count() == 0 {
            watchers.remove(path);
            return;
        }
        match self.load_collection(path).await {
            Ok(snapshot) => {
                sender.send_replace(snapshot);
            }
            Err(e) => tracing::error!(path, error = %e, "Failed to refresh snapshot"),
        }
    }
}

fn document_from_row(path: &str, id: String, data: &str) -> Option<Document> {
    match serde_json::from_str::<Map<String, Value>>(data) {
        Ok(data) => Some(Document { id, data }),
        Err(e) => {
            tracing::warn!(path, id = %id, error = %e, "Skipping malformed document");
            None
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        let snapshot = self.load_collection(path).await?;
        let mut watchers = self.watchers.lock().await;
        let sender = watchers
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(Snapshot::new()).0);
        sender.send_replace(snapshot.clone());
        Ok(Subscription::new(sender.subscribe(), snapshot))
    }

    async fn add(&self, path: &str, data: Map<String, Value>) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(&data)?;
        let collection = path.to_string();
        let doc_id = id.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
                    params![collection, doc_id, body],
                )?;
                Ok(())
            })
            .await?;

        self.notify(path).await;
        Ok(id)
    }

    async fn delete(&self, path: &str, id: &str) -> Result<()> {
        let collection = path.to_string();
        let doc_id = id.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, doc_id],
                )?;
                Ok(())
            })
            .await?;

        self.notify(path).await;
        Ok(())
    }

    async fn get(&self, path: &str, id: &str) -> Result<Option<Document>> {
        let collection = path.to_string();
        let doc_id = id.to_string();

        let data = self
            .conn
            .call(move |conn| {
                let data = conn
                    .query_row(
                        "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection, doc_id],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(data)
            })
            .await?;

        Ok(data.and_then(|data| document_from_row(path, id.to_string(), &data)))
    }

    async fn set_merge(&self, path: &str, id: &str, fields: Map<String, Value>) -> Result<()> {
        let collection = path.to_string();
        let doc_id = id.to_string();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let existing = tx
                    .query_row(
                        "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                        params![collection, doc_id],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;

                let mut merged = existing
                    .and_then(|data| serde_json::from_str::<Map<String, Value>>(&data).ok())
                    .unwrap_or_default();
                merged.extend(fields);
                let body = serde_json::to_string(&merged)
                    .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

                tx.execute(
                    r#"INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)
                       ON CONFLICT(collection, id) DO UPDATE SET
                           data = excluded.data,
                           updated_at = datetime('now')"#,
                    params![collection, doc_id, body],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        self.notify(path).await;
        Ok(())
    }

    async fn query_eq(&self, path: &str, field: &str, value: &Value) -> Result<Vec<Document>> {
        Ok(self
            .load_collection(path)
            .await?
            .into_iter()
            .filter(|doc| doc.data.get(field) == Some(value))
            .collect())
    }
}
