use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::{Document, DocumentStore, Subscription};
use crate::error::{AppError, Result};
use crate::models::{Bookmark, InsightComment, InsightMetric, NewComment, Vote};

/// Identity-scoped collection paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub app_id: String,
    pub user_id: String,
}

impl Scope {
    pub fn new(app_id: &str, user_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn bookmarks_path(&self) -> String {
        format!("artifacts/{}/users/{}/bookmarks", self.app_id, self.user_id)
    }

    pub fn metrics_path(&self) -> String {
        format!("artifacts/{}/public/data/aiInsightMetrics", self.app_id)
    }

    pub fn comments_path(&self) -> String {
        format!("artifacts/{}/public/data/aiInsightComments", self.app_id)
    }
}

/// Local read caches of the three shared collections.
///
/// Each one is replaced wholesale whenever its subscription delivers a snapshot.
#[derive(Debug, Default)]
pub struct Mirrors {
    pub bookmarks: HashSet<String>,
    pub metrics: HashMap<String, InsightMetric>,
    pub comments: Vec<InsightComment>,
}

impl Mirrors {
    pub fn is_bookmarked(&self, news_id: &str) -> bool {
        self.bookmarks.contains(news_id)
    }

    pub fn metric(&self, news_id: &str) -> InsightMetric {
        self.metrics.get(news_id).copied().unwrap_or_default()
    }

    /// Thread for one article, oldest first.
    pub fn comments_for(&self, news_id: &str) -> Vec<&InsightComment> {
        let mut thread: Vec<_> = self
            .comments
            .iter()
            .filter(|c| c.news_id == news_id)
            .collect();
        thread.sort_by_key(|c| c.timestamp);
        thread
    }

    pub fn apply_bookmarks(&mut self, snapshot: &[Document]) {
        self.bookmarks = snapshot
            .iter()
            .filter_map(|doc| doc.data.get("newsId").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
    }

    pub fn apply_metrics(&mut self, snapshot: &[Document]) {
        self.metrics = snapshot
            .iter()
            .filter_map(|doc| {
                decode::<InsightMetric>(doc).map(|metric| (doc.id.clone(), metric))
            })
            .collect();
    }

    pub fn apply_comments(&mut self, snapshot: &[Document]) {
        self.comments = snapshot
            .iter()
            .filter_map(|doc| {
                decode::<NewComment>(doc).map(|c| InsightComment::from_parts(doc.id.clone(), c))
            })
            .collect();
    }
}

fn decode<T: serde::de::DeserializeOwned>(doc: &Document) -> Option<T> {
    match serde_json::from_value(Value::Object(doc.data.clone())) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(id = %doc.id, error = %e, "Skipping undecodable document");
            None
        }
    }
}

fn to_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow::anyhow!("Expected a JSON object, got {other}").into()),
    }
}

/// Live subscriptions held for the current identity. Dropping unsubscribes.
pub struct Subscriptions {
    bookmarks: Subscription,
    metrics: Subscription,
    comments: Subscription,
}

impl Subscriptions {
    /// Applies any pending snapshots. Returns true if a mirror changed.
    pub fn poll(&mut self, mirrors: &mut Mirrors) -> bool {
        let mut changed = false;
        if let Some(snapshot) = self.bookmarks.take_changed() {
            mirrors.apply_bookmarks(&snapshot);
            changed = true;
        }
        if let Some(snapshot) = self.metrics.take_changed() {
            mirrors.apply_metrics(&snapshot);
            changed = true;
        }
        if let Some(snapshot) = self.comments.take_changed() {
            mirrors.apply_comments(&snapshot);
            changed = true;
        }
        changed
    }
}

/// Reads and writes bookmarks, insight votes and comments for one identity.
#[derive(Clone)]
pub struct StoreBridge {
    store: Arc<dyn DocumentStore>,
    scope: Scope,
}

impl StoreBridge {
    pub fn new(store: Arc<dyn DocumentStore>, scope: Scope) -> Self {
        Self { store, scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub async fn subscribe(&self) -> Result<Subscriptions> {
        let (bookmarks_path, metrics_path, comments_path) = (
            self.scope.bookmarks_path(),
            self.scope.metrics_path(),
            self.scope.comments_path(),
        );
        let (bookmarks, metrics, comments) = futures::try_join!(
            self.store.subscribe(&bookmarks_path),
            self.store.subscribe(&metrics_path),
            self.store.subscribe(&comments_path),
        )?;
        Ok(Subscriptions {
            bookmarks,
            metrics,
            comments,
        })
    }

    /// Removes every bookmark record for `news_id` if bookmarked, else adds one.
    ///
    /// The local mirror is left alone; it catches up from the subscription.
    pub async fn toggle_bookmark(&self, news_id: &str, bookmarked: bool) -> Result<()> {
        let path = self.scope.bookmarks_path();
        if bookmarked {
            let matches = self
                .store
                .query_eq(&path, "newsId", &Value::from(news_id))
                .await?;
            for doc in matches {
                self.store.delete(&path, &doc.id).await?;
            }
        } else {
            self.store
                .add(&path, to_fields(&Bookmark::new(news_id))?)
                .await?;
        }
        Ok(())
    }

    /// Read-modify-write of the shared tally. Not transactional: concurrent
    /// voters can overwrite each other's increment.
    pub async fn record_vote(&self, news_id: &str, vote: Vote) -> Result<InsightMetric> {
        let path = self.scope.metrics_path();
        let current = match self.store.get(&path, news_id).await? {
            None => InsightMetric::default(),
            // Never overwrite a tally that can't be read back.
            Some(doc) => decode::<InsightMetric>(&doc).ok_or_else(|| {
                AppError::Store(format!("unreadable insight metric for {news_id}"))
            })?,
        };
        let updated = current.with_vote(vote);

        let mut fields = to_fields(&updated)?;
        fields.insert("newsId".to_string(), Value::from(news_id));
        self.store.set_merge(&path, news_id, fields).await?;
        Ok(updated)
    }

    pub async fn add_comment(&self, comment: &NewComment) -> Result<String> {
        self.store
            .add(&self.scope.comments_path(), to_fields(comment)?)
            .await
    }
}
