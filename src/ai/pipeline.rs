use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{InsightBoard, NewComment};
use crate::services::StoreBridge;

use super::client::TextCompletion;
use super::prompts::{insight_prompt, reply_prompt};

/// Completion of a background insight or reply job, applied on the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightEvent {
    Insight { news_id: String, text: String },
    ReplyDone { news_id: String },
    ReplyFailed { news_id: String, message: String },
}

pub struct InsightPipeline {
    completer: Arc<dyn TextCompletion>,
    bridge: StoreBridge,
    board: InsightBoard,
    event_tx: mpsc::Sender<InsightEvent>,
    event_rx: mpsc::Receiver<InsightEvent>,
}

impl InsightPipeline {
    pub fn new(completer: Arc<dyn TextCompletion>, bridge: StoreBridge) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            completer,
            bridge,
            board: InsightBoard::default(),
            event_tx,
            event_rx,
        }
    }

    pub fn board(&self) -> &InsightBoard {
        &self.board
    }

    /// Starts generating an insight for `news_id`.
    ///
    /// Returns false without doing anything if one is already loading.
    pub fn request_insight(&mut self, news_id: &str, title: &str) -> bool {
        if !self.board.begin_insight(news_id) {
            tracing::debug!(news_id, "Insight already loading, ignoring request");
            return false;
        }

        let completer = Arc::clone(&self.completer);
        let tx = self.event_tx.clone();
        let news_id = news_id.to_string();
        let prompt = insight_prompt(title);

        tokio::spawn(async move {
            let text = match completer.complete(&prompt).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(news_id = %news_id, error = %e, "Insight generation failed");
                    format!("AI insight generation failed: {e}")
                }
            };
            // Receiver is gone after teardown; the result is simply dropped.
            let _ = tx.send(InsightEvent::Insight { news_id, text }).await;
        });

        true
    }

    /// Posts the user's comment, then asks the AI for a reply to it.
    ///
    /// Refused for blank comments and while a reply for the same article is
    /// still being generated.
    pub fn request_ai_reply(&mut self, news_id: &str, title: &str, comment: &str) -> bool {
        let comment = comment.trim();
        if comment.is_empty() || !self.board.begin_reply(news_id) {
            return false;
        }

        let completer = Arc::clone(&self.completer);
        let bridge = self.bridge.clone();
        let tx = self.event_tx.clone();
        let news_id = news_id.to_string();
        let title = title.to_string();
        let comment = comment.to_string();

        tokio::spawn(async move {
            let event = match reply_flow(completer.as_ref(), &bridge, &news_id, &title, &comment)
                .await
            {
                Ok(()) => InsightEvent::ReplyDone { news_id },
                Err(e) => {
                    tracing::error!(news_id = %news_id, error = %e, "AI reply failed");
                    InsightEvent::ReplyFailed {
                        news_id,
                        message: format!("Comment processing failed: {e}"),
                    }
                }
            };
            let _ = tx.send(event).await;
        });

        true
    }

    /// Applies one event to the board. Returns a banner message on failure.
    pub fn apply(&mut self, event: InsightEvent) -> Option<String> {
        match event {
            InsightEvent::Insight { news_id, text } => {
                self.board.finish_insight(&news_id, text);
                None
            }
            InsightEvent::ReplyDone { news_id } => {
                self.board.finish_reply(&news_id);
                None
            }
            InsightEvent::ReplyFailed { news_id, message } => {
                self.board.finish_reply(&news_id);
                Some(message)
            }
        }
    }

    /// Applies every finished job without blocking. Returns the latest error.
    pub fn poll(&mut self) -> Option<String> {
        let mut latest_error = None;
        while let Ok(event) = self.event_rx.try_recv() {
            if let Some(message) = self.apply(event) {
                latest_error = Some(message);
            }
        }
        latest_error
    }

    /// Waits for the next finished job without applying it.
    pub async fn next_event(&mut self) -> Option<InsightEvent> {
        self.event_rx.recv().await
    }
}

async fn reply_flow(
    completer: &dyn TextCompletion,
    bridge: &StoreBridge,
    news_id: &str,
    title: &str,
    comment: &str,
) -> Result<()> {
    // The user's comment is kept even if the AI side fails afterwards.
    bridge
        .add_comment(&NewComment::user(news_id, comment, &bridge.scope().user_id))
        .await?;

    let reply = completer.complete(&reply_prompt(title, comment)).await?;
    bridge.add_comment(&NewComment::ai(news_id, &reply)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::CompletionError;
    use crate::db::SqliteStore;
    use crate::models::{CommentRole, InsightStatus};
    use crate::services::{Mirrors, Scope};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results and records the prompts it received.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<std::result::Result<String, CompletionError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<std::result::Result<String, CompletionError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl TextCompletion for Scripted {
        async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CompletionError::EmptyResponse))
        }
    }

    async fn pipeline(completer: Arc<Scripted>) -> (InsightPipeline, StoreBridge) {
        let store = SqliteStore::open(":memory:").await.unwrap();
        let bridge = StoreBridge::new(Arc::new(store), Scope::new("app", "user-1"));
        (InsightPipeline::new(completer, bridge.clone()), bridge)
    }

    async fn settle(pipeline: &mut InsightPipeline) -> Option<String> {
        let event = pipeline.next_event().await.unwrap();
        pipeline.apply(event)
    }

    #[tokio::test]
    async fn insight_moves_through_loading_to_ready() {
        let completer = Scripted::new(vec![Ok("three lines".to_string())]);
        let (mut pipeline, _) = pipeline(completer.clone()).await;

        assert!(pipeline.request_insight("n1", "Title"));
        assert_eq!(pipeline.board().status("n1"), InsightStatus::Loading);

        assert!(settle(&mut pipeline).await.is_none());
        let entry = pipeline.board().entry("n1").unwrap();
        assert!(!entry.loading);
        assert_eq!(entry.insight.as_deref(), Some("three lines"));
        assert!(completer.prompts.lock().unwrap()[0].contains("\"Title\""));
    }

    #[tokio::test]
    async fn failed_insight_is_stored_as_text() {
        let completer = Scripted::new(vec![Err(CompletionError::Status {
            status: 400,
            body: "bad".to_string(),
        })]);
        let (mut pipeline, _) = pipeline(completer).await;

        pipeline.request_insight("n1", "Title");
        settle(&mut pipeline).await;

        let entry = pipeline.board().entry("n1").unwrap();
        assert!(!entry.loading);
        let text = entry.insight.as_deref().unwrap();
        assert!(text.starts_with("AI insight generation failed"));
        assert!(text.contains("400"));
    }

    #[tokio::test]
    async fn duplicate_request_while_loading_is_ignored() {
        let completer = Scripted::new(vec![Ok("one".to_string()), Ok("two".to_string())]);
        let (mut pipeline, _) = pipeline(completer.clone()).await;

        assert!(pipeline.request_insight("n1", "Title"));
        assert!(!pipeline.request_insight("n1", "Title"));
        settle(&mut pipeline).await;

        assert_eq!(completer.prompts.lock().unwrap().len(), 1);
        assert_eq!(
            pipeline.board().entry("n1").unwrap().insight.as_deref(),
            Some("one")
        );
    }

    #[tokio::test]
    async fn reply_appends_user_then_ai_comment() {
        let completer = Scripted::new(vec![Ok("[AI의 생각] ...".to_string())]);
        let (mut pipeline, bridge) = pipeline(completer.clone()).await;

        assert!(pipeline.request_ai_reply("n1", "Title", "  nice  "));
        assert!(pipeline.board().is_generating("n1"));
        assert!(!pipeline.request_ai_reply("n1", "Title", "again"));

        assert!(settle(&mut pipeline).await.is_none());
        assert!(!pipeline.board().is_generating("n1"));

        let mut subs = bridge.subscribe().await.unwrap();
        let mut mirrors = Mirrors::default();
        subs.poll(&mut mirrors);
        let thread = mirrors.comments_for("n1");
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].text, "nice");
        assert_eq!(thread[0].user_id, "user-1");
        assert_eq!(thread[1].role, CommentRole::Ai);
        assert!(completer.prompts.lock().unwrap()[0].contains("인간 댓글: \"nice\""));
    }

    #[tokio::test]
    async fn blank_comment_is_refused() {
        let (mut pipeline, _) = pipeline(Scripted::new(vec![])).await;
        assert!(!pipeline.request_ai_reply("n1", "Title", "   "));
        assert!(!pipeline.board().is_generating("n1"));
    }

    #[tokio::test]
    async fn poll_drains_and_reports_latest_error() {
        let (mut pipeline, _) = pipeline(Scripted::new(vec![])).await;
        pipeline.request_ai_reply("n1", "Title", "hi");

        let event = pipeline.next_event().await.unwrap();
        assert!(matches!(event, InsightEvent::ReplyFailed { .. }));
        pipeline.event_tx.send(event).await.unwrap();

        let message = pipeline.poll().unwrap();
        assert!(message.starts_with("Comment processing failed"));
        assert!(!pipeline.board().is_generating("n1"));
        assert!(pipeline.poll().is_none());
    }
}
