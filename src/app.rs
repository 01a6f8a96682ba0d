use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ai::{GeminiClient, InsightEvent, InsightPipeline, TextCompletion};
use crate::config::Config;
use crate::db::{DocumentStore, SqliteStore};
use crate::error::Result;
use crate::feed::{FeedLoad, SheetsFeedLoader};
use crate::models::{InsightBoard, InsightStatus, KeywordCatalog, NewsItem, Vote};
use crate::services::{
    provider_from_config, resolve_identity, IdentityProvider, Mirrors, Scope, StoreBridge,
    Subscriptions,
};
use crate::tui::AppAction;
use crate::view::{self, group_by_date, DateGroup, Row, Tab, Windows};

/// What the cursor is on in a news tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    News(String),
    LoadMore(String),
}

pub struct App {
    // Data
    pub news: Vec<NewsItem>,
    pub latest_date: Option<String>,
    pub mirrors: Mirrors,
    pub keywords: KeywordCatalog,

    // UI State
    pub active_tab: Tab,
    pub windows: Windows,
    pub selected_index: usize,
    pub keyword_category: usize,
    pub keyword_index: usize,
    pub show_help: bool,
    pub comment_input_active: bool,
    pub comment_input: String,
    /// Latest error for the banner; replaced, never stacked.
    pub error: Option<String>,

    // Async state
    pub is_loading: bool,
    feed_rx: mpsc::Receiver<FeedLoad>,
    feed_tx: mpsc::Sender<FeedLoad>,

    // Services
    loader: Arc<SheetsFeedLoader>,
    bridge: StoreBridge,
    subscriptions: Option<Subscriptions>,
    pipeline: InsightPipeline,
    recommended_marker: String,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn DocumentStore> =
            Arc::new(SqliteStore::open(&config.store.db_path).await?);
        let identity = provider_from_config(&config.identity);
        let completer: Arc<dyn TextCompletion> = Arc::new(GeminiClient::new(&config.completion)?);
        let loader = SheetsFeedLoader::new(config.feed.clone())?;

        Self::with_services(
            loader,
            store,
            identity.as_ref(),
            completer,
            &config.store.app_id,
            &config.feed.recommended_marker,
        )
        .await
    }

    /// Builds the app around already-constructed collaborators.
    pub async fn with_services(
        loader: SheetsFeedLoader,
        store: Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
        completer: Arc<dyn TextCompletion>,
        app_id: &str,
        recommended_marker: &str,
    ) -> Result<Self> {
        let (user_id, auth_notice) = resolve_identity(identity).await;
        let bridge = StoreBridge::new(store, Scope::new(app_id, &user_id));

        let subscriptions = match bridge.subscribe().await {
            Ok(subscriptions) => Some(subscriptions),
            Err(e) => {
                tracing::error!(error = %e, "Failed to subscribe to store");
                None
            }
        };

        let pipeline = InsightPipeline::new(completer, bridge.clone());
        let (feed_tx, feed_rx) = mpsc::channel(4);

        let mut app = Self {
            news: Vec::new(),
            latest_date: None,
            mirrors: Mirrors::default(),
            keywords: KeywordCatalog::default(),
            active_tab: Tab::default(),
            windows: Windows::default(),
            selected_index: 0,
            keyword_category: 0,
            keyword_index: 0,
            show_help: false,
            comment_input_active: false,
            comment_input: String::new(),
            error: None,
            is_loading: false,
            feed_rx,
            feed_tx,
            loader: Arc::new(loader),
            bridge,
            subscriptions,
            pipeline,
            recommended_marker: recommended_marker.to_string(),
        };

        app.poll_store();
        app.reload_feed();
        // Set after the reload, which clears the banner.
        if auth_notice.is_some() {
            app.error = auth_notice;
        }
        Ok(app)
    }

    pub fn user_id(&self) -> &str {
        &self.bridge.scope().user_id
    }

    pub fn insights(&self) -> &InsightBoard {
        self.pipeline.board()
    }

    pub fn filtered_news(&self) -> Vec<&NewsItem> {
        view::filter(
            self.active_tab,
            &self.news,
            &self.mirrors.bookmarks,
            &self.recommended_marker,
        )
    }

    pub fn date_groups(&self) -> Vec<DateGroup<'_>> {
        group_by_date(self.filtered_news())
    }

    pub fn selection(&self) -> Option<Selection> {
        let groups = self.date_groups();
        let rows = view::rows(&groups, &self.windows);
        let selection = rows
            .iter()
            .filter(|row| row.is_selectable())
            .nth(self.selected_index)
            .and_then(|row| match row {
                Row::News(news) => Some(Selection::News(news.id.clone())),
                Row::LoadMore { date, .. } => Some(Selection::LoadMore(date.to_string())),
                Row::Date { .. } => None,
            });
        selection
    }

    pub fn selected_news(&self) -> Option<&NewsItem> {
        match self.selection()? {
            Selection::News(id) => self.news.iter().find(|n| n.id == id),
            Selection::LoadMore(_) => None,
        }
    }

    fn selectable_count(&self) -> usize {
        let groups = self.date_groups();
        let count = view::rows(&groups, &self.windows)
            .iter()
            .filter(|row| row.is_selectable())
            .count();
        count
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.active_tab == Tab::Management {
                    self.keyword_index = self.keyword_index.saturating_sub(1);
                } else {
                    self.selected_index = self.selected_index.saturating_sub(1);
                }
            }

            AppAction::MoveDown => {
                if self.active_tab == Tab::Management {
                    let len = self
                        .keywords
                        .category(self.keyword_category)
                        .map_or(0, |c| c.keywords.len());
                    if self.keyword_index + 1 < len {
                        self.keyword_index += 1;
                    }
                } else if self.selected_index + 1 < self.selectable_count() {
                    self.selected_index += 1;
                }
            }

            AppAction::Select => match self.selection() {
                Some(Selection::LoadMore(date)) => self.windows.load_more(&date),
                Some(Selection::News(_)) => self.request_insight(),
                None => {}
            },

            AppAction::SwitchTab(tab) => self.set_tab(tab),
            AppAction::NextTab => self.set_tab(self.active_tab.cycle()),

            AppAction::RefreshFeed => {
                if self.active_tab.needs_feed() {
                    self.reload_feed();
                }
            }

            AppAction::ToggleBookmark => self.toggle_bookmark().await,
            AppAction::RequestInsight => self.request_insight(),
            AppAction::Vote(vote) => self.vote(vote).await,

            AppAction::OpenInBrowser => {
                if let Some(news) = self.selected_news() {
                    if let Err(e) = open::that(&news.url) {
                        tracing::warn!(url = %news.url, error = %e, "Failed to open browser");
                    }
                }
            }

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }

            AppAction::PrevCategory => {
                if self.active_tab == Tab::Management && self.keyword_category > 0 {
                    self.keyword_category -= 1;
                    self.keyword_index = 0;
                }
            }

            AppAction::NextCategory => {
                if self.active_tab == Tab::Management
                    && self.keyword_category + 1 < self.keywords.categories().len()
                {
                    self.keyword_category += 1;
                    self.keyword_index = 0;
                }
            }

            AppAction::ToggleKeyword => self.toggle_keyword(),

            AppAction::CommentInputStart => {
                let Some(news_id) = self.insight_ready_selection() else {
                    return Ok(false);
                };
                if !self.pipeline.board().is_generating(&news_id) {
                    self.comment_input_active = true;
                    self.comment_input.clear();
                }
            }

            AppAction::CommentInputChar(c) => {
                self.comment_input.push(c);
            }

            AppAction::CommentInputBackspace => {
                self.comment_input.pop();
            }

            AppAction::CommentInputConfirm => {
                self.submit_comment();
                self.comment_input_active = false;
                self.comment_input.clear();
            }

            AppAction::CommentInputCancel => {
                self.comment_input_active = false;
                self.comment_input.clear();
            }
        }

        Ok(false)
    }

    fn set_tab(&mut self, tab: Tab) {
        if tab == self.active_tab {
            return;
        }
        self.active_tab = tab;
        self.selected_index = 0;
        if tab.needs_feed() {
            self.reload_feed();
        }
    }

    /// Starts a background feed refresh. Clears the banner.
    pub fn reload_feed(&mut self) {
        self.is_loading = true;
        self.error = None;

        let loader = Arc::clone(&self.loader);
        let tx = self.feed_tx.clone();
        tokio::spawn(async move {
            let load = loader.load_or_fallback().await;
            let _ = tx.send(load).await;
        });
    }

    /// Applies a finished feed refresh, if any. Returns true when one was applied.
    pub fn poll_feed_result(&mut self) -> bool {
        let Ok(load) = self.feed_rx.try_recv() else {
            return false;
        };
        self.apply_feed(load);
        true
    }

    /// Waits for the in-flight feed refresh and applies it.
    pub async fn wait_for_feed(&mut self) {
        if let Some(load) = self.feed_rx.recv().await {
            self.apply_feed(load);
        }
    }

    fn apply_feed(&mut self, load: FeedLoad) {
        tracing::debug!(items = load.items.len(), "Feed loaded");
        self.news = load.items;
        self.latest_date = load.latest_date;
        if let Some(notice) = load.notice {
            self.error = Some(notice);
        }
        self.keywords.refresh_counts(&self.news);
        self.is_loading = false;
        self.clamp_selection();
    }

    pub fn poll_store(&mut self) {
        let Some(subscriptions) = self.subscriptions.as_mut() else {
            return;
        };
        if subscriptions.poll(&mut self.mirrors) {
            self.clamp_selection();
        }
    }

    pub fn poll_insights(&mut self) {
        if let Some(message) = self.pipeline.poll() {
            self.error = Some(message);
        }
    }

    /// Waits for one background insight/reply job and applies it.
    pub async fn wait_for_insight(&mut self) -> Option<InsightEvent> {
        let event = self.pipeline.next_event().await?;
        if let Some(message) = self.pipeline.apply(event.clone()) {
            self.error = Some(message);
        }
        Some(event)
    }

    fn clamp_selection(&mut self) {
        let count = self.selectable_count();
        if self.selected_index >= count {
            self.selected_index = count.saturating_sub(1);
        }
    }

    async fn toggle_bookmark(&mut self) {
        let Some(news_id) = self.selected_news().map(|n| n.id.clone()) else {
            return;
        };
        let bookmarked = self.mirrors.is_bookmarked(&news_id);
        if let Err(e) = self.bridge.toggle_bookmark(&news_id, bookmarked).await {
            tracing::error!(news_id = %news_id, error = %e, "Bookmark toggle failed");
        }
    }

    /// Id of the selected article, if its insight has been generated.
    ///
    /// Votes and comments attach to the insight, so they need one first.
    fn insight_ready_selection(&self) -> Option<String> {
        let news = self.selected_news()?;
        (self.pipeline.board().status(&news.id) == InsightStatus::Ready).then(|| news.id.clone())
    }

    async fn vote(&mut self, vote: Vote) {
        let Some(news_id) = self.insight_ready_selection() else {
            return;
        };
        if let Err(e) = self.bridge.record_vote(&news_id, vote).await {
            tracing::error!(news_id = %news_id, error = %e, "Insight vote update failed");
        }
    }

    /// Generates the selected article's insight once. An existing one is kept.
    fn request_insight(&mut self) {
        let Some((id, title)) = self
            .selected_news()
            .map(|n| (n.id.clone(), n.title.clone()))
        else {
            return;
        };
        if self.pipeline.board().status(&id) != InsightStatus::NotRequested {
            return;
        }
        self.pipeline.request_insight(&id, &title);
    }

    fn submit_comment(&mut self) {
        let Some((id, title)) = self
            .selected_news()
            .map(|n| (n.id.clone(), n.title.clone()))
        else {
            return;
        };
        let comment = self.comment_input.clone();
        self.pipeline.request_ai_reply(&id, &title, &comment);
    }

    fn toggle_keyword(&mut self) {
        if self.active_tab != Tab::Management {
            return;
        }
        let Some((category, keyword)) = self.keywords.category(self.keyword_category).and_then(|c| {
            c.keywords
                .get(self.keyword_index)
                .map(|k| (c.name.clone(), k.name.clone()))
        }) else {
            return;
        };
        self.keywords.toggle(&category, &keyword);
    }
}
