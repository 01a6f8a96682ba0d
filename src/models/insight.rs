use std::collections::HashMap;

/// Session-local AI state for one article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightEntry {
    pub loading: bool,
    pub insight: Option<String>,
    pub generating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsightStatus {
    #[default]
    NotRequested,
    Loading,
    Ready,
}

impl InsightEntry {
    pub fn status(&self) -> InsightStatus {
        if self.loading {
            InsightStatus::Loading
        } else if self.insight.is_some() {
            InsightStatus::Ready
        } else {
            InsightStatus::NotRequested
        }
    }
}

/// All per-article AI state, keyed by news id.
#[derive(Debug, Default)]
pub struct InsightBoard {
    entries: HashMap<String, InsightEntry>,
}

impl InsightBoard {
    pub fn entry(&self, news_id: &str) -> Option<&InsightEntry> {
        self.entries.get(news_id)
    }

    pub fn status(&self, news_id: &str) -> InsightStatus {
        self.entry(news_id)
            .map(InsightEntry::status)
            .unwrap_or_default()
    }

    pub fn is_generating(&self, news_id: &str) -> bool {
        self.entry(news_id).is_some_and(|e| e.generating)
    }

    /// Marks an insight request as in flight. Returns false if one already is.
    pub fn begin_insight(&mut self, news_id: &str) -> bool {
        let entry = self.entries.entry(news_id.to_string()).or_default();
        if entry.loading {
            return false;
        }
        entry.loading = true;
        true
    }

    pub fn finish_insight(&mut self, news_id: &str, text: String) {
        let entry = self.entries.entry(news_id.to_string()).or_default();
        entry.insight = Some(text);
        entry.loading = false;
    }

    /// Marks an AI reply as pending. Returns false if one already is.
    pub fn begin_reply(&mut self, news_id: &str) -> bool {
        let entry = self.entries.entry(news_id.to_string()).or_default();
        if entry.generating {
            return false;
        }
        entry.generating = true;
        true
    }

    pub fn finish_reply(&mut self, news_id: &str) {
        if let Some(entry) = self.entries.get_mut(news_id) {
            entry.generating = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insight_lifecycle() {
        let mut board = InsightBoard::default();
        assert_eq!(board.status("n1"), InsightStatus::NotRequested);

        assert!(board.begin_insight("n1"));
        assert_eq!(board.status("n1"), InsightStatus::Loading);
        assert!(!board.begin_insight("n1"));

        board.finish_insight("n1", "three lines".to_string());
        let entry = board.entry("n1").unwrap();
        assert_eq!(entry.status(), InsightStatus::Ready);
        assert_eq!(entry.insight.as_deref(), Some("three lines"));

        // A new request is allowed once the previous one settled.
        assert!(board.begin_insight("n1"));
        assert_eq!(board.status("n1"), InsightStatus::Loading);
    }

    #[test]
    fn reply_flag_is_independent_of_insight() {
        let mut board = InsightBoard::default();
        assert!(board.begin_reply("n1"));
        assert!(!board.begin_reply("n1"));
        assert!(board.begin_insight("n1"));
        assert!(board.is_generating("n1"));

        board.finish_reply("n1");
        assert!(!board.is_generating("n1"));
        assert_eq!(board.status("n1"), InsightStatus::Loading);
    }
}
