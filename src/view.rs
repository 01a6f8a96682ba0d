use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::{date_value, NewsItem};

/// Group label for items without a date.
pub const NO_DATE: &str = "No date";
pub const INITIAL_WINDOW: usize = 3;
pub const WINDOW_STEP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    All,
    Recommended,
    Bookmarks,
    Management,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::All, Tab::Recommended, Tab::Bookmarks, Tab::Management];

    pub fn label(self) -> &'static str {
        match self {
            Tab::All => "All",
            Tab::Recommended => "Recommended",
            Tab::Bookmarks => "Bookmarks",
            Tab::Management => "Management",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn cycle(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn needs_feed(self) -> bool {
        self != Tab::Management
    }
}

pub fn filter<'a>(
    tab: Tab,
    items: &'a [NewsItem],
    bookmarks: &HashSet<String>,
    recommended_marker: &str,
) -> Vec<&'a NewsItem> {
    items
        .iter()
        .filter(|news| match tab {
            Tab::All => true,
            Tab::Recommended => news.is_recommended(recommended_marker),
            Tab::Bookmarks => bookmarks.contains(&news.id),
            Tab::Management => false,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup<'a> {
    pub date: String,
    pub items: Vec<&'a NewsItem>,
}

/// Groups by literal date string, most recent date first.
///
/// Items keep feed order within a group. Dates that don't parse go last, in
/// the order they first appeared.
pub fn group_by_date(items: Vec<&NewsItem>) -> Vec<DateGroup<'_>> {
    let mut groups: Vec<DateGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for news in items {
        let date = if news.date.is_empty() {
            NO_DATE.to_string()
        } else {
            news.date.clone()
        };
        match index.get(&date) {
            Some(&i) => groups[i].items.push(news),
            None => {
                index.insert(date.clone(), groups.len());
                groups.push(DateGroup {
                    date,
                    items: vec![news],
                });
            }
        }
    }

    groups.sort_by(|a, b| match (date_value(&a.date), date_value(&b.date)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    groups
}

/// Revealed prefix length per date key.
///
/// Keyed only by date string, so an expanded date stays expanded across tabs.
#[derive(Debug, Default)]
pub struct Windows {
    by_date: HashMap<String, usize>,
}

impl Windows {
    pub fn window(&self, date: &str) -> usize {
        self.by_date.get(date).copied().unwrap_or(INITIAL_WINDOW)
    }

    pub fn visible(&self, date: &str, total: usize) -> usize {
        self.window(date).min(total)
    }

    pub fn load_more(&mut self, date: &str) {
        *self
            .by_date
            .entry(date.to_string())
            .or_insert(INITIAL_WINDOW) += WINDOW_STEP;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<'a> {
    Date { date: &'a str, count: usize },
    News(&'a NewsItem),
    LoadMore { date: &'a str, remaining: usize },
}

impl Row<'_> {
    pub fn is_selectable(&self) -> bool {
        !matches!(self, Row::Date { .. })
    }
}

/// Flattens groups into display rows, honouring each date's window.
pub fn rows<'a>(groups: &'a [DateGroup<'a>], windows: &Windows) -> Vec<Row<'a>> {
    let mut out = Vec::new();
    for group in groups {
        let total = group.items.len();
        let visible = windows.visible(&group.date, total);
        out.push(Row::Date {
            date: &group.date,
            count: total,
        });
        out.extend(group.items[..visible].iter().copied().map(Row::News));
        if visible < total {
            out.push(Row::LoadMore {
                date: &group.date,
                remaining: total - visible,
            });
        }
    }
    out
}
