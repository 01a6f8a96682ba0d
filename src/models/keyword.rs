use super::NewsItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementKeyword {
    pub name: String,
    pub checked: bool,
    pub recommended: bool,
    pub news_count: usize,
}

#[derive(Debug, Clone)]
pub struct KeywordCategory {
    pub name: String,
    pub keywords: Vec<ManagementKeyword>,
}

// (category, [(keyword, checked, recommended)])
const CATALOG: &[(&str, &[(&str, bool, bool)])] = &[
    (
        "기업동향",
        &[
            ("네이버", true, false),
            ("카카오", true, false),
            ("토스", true, false),
            ("당근마켓", true, false),
            ("컬리", true, false),
            ("배민", true, false),
            ("쿠팡이츠", false, true),
        ],
    ),
    (
        "AD TECH",
        &[
            ("AI 광고", true, false),
            ("AD TECH", false, true),
            ("네이버 광고", true, false),
            ("광고 플랫폼", true, false),
        ],
    ),
    (
        "커머스",
        &[
            ("라이브 커머스", true, false),
            ("이커머스 솔루션", true, false),
            ("풀필먼트", false, true),
        ],
    ),
];

/// Interest keywords shown on the management tab.
///
/// The set of keywords is fixed; only the `checked` flags change.
#[derive(Debug, Clone)]
pub struct KeywordCatalog {
    categories: Vec<KeywordCategory>,
}

impl Default for KeywordCatalog {
    fn default() -> Self {
        let categories = CATALOG
            .iter()
            .map(|(category, keywords)| KeywordCategory {
                name: category.to_string(),
                keywords: keywords
                    .iter()
                    .map(|(name, checked, recommended)| ManagementKeyword {
                        name: name.to_string(),
                        checked: *checked,
                        recommended: *recommended,
                        news_count: 0,
                    })
                    .collect(),
            })
            .collect();
        Self { categories }
    }
}

impl KeywordCatalog {
    pub fn categories(&self) -> &[KeywordCategory] {
        &self.categories
    }

    pub fn category(&self, index: usize) -> Option<&KeywordCategory> {
        self.categories.get(index)
    }

    /// Flips `checked` on the named keyword. Unknown names are ignored.
    pub fn toggle(&mut self, category: &str, keyword: &str) -> bool {
        let Some(kw) = self
            .categories
            .iter_mut()
            .filter(|c| c.name == category)
            .flat_map(|c| c.keywords.iter_mut())
            .find(|k| k.name == keyword)
        else {
            return false;
        };
        kw.checked = !kw.checked;
        true
    }

    pub fn refresh_counts(&mut self, items: &[NewsItem]) {
        for kw in self.categories.iter_mut().flat_map(|c| c.keywords.iter_mut()) {
            kw.news_count = items.iter().filter(|n| n.keyword == kw.name).count();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_names(catalog: &KeywordCatalog) -> Vec<String> {
        catalog
            .categories()
            .iter()
            .flat_map(|c| c.keywords.iter().map(|k| k.name.clone()))
            .collect()
    }

    #[test]
    fn toggle_flips_only_checked() {
        let mut catalog = KeywordCatalog::default();
        let before = all_names(&catalog);

        assert!(catalog.toggle("기업동향", "쿠팡이츠"));
        let kw = &catalog.category(0).unwrap().keywords[6];
        assert!(kw.checked);
        assert!(kw.recommended);

        assert!(catalog.toggle("기업동향", "쿠팡이츠"));
        assert!(!catalog.category(0).unwrap().keywords[6].checked);
        assert_eq!(all_names(&catalog), before);
    }

    #[test]
    fn unknown_keyword_leaves_catalog_untouched() {
        let mut catalog = KeywordCatalog::default();
        assert!(!catalog.toggle("기업동향", "없는키워드"));
        assert!(!catalog.toggle("없는카테고리", "네이버"));
        assert_eq!(all_names(&catalog).len(), 14);
    }

    #[test]
    fn counts_follow_feed_keywords() {
        let mut catalog = KeywordCatalog::default();
        let news = |keyword: &str| NewsItem {
            id: keyword.to_string(),
            title: "t".to_string(),
            keyword: keyword.to_string(),
            source: String::new(),
            tags: String::new(),
            url: "https://example.com".to_string(),
            date: String::new(),
            summary: String::new(),
            likes: 0,
        };
        catalog.refresh_counts(&[news("토스"), news("토스"), news("네이버")]);

        let corp = catalog.category(0).unwrap();
        assert_eq!(corp.keywords[0].news_count, 1);
        assert_eq!(corp.keywords[2].news_count, 2);
        assert_eq!(corp.keywords[3].news_count, 0);
    }
}
