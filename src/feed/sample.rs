use crate::models::NewsItem;

// (id, title, keyword, source, tags, url, date, summary, likes)
const SAMPLE: &[(&str, &str, &str, &str, &str, &str, &str, &str, i64)] = &[
    (
        "sim-0",
        "네이버, AI 검색 서비스 대폭 개선... 정확도 30% 향상",
        "네이버",
        "IT조선",
        "#AI #검색 #기술혁신 #추천",
        "https://example.com/news1",
        "2025-08-01",
        "네이버가 자체 개발한 AI 기술을 적용하여 검색 정확도를 크게 개선했으며, 사용자 만족도가 크게 향상될 것으로 예상됩니다.",
        12,
    ),
    (
        "sim-1",
        "토스, 투자 플랫폼 '토스증권' 월 거래액 10조원 돌파",
        "토스",
        "매일경제",
        "#핀테크 #투자 #거래액 #추천",
        "https://example.com/news2",
        "2025-07-31",
        "토스증권이 월 거래액 10조원을 돌파하며 핀테크 시장의 새로운 강자로 떠올랐습니다.",
        8,
    ),
    (
        "sim-2",
        "카카오, 새로운 소셜 서비스 '카카오뷰' 출시",
        "카카오",
        "전자신문",
        "#소셜 #플랫폼 #신규서비스",
        "https://example.com/news3",
        "2025-07-31",
        "카카오가 콘텐츠 큐레이션 기반의 새로운 소셜 서비스 '카카오뷰'를 출시하며 플랫폼 영향력 강화에 나섰습니다.",
        25,
    ),
    (
        "sim-3",
        "당근마켓, 지역 커뮤니티 활성화로 월 사용자 2천만 명 달성",
        "당근마켓",
        "블로터",
        "#커뮤니티 #중고거래 #추천",
        "https://example.com/news4",
        "2025-07-30",
        "당근마켓이 단순 중고거래를 넘어 지역 커뮤니티 플랫폼으로 자리매김하며 월간 활성 사용자(MAU) 2천만 명을 돌파했습니다.",
        40,
    ),
];

/// Fixed articles shown when the spreadsheet cannot be read.
pub fn sample_news() -> Vec<NewsItem> {
    SAMPLE
        .iter()
        .map(
            |&(id, title, keyword, source, tags, url, date, summary, likes)| NewsItem {
                id: id.to_string(),
                title: title.to_string(),
                keyword: keyword.to_string(),
                source: source.to_string(),
                tags: tags.to_string(),
                url: url.to_string(),
                date: date.to_string(),
                summary: summary.to_string(),
                likes,
            },
        )
        .collect()
}
