//! Fixed prompt templates sent to the completion endpoint.

pub fn insight_prompt(title: &str) -> String {
    format!("\"{title}\" 기사의 시사점을 IT 전문가 관점에서 3줄로 요약하여 제안해주세요.")
}

pub fn reply_prompt(title: &str, comment: &str) -> String {
    format!(
        "뉴스 제목: \"{title}\"\n\
         인간 댓글: \"{comment}\"\n\n\
         이 댓글에 대해 AI로서 다음 형식에 맞춰 답변해줘:\n\
         [AI의 생각] (댓글 분석 요약 1줄)\n\
         [1줄 반박 논리]\n\
         [근거1]\n\
         [근거2]"
    )
}
