//! Prompt templates for the text-generation service.

pub const POLICY_ANALYST_PERSONA: &str = "あなたは政策分析に精通した専門家です。";

pub fn topic_extraction(context_label: &str, chunk: &str) -> String {
    format!(
        "以下は、{}に行われた国会答弁の一部です。主要な政策トピックを抽出し、\
         トピック名のみを「, 」（カンマと半角スペース）区切りで1行に列挙してください:\n\n{}\n\nトピック:",
        context_label, chunk
    )
}

pub fn monthly_summary(year: i32, month: u32, content: &str) -> String {
    format!(
        "以下は、{year}年{month}月の国会答弁の要約です。この内容に基づいて、\
         {year}年{month}月の答弁の主要トピックのリスト化と各トピックの概要を作成してください\n\n\
         {content}\n\nトピックと議論概要:"
    )
}

/// Used to condense one slice of a monthly report that is too large to send
/// in a single request.
pub fn partial_summary(year: i32, month: u32, part: usize, parts: usize, content: &str) -> String {
    format!(
        "以下は、{year}年{month}月の国会答弁の要約の一部です（{part}/{parts}）。\
         この部分に含まれる主要トピックと各トピックの概要を簡潔にまとめてください\n\n\
         {content}\n\nトピックと議論概要:"
    )
}
