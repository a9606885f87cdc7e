//! Scope selection: a deliberately cheap keyword pre-filter that narrows
//! the candidate title set before either search path runs. It trades
//! recall for latency and fails open: when no rule fires the result is
//! empty, meaning "search the full corpus".

use regex::Regex;
use std::sync::OnceLock;

/// At most this many titles survive selection.
pub const MAX_SCOPE_TITLES: usize = 2;

const PENALTY_TITLE_PREFIX: &str = "xu_phat_";

/// Ordered (matcher, title) heuristics over the raw query text. Evaluated
/// in priority order; a rule only contributes its title when that title is
/// actually available in the corpus.
fn category_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (
                r"(?i)\b(shtt|sở\s*hữu\s*trí\s*tuệ|nhãn\s*hiệu|bản\s*quyền|sáng\s*chế|bí\s*mật\s*kinh\s*doanh)\b",
                "so_huu_tri_tue",
            ),
            (r"(?i)\b(đất\s*đai|sổ\s*đỏ|giấy\s*chứng\s*nhận)\b", "dat_dai"),
            (r"(?i)\b(lao\s*động|hợp\s*đồng\s*lao\s*động|sa\s*thải)\b", "lao_dong"),
            (r"(?i)\b(hôn\s*nhân|ly\s*hôn|con\s*chung)\b", "hon_nhan"),
            (
                r"(?i)\b(giao\s*thông|nồng\s*độ\s*cồn|xử\s*phạt|mức\s*phạt|phạt)\b",
                "giao_thong_duong_bo",
            ),
            (r"(?i)\b(an\s*ninh\s*mạng|không\s*gian\s*mạng)\b", "an_ninh_mang"),
        ]
        .into_iter()
        .map(|(pattern, title)| (Regex::new(pattern).expect("scope rule regex is valid"), title))
        .collect()
    })
}

fn penalty_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(mức\s*phạt|xử\s*phạt|phạt|tiền\s*phạt)\b").expect("penalty regex is valid")
    })
}

/// Select the subset of `available_titles` a query should search. Empty
/// output means no restriction.
///
/// The penalty rule takes precedence: a fine/penalty query restricts to the
/// first [`MAX_SCOPE_TITLES`] sorted titles with the `xu_phat_` prefix, if
/// any exist, short-circuiting the category rules.
pub fn select_titles(query: &str, available_titles: &[String]) -> Vec<String> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    if penalty_re().is_match(query) {
        let mut penalty: Vec<String> = available_titles
            .iter()
            .filter(|t| t.starts_with(PENALTY_TITLE_PREFIX))
            .cloned()
            .collect();
        penalty.sort();
        penalty.truncate(MAX_SCOPE_TITLES);
        if !penalty.is_empty() {
            return penalty;
        }
    }

    let mut chosen: Vec<String> = Vec::new();
    for (matcher, title) in category_rules() {
        if !matcher.is_match(query) {
            continue;
        }
        if !available_titles.iter().any(|t| t == title) {
            continue;
        }
        if !chosen.iter().any(|t| t == title) {
            chosen.push((*title).to_string());
        }
    }
    chosen.truncate(MAX_SCOPE_TITLES);
    chosen
}
