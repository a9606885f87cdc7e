use regex::Regex;
use std::sync::OnceLock;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    // Word characters plus the Vietnamese accented letter range. No
    // stemming, no stop words; matching is case-folded only.
    TOKEN_RE.get_or_init(|| Regex::new(r"[a-zA-Z0-9_À-ỹ]+").expect("token regex is valid"))
}

/// Case-folded word-boundary tokenization.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn splits_on_word_boundaries_and_lowercases() {
        assert_eq!(tokenize("Nam TỪ đủ 20 tuổi"), vec!["nam", "từ", "đủ", "20", "tuổi"]);
    }

    #[test]
    fn keeps_underscores_and_digits() {
        assert_eq!(tokenize("xu_phat_giao_thong: Điều 5!"), vec!["xu_phat_giao_thong", "điều", "5"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  .,;!?  ").is_empty());
    }
}
