//! Overlap-aware history merging.
//!
//! Streaming STT revisions and chunk boundaries repeat words: a new caption
//! often starts with the tail of what was already committed. `merge` splices
//! the new text onto the history without duplication, using two distinct
//! strategies:
//! 1. anchor search: find the latest place in recent history where a prefix
//!    of the addition already occurs, and splice there
//! 2. strict suffix-prefix overlap: drop the longest addition prefix that
//!    exactly repeats the history suffix
//!
//! Words are compared in a punctuation-stripped, case-insensitive form so
//! "store." anchors against "store".

/// Longest anchor prefix considered, in words.
const MAX_ANCHOR_WORDS: usize = 5;

/// How far back into history the anchor search looks, in words.
const ANCHOR_WINDOW_WORDS: usize = 100;

/// Strips boundary punctuation and lowercases for word comparison.
fn comparison_form(word: &str) -> String {
    word.trim_end_matches(['.', ',', '?', '!', '"', '\''])
        .trim_start_matches(['"', '\''])
        .to_lowercase()
}

/// Splices `addition` onto `history` without duplicating overlap.
pub fn merge(history: &str, addition: &str) -> String {
    let addition = addition.trim();
    if addition.is_empty() {
        return history.to_string();
    }
    let history = history.trim();
    if history.is_empty() {
        return addition.to_string();
    }

    let hist: Vec<&str> = history.split_whitespace().collect();
    let add: Vec<&str> = addition.split_whitespace().collect();
    let hist_cmp: Vec<String> = hist.iter().map(|w| comparison_form(w)).collect();
    let add_cmp: Vec<String> = add.iter().map(|w| comparison_form(w)).collect();

    // Anchor search: latest i wins, then longest k.
    let k_cap = MAX_ANCHOR_WORDS.min(add.len()).min(hist.len());
    if k_cap >= 2 {
        let window_start = hist.len().saturating_sub(ANCHOR_WINDOW_WORDS);
        for i in (window_start..=hist.len() - 2).rev() {
            let k_max = k_cap.min(hist.len() - i);
            for k in (2..=k_max).rev() {
                if hist_cmp[i..i + k] == add_cmp[..k] {
                    let mut out = hist[..i].to_vec();
                    out.extend_from_slice(&add);
                    return out.join(" ");
                }
            }
        }
    }

    // Strict suffix-prefix overlap: the largest matching k wins.
    let mut best = 0;
    for k in 1..=hist.len().min(add.len()) {
        if hist_cmp[hist.len() - k..] == add_cmp[..k] {
            best = k;
        }
    }
    if best > 0 {
        let mut out = hist.to_vec();
        out.extend_from_slice(&add[best..]);
        return out.join(" ");
    }

    format!("{} {}", history, addition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_addition_returns_history() {
        assert_eq!(merge("I went to the store", ""), "I went to the store");
        assert_eq!(merge("I went to the store", "   "), "I went to the store");
    }

    #[test]
    fn test_empty_history_returns_addition() {
        assert_eq!(merge("", "hello world"), "hello world");
    }

    #[test]
    fn test_merge_is_idempotent_for_empty_adds() {
        let merged = merge("some history", "more text");
        assert_eq!(merge(&merged, ""), merged);
    }

    #[test]
    fn test_anchor_splice_extends_history() {
        assert_eq!(
            merge("I went to the store", "to the store yesterday"),
            "I went to the store yesterday"
        );
    }

    #[test]
    fn test_full_duplicate_is_suppressed() {
        assert_eq!(
            merge("I went to the store", "I went to the store"),
            "I went to the store"
        );
    }

    #[test]
    fn test_anchor_comparison_ignores_punctuation_and_case() {
        assert_eq!(
            merge("I went to the store.", "To the store, yesterday"),
            "I went To the store, yesterday"
        );
    }

    #[test]
    fn test_latest_anchor_wins() {
        // "the cat" occurs twice; the splice must use the later occurrence
        assert_eq!(
            merge("the cat sat and the cat slept", "the cat snored loudly"),
            "the cat sat and the cat snored loudly"
        );
    }

    #[test]
    fn test_suffix_prefix_overlap_single_word() {
        // One-word overlap is below the anchor minimum of 2, so the
        // suffix-prefix path handles it
        assert_eq!(merge("we walked home", "home at last"), "we walked home at last");
    }

    #[test]
    fn test_repeated_word_overlap_not_duplicated() {
        // "la la" suffix repeats as the addition prefix; exactly one copy
        // must survive the splice
        assert_eq!(merge("sing la la", "la la land"), "sing la la land");
    }

    #[test]
    fn test_overlap_longer_than_anchor_cap() {
        // The overlap spans six words, one more than the anchor cap; the
        // splice must still absorb all of it
        assert_eq!(
            merge("one two three four five six", "two three four five six seven eight"),
            "one two three four five six seven eight"
        );
    }

    #[test]
    fn test_no_overlap_appends_with_space() {
        assert_eq!(merge("first sentence", "second sentence"), "first sentence second sentence");
    }

    #[test]
    fn test_anchor_search_limited_to_recent_history() {
        // Place the only anchor occurrence beyond the 100-word window
        let mut history: Vec<String> = vec!["unique".to_string(), "marker".to_string()];
        for i in 0..120 {
            history.push(format!("w{}", i));
        }
        let history = history.join(" ");

        let merged = merge(&history, "unique marker again");

        // No anchor in the window and no suffix overlap: plain append
        assert!(merged.ends_with("w119 unique marker again"));
        assert!(merged.starts_with("unique marker"));
    }

    #[test]
    fn test_comparison_form() {
        assert_eq!(comparison_form("Store."), "store");
        assert_eq!(comparison_form("\"Hello,\""), "hello");
        assert_eq!(comparison_form("it's"), "it's");
        assert_eq!(comparison_form("'quoted'"), "quoted");
    }
}
