//! Text normalization ahead of chunking.
//!
//! Keeps word characters, whitespace, CJK Unified Ideographs, and a fixed
//! set of full-width punctuation; everything else is dropped. Whitespace
//! runs collapse to a single space.

use regex::Regex;
use std::sync::OnceLock;

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[^\w\s\x{4e00}-\x{9fff}，。！？；："'（）《》]"#)
            .expect("static pattern")
    })
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

/// Normalizes extracted text. `clean_text(clean_text(x)) == clean_text(x)`.
///
/// Characters are stripped before whitespace is collapsed, so removing a
/// symbol between two spaces cannot leave a double space behind.
pub fn clean_text(text: &str) -> String {
    let stripped = disallowed().replace_all(text, "");
    let collapsed = whitespace_run().replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(clean_text("  hello \n\n\t world  "), "hello world");
    }

    #[test]
    fn keeps_cjk_and_fullwidth_punctuation() {
        let text = "人工智能正在改变世界。它（真的）《很》重要！对吗？是；的：\"好\"'吧'";
        assert_eq!(clean_text(text), text);
    }

    #[test]
    fn keeps_ascii_apostrophe() {
        assert_eq!(clean_text("don't stop"), "don't stop");
    }

    #[test]
    fn strips_symbols_outside_allow_list() {
        assert_eq!(clean_text("价格: $100 @home #tag"), "价格 100 home tag");
        assert_eq!(clean_text("教育、医疗和交通"), "教育医疗和交通");
    }

    #[test]
    fn removal_does_not_leave_double_spaces() {
        assert_eq!(clean_text("a - b"), "a b");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "",
            "   ",
            "a - b — c",
            "第一段。\n\n第二段！  第三段？",
            "mixed ASCII, 中文，and symbols ©®™ → ←",
            "tabs\tand\u{3000}ideographic spaces",
        ];
        for s in samples {
            let once = clean_text(s);
            assert_eq!(clean_text(&once), once, "not idempotent for {:?}", s);
        }
    }
}
