//! Sentence-boundary text chunker.
//!
//! Splits cleaned text on the CJK sentence terminators `。`, `！`, and `？`,
//! then greedily packs sentences into chunks of at most `chunk_size`
//! characters. Each packed sentence is re-terminated with `。` and keeps its
//! surrounding spaces; only the ends of a finished chunk are trimmed.
//!
//! `chunk_size` is a soft target: a single sentence longer than the limit
//! becomes its own chunk and is never split mid-sentence.

/// Default soft chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 400;

const TERMINATORS: [char; 3] = ['。', '！', '？'];

/// Split text into sentence-aligned chunks, in document order.
/// Empty or terminator-only input yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current_buf = String::new();
    // Tracked separately: lengths are in chars, not bytes.
    let mut current_len = 0usize;

    for sentence in text.split(TERMINATORS) {
        if sentence.trim().is_empty() {
            continue;
        }
        let sentence_len = sentence.chars().count();

        // Flush once the next sentence would reach the limit.
        if current_len + sentence_len >= chunk_size && !current_buf.is_empty() {
            push_trimmed(&mut chunks, &std::mem::take(&mut current_buf));
            current_len = 0;
        }

        current_buf.push_str(sentence);
        current_buf.push('。');
        current_len += sentence_len + 1;
    }

    if !current_buf.is_empty() {
        push_trimmed(&mut chunks, &current_buf);
    }

    chunks
}

/// Sentences keep their inner spacing; only a chunk's outer edges are trimmed.
fn push_trimmed(chunks: &mut Vec<String>, buf: &str) {
    chunks.push(buf.trim().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_single_chunk() {
        let text = "人工智能正在改变世界。它影响教育、医疗和交通。";
        let chunks = chunk_text(text, DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(chunk_text("", DEFAULT_CHUNK_SIZE).is_empty());
        assert!(chunk_text("   ", DEFAULT_CHUNK_SIZE).is_empty());
        assert!(chunk_text("。！？", DEFAULT_CHUNK_SIZE).is_empty());
    }

    #[test]
    fn all_terminators_become_full_stops() {
        let chunks = chunk_text("真的吗？是的！好。", DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks, vec!["真的吗。是的。好。".to_string()]);
    }

    #[test]
    fn text_without_terminators_is_one_sentence() {
        let chunks = chunk_text("plain ascii text", DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks, vec!["plain ascii text。".to_string()]);
    }

    #[test]
    fn chunks_respect_soft_limit() {
        let text = (0..200)
            .map(|i| format!("第{}句话内容", i))
            .collect::<Vec<_>>()
            .join("。");
        let chunks = chunk_text(&text, 50);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 50, "chunk too long: {}", c);
        }
    }

    #[test]
    fn oversized_sentence_emitted_whole() {
        let long = "长".repeat(30);
        let text = format!("短句。{}。尾巴。", long);
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "短句。");
        assert_eq!(chunks[1], format!("{}。", long));
        assert_eq!(chunks[2], "尾巴。");
    }

    #[test]
    fn order_preserved() {
        let sentences: Vec<String> = (0..60).map(|i| format!("句子{}", i)).collect();
        let text = sentences.join("。");
        let chunks = chunk_text(&text, 25);
        let rejoined: Vec<String> = chunks
            .concat()
            .split('。')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        assert_eq!(rejoined, sentences);
    }

    #[test]
    fn spacing_after_terminator_is_kept() {
        let chunks = chunk_text("第一句。 second sentence here。", DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks, vec!["第一句。 second sentence here。".to_string()]);
    }

    #[test]
    fn chunk_edges_are_trimmed() {
        let chunks = chunk_text(" 甲乙丙丁。 戊己庚辛。", 6);
        assert_eq!(chunks, vec!["甲乙丙丁。".to_string(), "戊己庚辛。".to_string()]);
    }

    #[test]
    fn deterministic() {
        let text = "甲。乙。丙。丁。戊。";
        assert_eq!(chunk_text(text, 4), chunk_text(text, 4));
    }
}
