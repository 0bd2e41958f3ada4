//! Post pricing and chunking.
//!
//! Lengths are counted in characters, never bytes, so a chunk boundary
//! can't split a UTF-8 sequence.

/// Characters per pricing block.
const COST_BLOCK: usize = 128;

/// Surcharge per full block.
const BLOCK_SURCHARGE: usize = 9;

/// POD cost of posting `text`.
pub fn post_cost(text: &str) -> i64 {
    let len = text.chars().count();
    i64::try_from(len + BLOCK_SURCHARGE * (len / COST_BLOCK)).unwrap_or(i64::MAX)
}

/// Split `text` into pieces of at most `size` characters.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost() {
        assert_eq!(post_cost("hello"), 5);
        assert_eq!(post_cost(&"x".repeat(128)), 137);
        assert_eq!(post_cost(&"x".repeat(300)), 318);
    }

    #[test]
    fn test_chunk_300_by_128() {
        let text = "a".repeat(300);
        let chunks = chunk_text(&text, 128);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 128);
        assert_eq!(chunks[2].len(), 44);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_chars_not_split() {
        let chunks = chunk_text("ééé", 2);
        assert_eq!(chunks, vec!["éé".to_string(), "é".to_string()]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 128).is_empty());
    }
}
