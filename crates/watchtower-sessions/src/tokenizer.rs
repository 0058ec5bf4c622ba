use tiktoken_rs::CoreBPE;

/// Fixed per-message overhead the chat-completions wire format adds on top
/// of raw content tokens (role framing, separators).
const MESSAGE_TEMPLATE_OVERHEAD: usize = 4;

/// Token counter used by `buildContextMessages` (§4.5 step 4). Built once per
/// [`crate::manager::SessionManager`]; if the `cl100k_base` encoder fails to
/// load, the whole instance falls back to the character estimate permanently
/// rather than retrying per call.
pub struct Tokenizer {
    bpe: Option<CoreBPE>,
}

impl Tokenizer {
    pub fn new() -> Self {
        match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Self { bpe: Some(bpe) },
            Err(err) => {
                tracing::warn!(error = %err, "tiktoken encoder unavailable, falling back to character estimate");
                Self { bpe: None }
            }
        }
    }

    /// Token count for a bare string, no template overhead.
    pub fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => char_estimate(text),
        }
    }

    /// Token count for one context message, including the fixed per-message
    /// overhead the wire format adds.
    pub fn count_message(&self, content: &str) -> usize {
        self.count(content) + MESSAGE_TEMPLATE_OVERHEAD
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// `⌈len/4⌉` character-based fallback estimate (§4.5 step 4).
fn char_estimate(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_estimate_rounds_up() {
        assert_eq!(char_estimate("abcde"), 2);
        assert_eq!(char_estimate("abcd"), 1);
        assert_eq!(char_estimate(""), 0);
    }

    #[test]
    fn accurate_tokenizer_counts_nonzero_for_text() {
        let tok = Tokenizer::new();
        assert!(tok.count("hello, world") > 0);
    }
}
