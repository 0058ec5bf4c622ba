/// Splits a streamed LLM response into an ordered queue of sentences as
/// text arrives, so the drain task can start synthesizing before the full
/// response is done (§4.6 Outbound).
///
/// Terminal punctuation is `.`, `!`, `?` followed by whitespace or
/// end-of-input; abbreviation handling is intentionally left out — the
/// worst case is an over-eager split, which only costs one extra TTS call.
#[derive(Debug, Default)]
pub struct SentenceDetector {
    buffer: String,
    next_index: u64,
}

impl SentenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a text delta; returns any complete sentences it produced.
    pub fn push(&mut self, delta: &str) -> Vec<crate::types::QueuedSentence> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();

        loop {
            match find_sentence_boundary(&self.buffer) {
                Some(end) => {
                    let sentence: String = self.buffer.drain(..end).collect();
                    let trimmed = sentence.trim();
                    if !trimmed.is_empty() {
                        out.push(crate::types::QueuedSentence {
                            index: self.next_index,
                            text: trimmed.to_string(),
                        });
                        self.next_index += 1;
                    }
                }
                None => break,
            }
        }

        out
    }

    /// Flush whatever remains in the buffer as a final sentence (called when
    /// the LLM stream signals end).
    pub fn finish(mut self) -> Option<crate::types::QueuedSentence> {
        let trimmed = self.buffer.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(crate::types::QueuedSentence {
                index: self.next_index,
                text: trimmed.to_string(),
            })
        }
    }
}

fn find_sentence_boundary(buf: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = buf.char_indices().collect();
    for (i, (byte_idx, ch)) in chars.iter().enumerate() {
        if matches!(ch, '.' | '!' | '?') {
            let next = chars.get(i + 1);
            match next {
                Some((_, next_ch)) if next_ch.is_whitespace() => {
                    return Some(byte_idx + ch.len_utf8());
                }
                None => return None, // wait for more input or finish()
                _ => continue,
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundaries() {
        let mut det = SentenceDetector::new();
        let out = det.push("Hello there. How are you? ");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "Hello there.");
        assert_eq!(out[0].index, 0);
        assert_eq!(out[1].text, "How are you?");
        assert_eq!(out[1].index, 1);
    }

    #[test]
    fn holds_incomplete_trailing_text() {
        let mut det = SentenceDetector::new();
        let out = det.push("The node pve");
        assert!(out.is_empty());
        let out = det.push("-03 rebooted.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "The node pve-03 rebooted.");
    }

    #[test]
    fn finish_flushes_remainder_without_terminal_punctuation() {
        let mut det = SentenceDetector::new();
        det.push("trailing fragment");
        let last = det.finish().expect("expected flushed fragment");
        assert_eq!(last.text, "trailing fragment");
    }
}
