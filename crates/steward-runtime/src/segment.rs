//! Incremental markdown segmenter for narration text.
//!
//! Streams arrive token by token; clients want structure (paragraphs, code
//! blocks) rather than raw fragments. [`MarkdownSegmenter`] buffers deltas
//! and emits a [`NarrationSegment`] whenever a structural unit completes.
//!
//! The segmenter is a scoped resource with an explicit lifecycle: create it
//! before the first token, [`feed`](MarkdownSegmenter::feed) every delta, and
//! call [`finish`](MarkdownSegmenter::finish) exactly once to flush the tail.
//! `finish` consumes the segmenter, so a double stop does not compile.

use steward_core::{NarrationSegment, SegmentKind};

/// Incremental structure parser over streamed markdown text.
#[derive(Debug, Default)]
pub struct MarkdownSegmenter {
    /// Text since the last emitted newline, not yet a complete line.
    line_buffer: String,
    /// Completed lines of the paragraph being accumulated.
    paragraph: String,
    /// Inside a fenced code block.
    in_code_block: bool,
    /// Info string of the open fence.
    fence_language: Option<String>,
    /// Lines accumulated inside the open fence.
    code: String,
}

impl MarkdownSegmenter {
    /// Segmenter with no buffered text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a text delta, returning any segments it completed.
    pub fn feed(&mut self, delta: &str) -> Vec<NarrationSegment> {
        let mut segments = Vec::new();
        self.line_buffer.push_str(delta);

        // Process every complete line; the trailing partial stays buffered.
        while let Some(newline) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            self.absorb_line(line, &mut segments);
        }
        segments
    }

    /// Flush the trailing partial segment and consume the segmenter.
    ///
    /// An unterminated code block is emitted as a code segment with whatever
    /// content arrived; a pending paragraph flushes as-is.
    #[must_use]
    pub fn finish(mut self) -> Vec<NarrationSegment> {
        let mut segments = Vec::new();
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            self.absorb_line(line.trim_end_matches('\r'), &mut segments);
        }
        if self.in_code_block {
            self.emit_code_block(&mut segments);
        }
        self.emit_paragraph(&mut segments);
        segments
    }

    fn absorb_line(&mut self, line: &str, segments: &mut Vec<NarrationSegment>) {
        if self.in_code_block {
            if is_fence(line) {
                self.emit_code_block(segments);
            } else {
                self.code.push_str(line);
                self.code.push('\n');
            }
            return;
        }

        if is_fence(line) {
            self.emit_paragraph(segments);
            self.in_code_block = true;
            let info = line.trim_start().trim_start_matches('`').trim();
            self.fence_language = if info.is_empty() {
                None
            } else {
                Some(info.to_string())
            };
            return;
        }

        if line.trim().is_empty() {
            self.emit_paragraph(segments);
            return;
        }

        if let Some(text) = heading_text(line) {
            self.emit_paragraph(segments);
            segments.push(NarrationSegment {
                kind: SegmentKind::Heading,
                text,
                language: None,
            });
            return;
        }

        if let Some(text) = list_item_text(line) {
            self.emit_paragraph(segments);
            segments.push(NarrationSegment {
                kind: SegmentKind::ListItem,
                text,
                language: None,
            });
            return;
        }

        if !self.paragraph.is_empty() {
            self.paragraph.push('\n');
        }
        self.paragraph.push_str(line);
    }

    fn emit_paragraph(&mut self, segments: &mut Vec<NarrationSegment>) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.paragraph);
        let text = text.trim().to_string();
        if !text.is_empty() {
            segments.push(NarrationSegment {
                kind: SegmentKind::Paragraph,
                text,
                language: None,
            });
        }
    }

    fn emit_code_block(&mut self, segments: &mut Vec<NarrationSegment>) {
        let code = std::mem::take(&mut self.code);
        segments.push(NarrationSegment {
            kind: SegmentKind::CodeBlock,
            text: code.trim_end_matches('\n').to_string(),
            language: self.fence_language.take(),
        });
        self.in_code_block = false;
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn heading_text(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    rest.strip_prefix(' ').map(|text| text.trim().to_string())
}

fn list_item_text(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some(rest.trim().to_string());
        }
    }
    // Ordered list: digits, a dot, a space.
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix(". ") {
            return Some(rest.trim().to_string());
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed the whole text in one delta and collect everything.
    fn segment_all(text: &str) -> Vec<NarrationSegment> {
        let mut segmenter = MarkdownSegmenter::new();
        let mut segments = segmenter.feed(text);
        segments.extend(segmenter.finish());
        segments
    }

    #[test]
    fn paragraph_completes_on_blank_line() {
        let mut segmenter = MarkdownSegmenter::new();
        assert!(segmenter.feed("Looking up the record").is_empty());
        let segments = segmenter.feed(" now.\n\n");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Paragraph);
        assert_eq!(segments[0].text, "Looking up the record now.");
    }

    #[test]
    fn multi_line_paragraph_joins_lines() {
        let segments = segment_all("first line\nsecond line\n\n");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "first line\nsecond line");
    }

    #[test]
    fn heading_emits_immediately() {
        let mut segmenter = MarkdownSegmenter::new();
        let segments = segmenter.feed("## Results\n");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Heading);
        assert_eq!(segments[0].text, "Results");
    }

    #[test]
    fn hashes_without_space_are_not_a_heading() {
        let segments = segment_all("#hashtag\n\n");
        assert_eq!(segments[0].kind, SegmentKind::Paragraph);
        assert_eq!(segments[0].text, "#hashtag");
    }

    #[test]
    fn list_items_emit_per_line() {
        let segments = segment_all("- send the email\n- update the record\n");
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.kind == SegmentKind::ListItem));
        assert_eq!(segments[0].text, "send the email");
        assert_eq!(segments[1].text, "update the record");
    }

    #[test]
    fn ordered_list_items_recognized() {
        let segments = segment_all("1. first\n2. second\n");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, SegmentKind::ListItem);
        assert_eq!(segments[1].text, "second");
    }

    #[test]
    fn code_block_collects_until_closing_fence() {
        let segments = segment_all("```sql\nSELECT Id FROM Lead\nLIMIT 10\n```\n");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::CodeBlock);
        assert_eq!(segments[0].text, "SELECT Id FROM Lead\nLIMIT 10");
        assert_eq!(segments[0].language.as_deref(), Some("sql"));
    }

    #[test]
    fn fence_without_language() {
        let segments = segment_all("```\nplain\n```\n");
        assert_eq!(segments[0].language, None);
        assert_eq!(segments[0].text, "plain");
    }

    #[test]
    fn blank_lines_inside_code_do_not_split_it() {
        let segments = segment_all("```\na\n\nb\n```\n");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "a\n\nb");
    }

    #[test]
    fn paragraph_before_fence_flushes_first() {
        let segments = segment_all("Here is the query:\n```sql\nSELECT 1\n```\n");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].kind, SegmentKind::Paragraph);
        assert_eq!(segments[1].kind, SegmentKind::CodeBlock);
    }

    #[test]
    fn token_sized_deltas_produce_same_segments() {
        let text = "## Plan\nSending the email now.\n\n- step one\n";
        let whole = segment_all(text);

        let mut segmenter = MarkdownSegmenter::new();
        let mut fragmented = Vec::new();
        for ch in text.chars() {
            fragmented.extend(segmenter.feed(&ch.to_string()));
        }
        fragmented.extend(segmenter.finish());

        assert_eq!(whole, fragmented);
    }

    #[test]
    fn finish_flushes_trailing_paragraph() {
        let mut segmenter = MarkdownSegmenter::new();
        let _ = segmenter.feed("no trailing newline");
        let segments = segmenter.finish();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "no trailing newline");
    }

    #[test]
    fn finish_closes_unterminated_code_block() {
        let mut segmenter = MarkdownSegmenter::new();
        let _ = segmenter.feed("```json\n{\"id\": 7");
        let segments = segmenter.finish();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::CodeBlock);
        assert_eq!(segments[0].text, "{\"id\": 7");
        assert_eq!(segments[0].language.as_deref(), Some("json"));
    }

    #[test]
    fn finish_on_empty_stream_is_empty() {
        let segmenter = MarkdownSegmenter::new();
        assert!(segmenter.finish().is_empty());
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let segments = segment_all("# Title\r\nbody text\r\n\r\n");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Title");
        assert_eq!(segments[1].text, "body text");
    }
}
