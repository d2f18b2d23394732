//! Marker scanner: locate Daybook sections and blocks inside a note.
//!
//! Only exact marker lines count. A begin line without a matching end line, a
//! tag Daybook doesn't know, or a heading without the section comment is plain
//! user text and is left alone.

use std::sync::LazyLock;

use regex::Regex;

use daybook_shared::{IdentityMarker, RecordKind};

static BEGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!-- daybook:begin ([a-z]+) (\S+) ([0-9a-f]{32}) -->$").expect("valid regex")
});

static END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!-- daybook:end ([0-9a-f]{32}) -->$").expect("valid regex")
});

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^## .*<!-- daybook:section ([a-z]+) -->$").expect("valid regex")
});

/// A recognized block: byte range from the start of its begin line to just past
/// its end line (including that line's newline, when present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedBlock {
    pub kind: RecordKind,
    pub order_key: String,
    pub marker: IdentityMarker,
    pub start: usize,
    pub end: usize,
}

impl ScannedBlock {
    pub fn sort_key(&self) -> (&str, &str) {
        (self.order_key.as_str(), self.marker.as_str())
    }
}

/// A recognized section heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSection {
    pub kind: RecordKind,
    /// Offset of the `##`.
    pub start: usize,
    /// Offset just past the heading line (and its newline, when present).
    pub line_end: usize,
}

/// Everything Daybook recognizes in a note, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLayout {
    pub blocks: Vec<ScannedBlock>,
    pub sections: Vec<ScannedSection>,
}

impl DocumentLayout {
    pub fn contains(&self, marker: &IdentityMarker) -> bool {
        self.blocks.iter().any(|b| &b.marker == marker)
    }

    /// The first heading for `kind`; later duplicates are ignored.
    pub fn section(&self, kind: RecordKind) -> Option<&ScannedSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// End of the region owned by `section`: the next recognized heading, or EOF.
    pub fn section_end(&self, section: &ScannedSection, text_len: usize) -> usize {
        self.sections
            .iter()
            .map(|s| s.start)
            .find(|start| *start > section.start)
            .unwrap_or(text_len)
    }
}

/// One line with its byte offsets; `content` excludes the line terminator.
struct Line<'a> {
    start: usize,
    end: usize,
    content: &'a str,
}

fn lines(text: &str) -> Vec<Line<'_>> {
    let mut out = Vec::new();
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        let content = raw
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(raw);
        out.push(Line {
            start: offset,
            end: offset + raw.len(),
            content,
        });
        offset += raw.len();
    }
    out
}

/// Scan a note for Daybook sections and blocks.
pub fn scan(text: &str) -> DocumentLayout {
    let lines = lines(text);
    let mut layout = DocumentLayout::default();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];

        if let Some(caps) = BEGIN_RE.captures(line.content) {
            if let Some((block, last)) = match_block(&lines, i, &caps) {
                layout.blocks.push(block);
                i = last + 1;
                continue;
            }
        } else if let Some(caps) = SECTION_RE.captures(line.content) {
            if let Some(kind) = RecordKind::from_tag(&caps[1]) {
                layout.sections.push(ScannedSection {
                    kind,
                    start: line.start,
                    line_end: line.end,
                });
            }
        }
        i += 1;
    }

    layout
}

/// Find the end line for the begin line at `begin`. Another begin line before
/// the end makes the first one malformed.
fn match_block(
    lines: &[Line<'_>],
    begin: usize,
    caps: &regex::Captures<'_>,
) -> Option<(ScannedBlock, usize)> {
    let kind = RecordKind::from_tag(&caps[1])?;
    let order_key = caps[2].to_string();
    let marker = IdentityMarker::from_id(&caps[3])?;

    for (offset, line) in lines[begin + 1..].iter().enumerate() {
        if BEGIN_RE.is_match(line.content) {
            return None;
        }
        if let Some(end) = END_RE.captures(line.content) {
            if &end[1] == marker.as_str() {
                let block = ScannedBlock {
                    kind,
                    order_key,
                    marker,
                    start: lines[begin].start,
                    end: line.end,
                };
                return Some((block, begin + 1 + offset));
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID_A: &str = "0123456789abcdef0123456789abcdef";
    const ID_B: &str = "fedcba9876543210fedcba9876543210";

    fn block(tag: &str, key: &str, id: &str, body: &str) -> String {
        format!("<!-- daybook:begin {tag} {key} {id} -->\n{body}<!-- daybook:end {id} -->\n")
    }

    #[test]
    fn scans_sections_and_blocks() {
        let text = format!(
            "# Notes\n\n## Music <!-- daybook:section music -->\n{}{}\nafter\n",
            block("music", "2025-04-26T08:00:00", ID_A, "- 08:00 A\n"),
            block("music", "2025-04-26T09:00:00", ID_B, "- 09:00 A\n"),
        );
        let layout = scan(&text);

        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.blocks.len(), 2);
        assert_eq!(layout.blocks[0].order_key, "2025-04-26T08:00:00");
        assert!(text[layout.blocks[1].end..].starts_with("\nafter"));
        assert!(layout.contains(&IdentityMarker::from_id(ID_B).unwrap()));
    }

    #[test]
    fn unterminated_block_is_user_text() {
        let text = format!("<!-- daybook:begin music - {ID_A} -->\n- stray\n");
        assert!(scan(&text).blocks.is_empty());
    }

    #[test]
    fn mismatched_end_is_user_text() {
        let text = format!(
            "<!-- daybook:begin music - {ID_A} -->\n- x\n<!-- daybook:end {ID_B} -->\n"
        );
        assert!(scan(&text).blocks.is_empty());
    }

    #[test]
    fn nested_begin_invalidates_outer() {
        let text = format!(
            "<!-- daybook:begin music - {ID_B} -->\n{}",
            block("music", "-", ID_A, "- inner\n")
        );
        let layout = scan(&text);
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.blocks[0].marker.as_str(), ID_A);
    }

    #[test]
    fn unknown_tag_and_bad_id_are_ignored() {
        let text = format!(
            "{}{}",
            block("podcasts", "-", ID_A, "- x\n"),
            "<!-- daybook:begin music - 0123 -->\n<!-- daybook:end 0123 -->\n"
        );
        assert!(scan(&text).blocks.is_empty());
    }

    #[test]
    fn plain_heading_is_not_a_section() {
        let layout = scan("## Music\n## Reviews <!-- daybook:section reviews -->\n");
        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.sections[0].kind, RecordKind::Reviews);
        assert_eq!(layout.sections[0].start, "## Music\n".len());
    }

    #[test]
    fn crlf_lines_are_recognized() {
        let text = format!(
            "## Music <!-- daybook:section music -->\r\n<!-- daybook:begin music - {ID_A} -->\r\n- x\r\n<!-- daybook:end {ID_A} -->\r\n"
        );
        let layout = scan(&text);
        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.blocks[0].end, text.len());
    }

    #[test]
    fn end_without_trailing_newline() {
        let text = format!("<!-- daybook:begin music - {ID_A} -->\n- x\n<!-- daybook:end {ID_A} -->");
        let layout = scan(&text);
        assert_eq!(layout.blocks[0].end, text.len());
    }

    #[test]
    fn section_region_ends_at_next_heading() {
        let text = "## News <!-- daybook:section news -->\ntext\n## Music <!-- daybook:section music -->\n";
        let layout = scan(text);
        let news = layout.section(RecordKind::News).unwrap();
        assert_eq!(layout.section_end(news, text.len()), text.find("## Music").unwrap());
        let music = layout.section(RecordKind::Music).unwrap();
        assert_eq!(layout.section_end(music, text.len()), text.len());
    }
}
