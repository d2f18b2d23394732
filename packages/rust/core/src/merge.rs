//! Insertion engine: splice a canonical block into a note.
//!
//! Existing bytes are never rewritten or moved. A merge either returns the
//! text unchanged (the marker is already present) or returns it with exactly
//! one insertion: the block, possibly preceded by newlines and a section
//! header. Where that insertion goes depends only on what is already in the
//! note, so any arrival order of the same records produces the same text.

use tracing::{debug, trace};

use daybook_markdown::{CanonicalBlock, DocumentLayout, ScannedSection, scan, section_header};

/// What a merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    SkippedDuplicate,
}

/// Merge `block` into `text`.
pub fn merge(text: &str, block: &CanonicalBlock) -> (String, MergeOutcome) {
    let layout = scan(text);
    if layout.contains(&block.marker) {
        trace!(marker = %block.marker, "already present");
        return (text.to_string(), MergeOutcome::SkippedDuplicate);
    }

    let (offset, insertion) = match layout.section(block.kind) {
        Some(section) => (
            offset_in_section(&layout, section, block, text.len()),
            block.text.clone(),
        ),
        None => new_section(text, &layout, block),
    };

    let mut out = String::with_capacity(text.len() + insertion.len() + 1);
    out.push_str(&text[..offset]);
    if offset > 0 && !text[..offset].ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&insertion);
    out.push_str(&text[offset..]);

    debug!(marker = %block.marker, kind = %block.kind, offset, "inserted block");
    (out, MergeOutcome::Inserted)
}

/// Position for a block whose section already exists.
///
/// After the last block of the same kind that sorts at or before it; failing
/// that, before the first block of that kind; failing that, right under the
/// header.
fn offset_in_section(
    layout: &DocumentLayout,
    section: &ScannedSection,
    block: &CanonicalBlock,
    text_len: usize,
) -> usize {
    let end = layout.section_end(section, text_len);
    let siblings: Vec<_> = layout
        .blocks
        .iter()
        .filter(|b| b.kind == block.kind && b.start >= section.line_end && b.start < end)
        .collect();

    if let Some(before) = siblings
        .iter()
        .rev()
        .find(|b| b.sort_key() <= block.sort_key())
    {
        return before.end;
    }
    siblings
        .first()
        .map_or(section.line_end, |first| first.start)
}

/// Position and text for a block whose section does not exist yet.
///
/// The new section goes before the first header of a later section, or at
/// the end of the note separated from what precedes it by one blank line.
fn new_section(text: &str, layout: &DocumentLayout, block: &CanonicalBlock) -> (usize, String) {
    let header = section_header(block.kind);

    let later = layout
        .sections
        .iter()
        .filter(|s| s.kind > block.kind)
        .map(|s| s.start)
        .min();
    if let Some(start) = later {
        return (start, format!("{header}{}\n", block.text));
    }

    // A missing final newline is added by `merge`; only the blank line is ours.
    let mut insertion = String::new();
    if !text.is_empty() && !text.ends_with("\n\n") {
        insertion.push('\n');
    }
    insertion.push_str(&header);
    insertion.push_str(&block.text);
    (text.len(), insertion)
}
