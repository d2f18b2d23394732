//! Canonical Markdown blocks for daily notes.
//!
//! [`render`] turns a [`ContentRecord`] into a [`CanonicalBlock`]: a short Markdown
//! body wrapped in begin/end comment lines that carry the record's identity
//! marker. [`scan`] reads those comment lines back out of a note so the merge
//! step can tell what is already there and where each section lives.
//!
//! On disk a block looks like:
//!
//! ```text
//! ## Music <!-- daybook:section music -->
//! <!-- daybook:begin music 2025-04-26T08:00:00 9f86d081884c7d659a2feaa0c55ad015 -->
//! - 08:00 **A** by B
//! <!-- daybook:end 9f86d081884c7d659a2feaa0c55ad015 -->
//! ```

mod render;
mod scan;

use tracing::{debug, instrument};

use daybook_shared::{ContentRecord, IdentityMarker, RecordKind, Result};

pub use scan::{DocumentLayout, ScannedBlock, ScannedSection, scan};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The rendered text of one record, including its marker lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBlock {
    pub kind: RecordKind,
    /// Secondary sort key within the section (whitespace-free).
    pub order_key: String,
    pub marker: IdentityMarker,
    /// Full block text; always ends with a newline.
    pub text: String,
}

impl CanonicalBlock {
    /// Sort position among blocks of the same kind.
    pub fn sort_key(&self) -> (&str, &str) {
        (self.order_key.as_str(), self.marker.as_str())
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Render a record into its canonical block.
///
/// Pure and deterministic: the same record always yields the same bytes. Fails
/// with a format error when the payload lacks what the block needs (an empty
/// title, a snapshot with no entries), in which case the record is skipped.
#[instrument(skip_all, fields(kind = %record.kind()))]
pub fn render(record: &ContentRecord) -> Result<CanonicalBlock> {
    let kind = record.kind();
    let order_key = record.order_key();
    let marker = record.marker();
    let body = render::body(record)?;

    let mut text = String::with_capacity(body.len() + 128);
    text.push_str(&begin_line(kind, &order_key, &marker));
    text.push('\n');
    text.push_str(&body);
    text.push_str(&end_line(&marker));
    text.push('\n');

    debug!(marker = %marker, len = text.len(), "rendered block");

    Ok(CanonicalBlock {
        kind,
        order_key,
        marker,
        text,
    })
}

/// The heading line that opens a section, with its trailing newline.
pub fn section_header(kind: RecordKind) -> String {
    format!(
        "## {} <!-- daybook:section {} -->\n",
        kind.title(),
        kind.tag()
    )
}

fn begin_line(kind: RecordKind, order_key: &str, marker: &IdentityMarker) -> String {
    format!("<!-- daybook:begin {} {order_key} {marker} -->", kind.tag())
}

fn end_line(marker: &IdentityMarker) -> String {
    format!("<!-- daybook:end {marker} -->")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
