//! Reviews from an HTML table export.
//!
//! The first `<table>` in the file is read. A header row of `<th>` cells names
//! the columns (`Date`, `Business Name`, `Rating`, `Comment`, `Review ID`);
//! without one, cells are taken positionally as date, business, rating, comment.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument};

use daybook_shared::{ContentRecord, DaybookError, RecordKind, Result, Review};

use super::export::parse_local_timestamp;
use super::{ExportFile, RunContext, SourceAdapter, SourceBatch};

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

/// Date-only forms, read as midnight.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

pub struct ReviewsAdapter {
    export: ExportFile,
}

impl ReviewsAdapter {
    pub fn new(export: ExportFile) -> Self {
        Self { export }
    }
}

#[async_trait]
impl SourceAdapter for ReviewsAdapter {
    fn name(&self) -> &str {
        "reviews"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Reviews
    }

    #[instrument(skip_all, fields(path = %self.export.path().display()))]
    async fn fetch(&self, ctx: &RunContext) -> Result<SourceBatch> {
        let raw = self.export.read()?;
        let batch = parse_reviews(&raw, ctx.utc_offset)?;
        info!(
            records = batch.records.len(),
            rejects = batch.rejects.len(),
            "read review export"
        );
        Ok(batch)
    }

    fn consume(&self) -> Result<Option<std::path::PathBuf>> {
        self.export.consume()
    }
}

// ---------------------------------------------------------------------------
// Table parsing
// ---------------------------------------------------------------------------

/// Column positions within a row.
#[derive(Debug, Clone, PartialEq)]
struct Columns {
    date: usize,
    business: usize,
    rating: Option<usize>,
    comment: Option<usize>,
    review_id: Option<usize>,
}

impl Columns {
    const POSITIONAL: Columns = Columns {
        date: 0,
        business: 1,
        rating: Some(2),
        comment: Some(3),
        review_id: None,
    };

    fn from_headers(headers: &[String]) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let date = find(&["date"])
            .ok_or_else(|| DaybookError::parse("review table has no 'Date' column"))?;
        let business = find(&["business name", "business"])
            .ok_or_else(|| DaybookError::parse("review table has no 'Business Name' column"))?;
        Ok(Self {
            date,
            business,
            rating: find(&["rating", "stars"]),
            comment: find(&["comment", "review", "text"]),
            review_id: find(&["review id", "id"]),
        })
    }

    fn min_cells(&self) -> usize {
        [Some(self.date), Some(self.business), self.rating, self.comment]
            .into_iter()
            .flatten()
            .max()
            .map_or(0, |m| m + 1)
    }
}

fn parse_reviews(raw: &str, offset: FixedOffset) -> Result<SourceBatch> {
    let doc = Html::parse_document(raw);
    let table = doc
        .select(&TABLE)
        .next()
        .ok_or_else(|| DaybookError::parse("review export has no table"))?;

    let mut batch = SourceBatch::default();
    let mut columns: Option<Columns> = None;

    for (i, row) in table.select(&ROW).enumerate() {
        let line = i + 1;
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        if cells.is_empty() {
            continue;
        }
        if cells.iter().all(|c| c.value().name() == "th") {
            if columns.is_none() {
                let headers: Vec<String> = cells.iter().map(cell_text).collect();
                columns = Some(Columns::from_headers(&headers)?);
            }
            continue;
        }

        let cols = columns.get_or_insert(Columns::POSITIONAL);
        if cells.len() < cols.min_cells() {
            batch.reject(format!("review row {line}: expected {} cells", cols.min_cells()));
            continue;
        }
        match read_row(row, &cells, cols, offset) {
            Ok(review) => batch.records.push(ContentRecord::Review(review)),
            Err(message) => batch.reject(format!("review row {line}: {message}")),
        }
    }
    Ok(batch)
}

fn read_row(
    row: ElementRef<'_>,
    cells: &[ElementRef<'_>],
    cols: &Columns,
    offset: FixedOffset,
) -> std::result::Result<Review, String> {
    let text_at = |idx: Option<usize>| {
        idx.and_then(|i| cells.get(i))
            .map(cell_text)
            .unwrap_or_default()
    };

    let business = text_at(Some(cols.business));
    if business.is_empty() {
        return Err("empty business name".into());
    }
    let raw_date = text_at(Some(cols.date));
    let reviewed_at = parse_review_date(&raw_date, offset)
        .ok_or_else(|| format!("bad date {raw_date:?}"))?;

    let review_id = Some(text_at(cols.review_id))
        .filter(|id| !id.is_empty())
        .or_else(|| {
            row.value()
                .attr("data-review-id")
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
        })
        .unwrap_or_else(|| format!("{business}@{}", reviewed_at.format("%Y-%m-%dT%H:%M:%S")));

    Ok(Review {
        review_id,
        business,
        rating: parse_rating(&text_at(cols.rating)),
        reviewed_at,
        body: text_at(cols.comment),
    })
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn parse_review_date(raw: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    parse_local_timestamp(raw, offset).or_else(|| {
        DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(raw.trim(), f).ok())
            .map(|d| d.and_time(chrono::NaiveTime::MIN))
    })
}

/// Leading number of a rating cell such as `4`, `4.5` or `4 stars`.
fn parse_rating(raw: &str) -> Option<f32> {
    let number: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.parse().ok()
}
