//! Record model: the tagged content variants, their dates, and identity keys.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use sha2::{Digest, Sha256};

use crate::error::DaybookError;

/// Separator between natural-key parts before hashing.
const KEY_SEPARATOR: char = '\u{1f}';

/// Number of SHA-256 bytes kept in an identity marker.
const MARKER_BYTES: usize = 16;

/// Format used for timestamp order keys.
pub const ORDER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ---------------------------------------------------------------------------
// DateKey
// ---------------------------------------------------------------------------

/// A calendar date joining content to a daily note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today's date on the local clock.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Parse a strict `YYYY-MM-DD` string.
    ///
    /// Returns `None` for anything that is not exactly four digits, a dash, two
    /// digits, a dash and two digits forming a real calendar date.
    pub fn parse_strict(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !digits_ok {
            return None;
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Self)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = DaybookError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse_strict(s)
            .ok_or_else(|| DaybookError::validation(format!("not a YYYY-MM-DD date: {s:?}")))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

// ---------------------------------------------------------------------------
// RecordKind (section order)
// ---------------------------------------------------------------------------

/// Variant tag of a [`ContentRecord`].
///
/// The derived `Ord` is the section order used when placing blocks in a note:
/// live snapshots first, then history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    News,
    Weather,
    Movies,
    Charts,
    Music,
    Streaming,
    Reviews,
}

impl RecordKind {
    /// All kinds in section order.
    pub const ALL: [RecordKind; 7] = [
        RecordKind::News,
        RecordKind::Weather,
        RecordKind::Movies,
        RecordKind::Charts,
        RecordKind::Music,
        RecordKind::Streaming,
        RecordKind::Reviews,
    ];

    /// Machine tag written into markers.
    pub fn tag(self) -> &'static str {
        match self {
            RecordKind::News => "news",
            RecordKind::Weather => "weather",
            RecordKind::Movies => "movies",
            RecordKind::Charts => "charts",
            RecordKind::Music => "music",
            RecordKind::Streaming => "streaming",
            RecordKind::Reviews => "reviews",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// Human heading for the section.
    pub fn title(self) -> &'static str {
        match self {
            RecordKind::News => "News",
            RecordKind::Weather => "Weather",
            RecordKind::Movies => "Box Office",
            RecordKind::Charts => "Charts",
            RecordKind::Music => "Music",
            RecordKind::Streaming => "Watched",
            RecordKind::Reviews => "Reviews",
        }
    }

    /// History kinds carry their own timestamps; snapshots are dated by the run.
    pub fn is_history(self) -> bool {
        matches!(
            self,
            RecordKind::Music | RecordKind::Streaming | RecordKind::Reviews
        )
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for RecordKind {
    type Err = DaybookError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| DaybookError::validation(format!("unknown source {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// One headline in a news snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub title: String,
    pub link: String,
}

/// The day's news snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub date: DateKey,
    pub headlines: Vec<Headline>,
}

/// One day of a weather forecast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastDay {
    pub forecast_start: String,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub condition: Option<String>,
    pub precipitation_chance: Option<f64>,
    pub precipitation_amount: Option<f64>,
    pub wind_speed: Option<f64>,
}

/// The day's weather snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub date: DateKey,
    pub days: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub rank: Option<u32>,
    pub title: String,
    pub gross: Option<String>,
}

/// The day's box office list.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieListItem {
    pub date: DateKey,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPosition {
    pub rank: u32,
    pub title: String,
    pub artist: Option<String>,
}

/// The day's snapshot of one named chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartEntry {
    pub date: DateKey,
    pub chart: String,
    pub positions: Vec<ChartPosition>,
}

/// A single play of a track, in local wall-clock time.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicPlay {
    pub track: String,
    pub artist: String,
    pub played_at: NaiveDateTime,
}

/// A single viewing of a title. Some exports only carry the date.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingView {
    pub title: String,
    pub watched_on: NaiveDate,
    pub watched_at: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub review_id: String,
    pub business: String,
    pub rating: Option<f32>,
    pub reviewed_at: NaiveDateTime,
    pub body: String,
}

// ---------------------------------------------------------------------------
// ContentRecord
// ---------------------------------------------------------------------------

/// One unit of content bound for a daily note.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentRecord {
    News(NewsItem),
    Weather(WeatherReport),
    Movies(MovieListItem),
    Chart(ChartEntry),
    Music(MusicPlay),
    Streaming(StreamingView),
    Review(Review),
}

impl ContentRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            ContentRecord::News(_) => RecordKind::News,
            ContentRecord::Weather(_) => RecordKind::Weather,
            ContentRecord::Movies(_) => RecordKind::Movies,
            ContentRecord::Chart(_) => RecordKind::Charts,
            ContentRecord::Music(_) => RecordKind::Music,
            ContentRecord::Streaming(_) => RecordKind::Streaming,
            ContentRecord::Review(_) => RecordKind::Reviews,
        }
    }

    /// The daily note this record belongs to.
    pub fn date(&self) -> DateKey {
        match self {
            ContentRecord::News(n) => n.date,
            ContentRecord::Weather(w) => w.date,
            ContentRecord::Movies(m) => m.date,
            ContentRecord::Chart(c) => c.date,
            ContentRecord::Music(p) => DateKey(p.played_at.date()),
            ContentRecord::Streaming(v) => DateKey(v.watched_on),
            ContentRecord::Review(r) => DateKey(r.reviewed_at.date()),
        }
    }

    /// Fields identifying the same real-world event across runs.
    pub fn natural_key(&self) -> NaturalKey {
        let parts = match self {
            ContentRecord::News(n) => vec!["news".to_string(), n.date.to_string()],
            ContentRecord::Weather(w) => vec!["weather".to_string(), w.date.to_string()],
            ContentRecord::Movies(m) => vec!["movies".to_string(), m.date.to_string()],
            ContentRecord::Chart(c) => {
                vec!["charts".to_string(), slugify(&c.chart), c.date.to_string()]
            }
            ContentRecord::Music(p) => vec![
                p.track.clone(),
                p.artist.clone(),
                p.played_at.format(ORDER_TIMESTAMP_FORMAT).to_string(),
            ],
            ContentRecord::Streaming(v) => vec![
                v.title.clone(),
                v.watched_on.format("%Y-%m-%d").to_string(),
                v.watched_at
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_default(),
            ],
            ContentRecord::Review(r) => vec![r.review_id.clone()],
        };
        NaturalKey { parts }
    }

    /// Secondary sort key within a section. Never contains whitespace.
    pub fn order_key(&self) -> String {
        match self {
            ContentRecord::News(_) | ContentRecord::Weather(_) | ContentRecord::Movies(_) => {
                "-".to_string()
            }
            ContentRecord::Chart(c) => {
                let slug = slugify(&c.chart);
                if slug.is_empty() { "-".to_string() } else { slug }
            }
            ContentRecord::Music(p) => p.played_at.format(ORDER_TIMESTAMP_FORMAT).to_string(),
            ContentRecord::Streaming(v) => v
                .watched_on
                .and_time(v.watched_at.unwrap_or(NaiveTime::MIN))
                .format(ORDER_TIMESTAMP_FORMAT)
                .to_string(),
            ContentRecord::Review(r) => r.reviewed_at.format(ORDER_TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Identity marker derived from the kind and natural key.
    pub fn marker(&self) -> IdentityMarker {
        IdentityMarker::derive(self.kind(), &self.natural_key())
    }
}

// ---------------------------------------------------------------------------
// NaturalKey / IdentityMarker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub parts: Vec<String>,
}

/// Deterministic hash of (kind, natural key), embedded in rendered blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityMarker {
    id: String,
}

impl IdentityMarker {
    pub fn derive(kind: RecordKind, key: &NaturalKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.tag().as_bytes());
        for part in &key.parts {
            hasher.update(KEY_SEPARATOR.to_string().as_bytes());
            hasher.update(part.as_bytes());
        }
        let digest = hasher.finalize();
        let id = digest[..MARKER_BYTES]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Self { id }
    }

    /// Rebuild a marker from an id scanned out of a document.
    pub fn from_id(id: &str) -> Option<Self> {
        let valid = id.len() == MARKER_BYTES * 2
            && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self { id: id.to_string() })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for IdentityMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Lowercase, ASCII-alphanumeric slug with single dashes.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
