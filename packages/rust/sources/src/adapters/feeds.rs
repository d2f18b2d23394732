//! JSON response shapes of the live API sources.
//!
//! A response without the expected top-level array fails the whole source. A
//! single unusable item inside it is only a reject.

use serde_json::Value;

use daybook_shared::{
    ChartEntry, ChartPosition, ContentRecord, DateKey, DaybookError, ForecastDay, Headline,
    Movie, MovieListItem, NewsItem, Result, WeatherReport,
};

use super::SourceBatch;

pub(crate) fn parse_news(json: &Value, date: DateKey) -> Result<SourceBatch> {
    let items = array(json, &["data"])?;
    let mut batch = SourceBatch::default();
    let mut headlines = Vec::new();

    for (i, item) in items.iter().enumerate() {
        match (text(item.get("title")), text(item.get("link"))) {
            (Some(title), Some(link)) => headlines.push(Headline { title, link }),
            _ => batch.reject(format!("news item {i}: missing title or link")),
        }
    }

    if !headlines.is_empty() {
        batch
            .records
            .push(ContentRecord::News(NewsItem { date, headlines }));
    }
    Ok(batch)
}

pub(crate) fn parse_weather(json: &Value, date: DateKey) -> Result<SourceBatch> {
    let days = json
        .pointer("/forecastDaily/days")
        .and_then(Value::as_array)
        .ok_or_else(|| DaybookError::parse("response has no forecastDaily.days"))?;
    let mut batch = SourceBatch::default();
    let mut forecast = Vec::new();

    for (i, day) in days.iter().enumerate() {
        if !day.is_object() {
            batch.reject(format!("forecast day {i}: not an object"));
            continue;
        }
        let daytime = day.get("daytimeForecast");
        let field = |key: &str| daytime.and_then(|d| d.get(key));
        forecast.push(ForecastDay {
            forecast_start: text(day.get("forecastStart")).unwrap_or_default(),
            temperature_max: number(day.get("temperatureMax")),
            temperature_min: number(day.get("temperatureMin")),
            condition: text(field("conditionCode")),
            precipitation_chance: number(field("precipitationChance")),
            precipitation_amount: number(field("precipitationAmount")),
            wind_speed: number(field("windSpeed")),
        });
    }

    if !forecast.is_empty() {
        batch.records.push(ContentRecord::Weather(WeatherReport {
            date,
            days: forecast,
        }));
    }
    Ok(batch)
}

pub(crate) fn parse_movies(json: &Value, date: DateKey) -> Result<SourceBatch> {
    let items = array(json, &["data", "results"])?;
    let mut batch = SourceBatch::default();
    let mut movies = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let Some(title) = text(item.get("title")) else {
            batch.reject(format!("box office item {i}: missing title"));
            continue;
        };
        movies.push(Movie {
            rank: rank(item.get("rank")),
            title,
            gross: text(item.get("gross")),
        });
    }

    if !movies.is_empty() {
        batch
            .records
            .push(ContentRecord::Movies(MovieListItem { date, movies }));
    }
    Ok(batch)
}

pub(crate) fn parse_chart(json: &Value, date: DateKey, chart: &str) -> Result<SourceBatch> {
    let items = array(json, &["entries", "data"])?;
    let mut batch = SourceBatch::default();
    let mut positions = Vec::new();

    for (i, item) in items.iter().enumerate() {
        match (rank(item.get("rank")), text(item.get("title"))) {
            (Some(rank), Some(title)) => positions.push(ChartPosition {
                rank,
                title,
                artist: text(item.get("artist")),
            }),
            _ => batch.reject(format!("chart entry {i}: missing rank or title")),
        }
    }

    if !positions.is_empty() {
        batch.records.push(ContentRecord::Chart(ChartEntry {
            date,
            chart: chart.to_string(),
            positions,
        }));
    }
    Ok(batch)
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// The first of `keys` that holds an array.
fn array<'a>(json: &'a Value, keys: &[&str]) -> Result<&'a Vec<Value>> {
    keys.iter()
        .find_map(|k| json.get(*k).and_then(Value::as_array))
        .ok_or_else(|| DaybookError::parse(format!("response has no {} array", keys.join("/"))))
}

/// A non-empty string, or a number shown as text.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A number, or a string holding one.
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn rank(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|r| u32::try_from(r).ok()),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        _ => None,
    }
}
