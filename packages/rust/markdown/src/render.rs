//! Per-variant block bodies.
//!
//! Every body line starts with `- `, `  ` or `> `, so no rendered content can
//! ever be mistaken for a marker line by the scanner.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use daybook_shared::{
    ChartEntry, ContentRecord, DaybookError, ForecastDay, MovieListItem, MusicPlay, NewsItem,
    Result, Review, StreamingView, WeatherReport,
};

/// Render the body lines of a record, each terminated by a newline.
pub(crate) fn body(record: &ContentRecord) -> Result<String> {
    match record {
        ContentRecord::News(news) => news_body(news),
        ContentRecord::Weather(report) => weather_body(report),
        ContentRecord::Movies(list) => movies_body(list),
        ContentRecord::Chart(chart) => chart_body(chart),
        ContentRecord::Music(play) => music_body(play),
        ContentRecord::Streaming(view) => streaming_body(view),
        ContentRecord::Review(review) => review_body(review),
    }
}

fn news_body(news: &NewsItem) -> Result<String> {
    let mut out = String::new();
    for headline in &news.headlines {
        let title = inline(&headline.title);
        let link = single_line(&headline.link);
        if title.is_empty() || link.is_empty() {
            continue;
        }
        let link = link.replace(' ', "%20").replace(')', "%29");
        let _ = writeln!(out, "- [{title}]({link})");
    }
    non_empty(out, "news snapshot has no headlines")
}

fn weather_body(report: &WeatherReport) -> Result<String> {
    let mut out = String::new();
    for day in &report.days {
        let _ = writeln!(out, "- {}", forecast_line(day));
    }
    non_empty(out, "weather report has no forecast days")
}

fn forecast_line(day: &ForecastDay) -> String {
    let label = forecast_label(&day.forecast_start);
    let mut parts = Vec::new();

    if let Some(condition) = day.condition.as_deref().map(inline).filter(|c| !c.is_empty()) {
        parts.push(condition);
    }
    match (day.temperature_min, day.temperature_max) {
        (Some(lo), Some(hi)) => parts.push(format!("{lo:.1}–{hi:.1} °C")),
        (None, Some(hi)) => parts.push(format!("high {hi:.1} °C")),
        (Some(lo), None) => parts.push(format!("low {lo:.1} °C")),
        (None, None) => {}
    }
    if let Some(chance) = day.precipitation_chance {
        // Reported as a 0..1 fraction.
        let percent = chance * 100.0;
        let mut precip = format!("precipitation {percent:.0}%");
        if let Some(amount) = day.precipitation_amount.filter(|a| *a > 0.0) {
            let _ = write!(precip, " ({amount:.1} mm)");
        }
        parts.push(precip);
    }
    if let Some(wind) = day.wind_speed {
        parts.push(format!("wind {wind:.1} km/h"));
    }

    if parts.is_empty() {
        format!("**{label}**")
    } else {
        format!("**{label}**: {}", parts.join(", "))
    }
}

/// `2025-04-26T06:00:00Z` → `2025-04-26`; anything else is shown as-is.
fn forecast_label(start: &str) -> String {
    let start = single_line(start);
    match start.get(..10) {
        Some(day) if daybook_shared::DateKey::parse_strict(day).is_some() => day.to_string(),
        _ if start.is_empty() => "Forecast".to_string(),
        _ => inline(&start),
    }
}

fn movies_body(list: &MovieListItem) -> Result<String> {
    let mut out = String::new();
    for movie in &list.movies {
        let title = inline(&movie.title);
        if title.is_empty() {
            continue;
        }
        let rank = movie.rank.map(|r| format!("{r}. ")).unwrap_or_default();
        match movie.gross.as_deref().map(inline).filter(|g| !g.is_empty()) {
            Some(gross) => {
                let _ = writeln!(out, "- {rank}{title} ({gross})");
            }
            None => {
                let _ = writeln!(out, "- {rank}{title}");
            }
        }
    }
    non_empty(out, "box office list has no titles")
}

fn chart_body(chart: &ChartEntry) -> Result<String> {
    let name = inline(&chart.chart);
    if name.is_empty() {
        return Err(DaybookError::Format("chart has no name".into()));
    }
    let mut rows = String::new();
    for position in &chart.positions {
        let title = inline(&position.title);
        if title.is_empty() {
            continue;
        }
        match position.artist.as_deref().map(inline).filter(|a| !a.is_empty()) {
            Some(artist) => {
                let _ = writeln!(rows, "  {}. {title} by {artist}", position.rank);
            }
            None => {
                let _ = writeln!(rows, "  {}. {title}", position.rank);
            }
        }
    }
    let rows = non_empty(rows, "chart has no entries")?;
    Ok(format!("- **{name}**\n{rows}"))
}

fn music_body(play: &MusicPlay) -> Result<String> {
    let track = inline(&play.track);
    if track.is_empty() {
        return Err(DaybookError::Format("music play has no track name".into()));
    }
    let time = play.played_at.format("%H:%M");
    let artist = inline(&play.artist);
    if artist.is_empty() {
        Ok(format!("- {time} **{track}**\n"))
    } else {
        Ok(format!("- {time} **{track}** by {artist}\n"))
    }
}

fn streaming_body(view: &StreamingView) -> Result<String> {
    let title = inline(&view.title);
    if title.is_empty() {
        return Err(DaybookError::Format("viewing has no title".into()));
    }
    match view.watched_at {
        Some(time) => Ok(format!("- {} {title}\n", time.format("%H:%M"))),
        None => Ok(format!("- {title}\n")),
    }
}

fn review_body(review: &Review) -> Result<String> {
    let business = inline(&review.business);
    if business.is_empty() {
        return Err(DaybookError::Format("review has no business name".into()));
    }
    if review.review_id.trim().is_empty() {
        return Err(DaybookError::Format("review has no identifier".into()));
    }

    let mut out = format!("- **{business}**");
    if let Some(rating) = review.rating {
        let _ = write!(out, " ★ {rating:.1}");
    }
    let _ = writeln!(out, " ({})", time_label(&review.reviewed_at));

    for line in review.body.trim().lines() {
        let line = escape_inline(line.trim_end());
        if line.is_empty() {
            out.push_str("  >\n");
        } else {
            let _ = writeln!(out, "  > {line}");
        }
    }
    Ok(out)
}

fn time_label(at: &NaiveDateTime) -> String {
    at.format("%H:%M").to_string()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty(out: String, what: &str) -> Result<String> {
    if out.is_empty() {
        Err(DaybookError::Format(what.to_string()))
    } else {
        Ok(out)
    }
}

/// Collapse all whitespace runs (newlines included) into single spaces.
fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A single-line, Markdown-escaped field.
fn inline(s: &str) -> String {
    escape_inline(&single_line(s))
}

/// Escape characters that would change inline Markdown structure.
fn escape_inline(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
