//! Formatting of weather API data into Telegram HTML

use chrono::{DateTime, NaiveDate, Timelike, TimeZone};
use std::cmp::Ordering;
use teloxide::utils::html;

use super::api::{AreaMetadata, Forecast24h, Forecast2h, Forecast4d, Range, Wind};
use crate::localization::{t, t_args};

/// Round a time down to a multiple of `step` minutes
pub fn round_down_minutes<Tz: TimeZone>(time: DateTime<Tz>, step: u32) -> DateTime<Tz> {
    let minute = time.minute() - time.minute() % step.max(1);
    time.with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// `2024-03-01T10:10:37+08:00` -> `2024-03-01 10:10`
pub fn format_iso_time(iso: &str) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => iso.to_string(),
    }
}

fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(date) => date.format("%a %d %b").to_string(),
        Err(_) => date.to_string(),
    }
}

fn format_time_of_day(iso: &str) -> String {
    match DateTime::parse_from_rfc3339(iso) {
        Ok(time) => time.format("%a %H:%M").to_string(),
        Err(_) => iso.to_string(),
    }
}

/// Edit distance between two strings, in characters
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Up to `limit` names closest to `query`, best first
pub fn closest_names<'a>(query: &str, names: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<&'a str> {
    let query = query.to_lowercase();
    let mut scored: Vec<(usize, &str)> = names
        .into_iter()
        .map(|name| (levenshtein(&query, &name.to_lowercase()), name))
        .collect();
    scored.sort_by_key(|(distance, _)| *distance);
    scored.into_iter().take(limit).map(|(_, name)| name).collect()
}

/// Indexes of the `limit` areas nearest to a coordinate, nearest first
pub fn nearest_areas(areas: &[AreaMetadata], latitude: f64, longitude: f64, limit: usize) -> Vec<usize> {
    let distance = |area: &AreaMetadata| {
        let dlat = area.label_location.latitude - latitude;
        let dlon = area.label_location.longitude - longitude;
        (dlat * dlat + dlon * dlon).sqrt()
    };

    let mut indexes: Vec<usize> = (0..areas.len()).collect();
    indexes.sort_by(|&a, &b| {
        distance(&areas[a])
            .partial_cmp(&distance(&areas[b]))
            .unwrap_or(Ordering::Equal)
    });
    indexes.truncate(limit);
    indexes
}

fn range_line(key: &str, range: &Range) -> String {
    t_args(key, &[("low", &range.low.to_string()), ("high", &range.high.to_string())])
}

fn wind_line(wind: &Wind) -> String {
    t_args(
        "weather-wind",
        &[
            ("direction", &wind.direction),
            ("low", &wind.speed.low.to_string()),
            ("high", &wind.speed.high.to_string()),
        ],
    )
}

fn header(title: &str, update_timestamp: &str) -> String {
    format!(
        "<b>{}</b>\n{}\n",
        html::escape(title),
        t_args("weather-updated", &[("timestamp", &format_iso_time(update_timestamp))])
    )
}

/// Nowcast for the selected areas
pub fn render_forecast_2h(forecast: &Forecast2h, selected: &[usize]) -> String {
    let mut text = header(&t("weather-forecast2h-title"), &forecast.item.update_timestamp);
    if let Some(period) = &forecast.item.valid_period {
        text.push_str(&t_args(
            "weather-valid-period",
            &[("start", &format_iso_time(&period.start)), ("end", &format_iso_time(&period.end))],
        ));
        text.push('\n');
    }
    text.push('\n');

    for &index in selected {
        let Some(area) = forecast.areas.get(index) else {
            continue;
        };
        let outlook = forecast.forecast_for(&area.name).unwrap_or("-");
        text.push_str(&format!("<b>{}</b>: {}\n", html::escape(&area.name), html::escape(outlook)));
    }

    text
}

/// 24 hour forecast with the per-period outlook of one region
pub fn render_forecast_24h(forecast: &Forecast24h, region: &str) -> String {
    let title = t_args("weather-forecast24h-title", &[("region", region)]);
    let mut text = header(&title, &forecast.update_timestamp);
    text.push_str(&t_args(
        "weather-valid-period",
        &[
            ("start", &format_iso_time(&forecast.valid_period.start)),
            ("end", &format_iso_time(&forecast.valid_period.end)),
        ],
    ));
    text.push_str("\n\n");

    let general = &forecast.general;
    text.push_str(&t_args("weather-general", &[("forecast", &general.forecast)]));
    text.push('\n');
    text.push_str(&range_line("weather-temperature", &general.temperature));
    text.push('\n');
    text.push_str(&range_line("weather-humidity", &general.relative_humidity));
    text.push('\n');
    text.push_str(&wind_line(&general.wind));
    text.push_str("\n\n");

    for period in &forecast.periods {
        let outlook = period.regions.get(region).map(String::as_str).unwrap_or("-");
        text.push_str(&format!(
            "<b>{} - {}</b>: {}\n",
            format_time_of_day(&period.time.start),
            format_time_of_day(&period.time.end),
            html::escape(outlook)
        ));
    }

    text
}

/// Four day outlook
pub fn render_forecast_4d(forecast: &Forecast4d) -> String {
    let mut text = header(&t("weather-forecast4d-title"), &forecast.update_timestamp);

    for day in &forecast.forecasts {
        text.push_str(&format!(
            "\n<b>{}</b>\n{}\n{}\n{}\n{}\n",
            format_date(&day.date),
            html::escape(&day.forecast),
            range_line("weather-temperature", &day.temperature),
            range_line("weather-humidity", &day.relative_humidity),
            wind_line(&day.wind)
        ));
    }

    text
}
