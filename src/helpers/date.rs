//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, TimeZone};

/// Format a publication date for display
///
/// A missing date formats to an empty string. The result only depends on the
/// inputs, so formatting the same timestamp always yields the same text.
///
/// # Examples
/// ```ignore
/// format_publication_date(Some(&date), "DD MMM YYYY", "pt-BR", chrono_tz::UTC) // -> "25 mar 2021"
/// ```
pub fn format_publication_date<Tz: TimeZone>(
    date: Option<&DateTime<FixedOffset>>,
    format: &str,
    language: &str,
    tz: Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match date {
        Some(date) => format_date(&date.with_timezone(&tz), format, language),
        None => String::new(),
    }
}

/// Format a date using a Moment.js-compatible format string in the given language
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY-MM-DD", "en") // -> "2024-01-15"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, language: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let chrono_format = moment_to_chrono_format(format);
    date.format_localized(&chrono_format, locale_for(language))
        .to_string()
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

/// Parse a CMS timestamp such as `2021-03-25T19:25:28+0000`
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .map_err(|e| tracing::debug!("Unparseable timestamp {:?}: {}", value, e))
        .ok()
}

/// Map a language tag like `pt-BR` to a chrono locale
fn locale_for(language: &str) -> Locale {
    let normalized = language.replace('-', "_");
    Locale::try_from(normalized.as_str())
        .or_else(|_| Locale::try_from(default_region(&normalized)))
        .unwrap_or(Locale::POSIX)
}

fn default_region(language: &str) -> &'static str {
    match language {
        "pt" => "pt_BR",
        "en" => "en_US",
        "es" => "es_ES",
        "fr" => "fr_FR",
        "de" => "de_DE",
        "zh" | "zh_CN" => "zh_CN",
        _ => "POSIX",
    }
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each category
    let replacements = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("hh", "%I"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("ZZ", "%z"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
