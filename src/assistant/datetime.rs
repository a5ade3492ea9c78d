//! French natural-language date/time extraction.
//!
//! Recognised date forms: `aujourd'hui`, `demain`, `après-demain`, weekdays
//! (optionally followed by `prochain`), `dans N jours|semaines`, `12/03`,
//! `12/03/2026`, `2026-03-12`, `12 mars`, `1er mai 2027`.
//! Recognised times: `15h`, `15h30`, `15 h 30`, `15:30`, `midi`.
//!
//! A date and a time form one mention when only connector words (`à`,
//! `vers`, `le`, `de`, commas) separate them, in either order. A time with
//! no date is taken as today. Dates without a year that already passed this
//! year roll over to next year. A written date that does not exist on the
//! calendar (`31/02`) fails the whole extraction.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::{Captures, Regex};
use thiserror::Error;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?P<rel>aujourd['’]hui|apr[eè]s-demain|demain)\b",
        r"|\bdans\s+(?P<count>\d{1,3})\s+(?P<unit>jours?|semaines?)\b",
        r"|\b(?P<iy>\d{4})-(?P<im>\d{1,2})-(?P<id>\d{1,2})\b",
        r"|\b(?P<nd>\d{1,2})/(?P<nm>\d{1,2})(?:/(?P<ny>\d{4}))?\b",
        r"|\b(?P<td>1er|\d{1,2})\s+(?P<tm>janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[ée]cembre)(?:\s+(?P<ty>\d{4}))?\b",
        r"|\b(?P<wd>lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche)(?:\s+prochain)?\b",
    ))
    .expect("Invalid date pattern")
});

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?P<h>[01]?\d|2[0-3])\s?h(?:eures?)?(?:\s?(?P<m>[0-5]\d))?\b",
        r"|\b(?P<ch>[01]?\d|2[0-3]):(?P<cm>[0-5]\d)\b",
        r"|\b(?P<noon>midi)\b",
    ))
    .expect("Invalid time pattern")
});

/// Words allowed between a date and the time that belongs to it.
const CONNECTORS: &[&str] = &["à", "a", "vers", "le", "de", "dès", "des"];

/// A written date with no calendar counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Date does not exist: {0}")]
pub struct InvalidDate(pub String);

/// One date/time found in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeMention {
    /// Byte offset of the first token of the mention.
    pub offset: usize,
    pub date: NaiveDate,
    /// `false` when `date` is today because the text only gave a time.
    pub dated: bool,
    /// `None` when the text named a date but no time.
    pub time: Option<NaiveTime>,
}

impl DateTimeMention {
    pub fn time_or(&self, default: NaiveTime) -> NaiveTime {
        self.time.unwrap_or(default)
    }
}

enum Token {
    Date(NaiveDate),
    Time(NaiveTime),
}

struct Partial {
    offset: usize,
    end: usize,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
}

impl Partial {
    fn new(offset: usize, end: usize, token: Token) -> Self {
        let (date, time) = match token {
            Token::Date(date) => (Some(date), None),
            Token::Time(time) => (None, Some(time)),
        };
        Self {
            offset,
            end,
            date,
            time,
        }
    }

    /// Absorb `token` if its slot is free and only connectors lie between.
    /// Hands the token back otherwise.
    fn absorb(&mut self, text: &str, start: usize, end: usize, token: Token) -> Option<Token> {
        let joined = text.get(self.end..start).is_some_and(is_connector_gap);
        match token {
            Token::Date(date) if joined && self.date.is_none() => self.date = Some(date),
            Token::Time(time) if joined && self.time.is_none() => self.time = Some(time),
            other => return Some(other),
        }
        self.end = end;
        None
    }
}

fn is_connector_gap(gap: &str) -> bool {
    gap.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|word| !word.is_empty())
        .all(|word| CONNECTORS.contains(&word.to_lowercase().as_str()))
}

/// Every date/time mention in `text`, ordered by position, relative to `now`.
pub fn extract(text: &str, now: NaiveDateTime) -> Result<Vec<DateTimeMention>, InvalidDate> {
    let today = now.date();

    let mut tokens: Vec<(usize, usize, Token)> = Vec::new();
    for caps in DATE_PATTERN.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let date = resolve_date(&caps, today)
            .ok_or_else(|| InvalidDate(whole.as_str().to_string()))?;
        tokens.push((whole.start(), whole.end(), Token::Date(date)));
    }
    tokens.extend(TIME_PATTERN.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        resolve_time(&caps).map(|time| (whole.start(), whole.end(), Token::Time(time)))
    }));
    tokens.sort_by_key(|(start, _, _)| *start);

    let mut mentions = Vec::new();
    let mut pending: Option<Partial> = None;

    for (start, end, token) in tokens {
        let leftover = match pending.as_mut() {
            Some(partial) => partial.absorb(text, start, end, token),
            None => Some(token),
        };
        if let Some(token) = leftover {
            flush(&mut mentions, pending.take(), today);
            pending = Some(Partial::new(start, end, token));
        }
    }
    flush(&mut mentions, pending, today);

    Ok(mentions)
}

fn flush(mentions: &mut Vec<DateTimeMention>, partial: Option<Partial>, today: NaiveDate) {
    if let Some(partial) = partial {
        mentions.push(DateTimeMention {
            offset: partial.offset,
            date: partial.date.unwrap_or(today),
            dated: partial.date.is_some(),
            time: partial.time,
        });
    }
}

fn resolve_date(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(rel) = caps.name("rel") {
        let rel = rel.as_str().to_lowercase();
        let days = if rel.starts_with("aujourd") {
            0
        } else if rel.starts_with("apr") {
            2
        } else {
            1
        };
        return today.checked_add_signed(Duration::days(days));
    }

    if let (Some(count), Some(unit)) = (caps.name("count"), caps.name("unit")) {
        let count: i64 = count.as_str().parse().ok()?;
        let days = if unit.as_str().to_lowercase().starts_with("semaine") {
            count * 7
        } else {
            count
        };
        return today.checked_add_signed(Duration::days(days));
    }

    if let (Some(y), Some(m), Some(d)) = (caps.name("iy"), caps.name("im"), caps.name("id")) {
        return NaiveDate::from_ymd_opt(
            y.as_str().parse().ok()?,
            m.as_str().parse().ok()?,
            d.as_str().parse().ok()?,
        );
    }

    if let (Some(d), Some(m)) = (caps.name("nd"), caps.name("nm")) {
        let day: u32 = d.as_str().parse().ok()?;
        let month: u32 = m.as_str().parse().ok()?;
        return match caps.name("ny") {
            Some(y) => NaiveDate::from_ymd_opt(y.as_str().parse().ok()?, month, day),
            None => upcoming(today, month, day),
        };
    }

    if let (Some(d), Some(m)) = (caps.name("td"), caps.name("tm")) {
        let day: u32 = d.as_str().trim_end_matches("er").parse().ok()?;
        let month = french_month(&m.as_str().to_lowercase())?;
        return match caps.name("ty") {
            Some(y) => NaiveDate::from_ymd_opt(y.as_str().parse().ok()?, month, day),
            None => upcoming(today, month, day),
        };
    }

    let weekday = french_weekday(&caps.name("wd")?.as_str().to_lowercase())?;
    Some(next_weekday(today, weekday))
}

fn resolve_time(caps: &Captures<'_>) -> Option<NaiveTime> {
    if caps.name("noon").is_some() {
        return NaiveTime::from_hms_opt(12, 0, 0);
    }
    let (hour, minute) = match (caps.name("h"), caps.name("ch")) {
        (Some(h), _) => (h, caps.name("m")),
        (None, Some(h)) => (h, caps.name("cm")),
        (None, None) => return None,
    };
    let hour: u32 = hour.as_str().parse().ok()?;
    let minute: u32 = match minute {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// This year's `day/month`, or next year's if it already passed.
fn upcoming(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    match NaiveDate::from_ymd_opt(today.year(), month, day) {
        Some(date) if date >= today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

/// Next occurrence strictly after today.
fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let ahead = match (target - current).rem_euclid(7) {
        0 => 7,
        n => n,
    };
    today + Duration::days(ahead)
}

fn french_month(name: &str) -> Option<u32> {
    let month = match name {
        "janvier" => 1,
        "février" | "fevrier" => 2,
        "mars" => 3,
        "avril" => 4,
        "mai" => 5,
        "juin" => 6,
        "juillet" => 7,
        "août" | "aout" => 8,
        "septembre" => 9,
        "octobre" => 10,
        "novembre" => 11,
        "décembre" | "decembre" => 12,
        _ => return None,
    };
    Some(month)
}

fn french_weekday(name: &str) -> Option<Weekday> {
    let weekday = match name {
        "lundi" => Weekday::Mon,
        "mardi" => Weekday::Tue,
        "mercredi" => Weekday::Wed,
        "jeudi" => Weekday::Thu,
        "vendredi" => Weekday::Fri,
        "samedi" => Weekday::Sat,
        "dimanche" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}
