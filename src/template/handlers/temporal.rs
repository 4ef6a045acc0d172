//! Clock and chance: `<date>`, `<interval>`, `<random>`.
//!
//! The clock is [`EngineConfig::reference_time`](crate::EngineConfig) when
//! set, local time otherwise. All three tags make the evaluation uncacheable.

use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, empty, text};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Local, NaiveDateTime, Utc};
use chrono_english::{Dialect, parse_date_string};
use rand::seq::SliceRandom;
use std::fmt::Write;

pub(crate) const DEFAULT_DATE_FORMAT: &str = "%B %d, %Y";

pub(crate) struct TemporalHandler;

impl TagHandler for TemporalHandler {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["date", "interval", "random"]
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        rt.ctx.volatile = true;
        match el.name.as_str() {
            "date" => {
                let format = rt.attr(&el, "format").unwrap_or_default();
                text(format_date(now(rt), &format))
            }
            "interval" => interval(&el, rt),
            _ => random(&el, rt),
        }
    }
}

fn now(rt: &Runtime<'_, '_>) -> NaiveDateTime {
    rt.engine.config().reference_time.unwrap_or_else(|| Local::now().naive_local())
}

/// Format with a strftime pattern; an empty or malformed pattern falls back
/// to [`DEFAULT_DATE_FORMAT`].
pub(crate) fn format_date(at: NaiveDateTime, format: &str) -> String {
    let valid = !format.trim().is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    let format = if valid { format } else { DEFAULT_DATE_FORMAT };
    // Zone specifiers parse fine but cannot render for a naive time.
    let mut out = String::new();
    if write!(out, "{}", at.format(format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", at.format(DEFAULT_DATE_FORMAT));
    }
    out
}

/// `<interval style="days"><from>..</from><to>..</to></interval>`. A missing
/// `to` means now; an unparseable date yields `unknown`.
fn interval(el: &Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
    let style = rt.attr(el, "style").unwrap_or_else(|| "days".to_string());
    let reference = now(rt).and_utc();
    let from = rt.attr(el, "from");
    let to = rt.attr(el, "to");

    let parse = |s: Option<String>| match s.filter(|s| !s.trim().is_empty()) {
        None => Some(reference),
        Some(s) => parse_date_string(s.trim(), reference, Dialect::Us).ok(),
    };
    match (parse(from), parse(to)) {
        (Some(from), Some(to)) => text(span(from, to, &style).map_or_else(|| "unknown".to_string(), |n| n.to_string())),
        _ => {
            tracing::debug!(style = style.as_str(), "interval with unparseable date");
            text("unknown")
        }
    }
}

/// Whole units between `from` and `to`, negative when `to` is earlier.
pub(crate) fn span(from: DateTime<Utc>, to: DateTime<Utc>, style: &str) -> Option<i64> {
    let delta = to - from;
    let n = match style.trim().to_ascii_lowercase().as_str() {
        "seconds" => delta.num_seconds(),
        "minutes" => delta.num_minutes(),
        "hours" => delta.num_hours(),
        "days" => delta.num_days(),
        "weeks" => delta.num_weeks(),
        "months" => months_between(from, to),
        "years" => months_between(from, to) / 12,
        _ => return None,
    };
    Some(n)
}

fn months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let (earlier, later, sign) = if to >= from { (from, to, 1) } else { (to, from, -1) };
    let mut months =
        (later.year() as i64 - earlier.year() as i64) * 12 + later.month() as i64 - earlier.month() as i64;
    if (later.day(), later.time()) < (earlier.day(), earlier.time()) {
        months -= 1;
    }
    sign * months
}

fn random(el: &Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
    let options: Vec<&Element> = el.elements("li").collect();
    match options.choose(&mut rt.ctx.rng) {
        Some(li) => text(rt.content(li)),
        None => empty(),
    }
}
