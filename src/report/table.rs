//! Fixed-width rendering of fleet summaries.

use std::fmt::Display;
use std::io::{self, Write};

use chrono::{DateTime, TimeZone};

use super::InstanceSummary;
use crate::repository::InfoRecord;

const TABLE_WIDTH: usize = 111;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn table_line() -> String {
    format!("+{}+", "-".repeat(TABLE_WIDTH))
}

/// Writes the summary table, one row per instance, in the given order.
///
/// Sync times are rendered in `tz`.
///
/// # Errors
///
/// Returns any I/O error raised by `out`.
pub fn render_table<Tz>(
    mut out: impl Write,
    summaries: &[InstanceSummary],
    tz: &Tz,
) -> io::Result<()>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let line = table_line();
    writeln!(out)?;
    writeln!(out, "{line}")?;
    writeln!(
        out,
        "|{:^42}|{:^12}|{:^21}|{:^13}|{:^6}|{:^12}|",
        "instance", "subtype", "last sync time", "status", "logs", "size"
    )?;
    writeln!(out, "{line}")?;
    for summary in summaries {
        let info = &summary.info;
        writeln!(
            out,
            "|{:^42}|{:^12}| {:<19} |{:^13}|{:>5} |{:>11} |",
            info.instance,
            info.subtype,
            sync_time_label(info.sync_time, tz),
            info.sync_status.label(),
            summary.evidence_count,
            summary.total_size_label(),
        )?;
    }
    writeln!(out, "{line}")?;
    writeln!(out)
}

/// Writes the full `info` record of a single instance as pretty JSON.
///
/// # Errors
///
/// Returns any I/O error raised by `out`, or a serialisation failure wrapped
/// as [`io::ErrorKind::InvalidData`].
pub fn render_detail(mut out: impl Write, info: &InfoRecord) -> io::Result<()> {
    let rendered = serde_json::to_string_pretty(info)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    writeln!(out, "{rendered}")?;
    writeln!(out)
}

fn sync_time_label<Tz>(sync_time: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp(sync_time, 0).map_or_else(
        || sync_time.to_string(),
        |utc| utc.with_timezone(tz).format(TIME_FORMAT).to_string(),
    )
}
