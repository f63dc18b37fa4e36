//! Terminal rendering for CLI commands.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::registrant::Registrant;
use crate::storage::StorageStats;

use super::OutputFormat;

/// Render registrants in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn registrants(list: &[Registrant], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(list)?),
        OutputFormat::Plain => Ok(list
            .iter()
            .map(|r| {
                format!(
                    "{}\t{}\t{}\t{}\t{}\n",
                    r.id,
                    r.name,
                    r.email,
                    r.phone,
                    r.department.display_name()
                )
            })
            .collect()),
        OutputFormat::Table => Ok(table(list)),
    }
}

fn table(list: &[Registrant]) -> String {
    let headers = ["ID", "Name", "Email", "Phone", "Department", "Registered"];
    let rows: Vec<[String; 6]> = list
        .iter()
        .map(|r| {
            [
                r.id.to_string(),
                r.name.clone(),
                r.email.clone(),
                r.phone.to_string(),
                r.department.display_name().to_string(),
                r.registered_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &headers.map(String::from), &widths);
    push_row(&mut out, &widths.map(|w| "-".repeat(w)), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    let _ = writeln!(out, "({} registrants)", rows.len());
    out
}

fn push_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

/// Render database status.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn status(database: &Path, stats: &StorageStats, json: bool) -> Result<String> {
    if json {
        let value = serde_json::json!({
            "database_path": database,
            "total_registrants": stats.total_registrants,
            "last_id": stats.last_id,
            "latest_registration": stats.latest_registration,
            "db_size_bytes": stats.db_size_bytes,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "registrar status");
    let _ = writeln!(out, "----------------");
    let _ = writeln!(out, "Database:      {}", database.display());
    let _ = writeln!(out, "Registrants:   {}", stats.total_registrants);
    let _ = writeln!(
        out,
        "Last ID:       {}",
        stats.last_id.map_or_else(|| "-".to_string(), |id| id.to_string())
    );
    let _ = writeln!(
        out,
        "Latest:        {}",
        stats
            .latest_registration
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
    );
    let _ = writeln!(out, "Size:          {} bytes", stats.db_size_bytes);
    Ok(out)
}
