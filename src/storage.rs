//! Submission records on disk.
//!
//! Records are pretty-printed JSON files, one per submission, named so that a
//! lexical sort of the directory is a chronological one.

use crate::model::SubmissionRecord;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Application data directory (also holds the TUI log).
pub fn app_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("no local data directory on this platform")?;
    Ok(base.join("query-submit-cli"))
}

pub fn submissions_dir() -> Result<PathBuf> {
    Ok(app_dir()?.join("submissions"))
}

/// File name for a record: `submission-YYYYMMDD-HHMMSS-<id8>.json`.
pub fn record_file_name(r: &SubmissionRecord) -> String {
    let stamp = OffsetDateTime::parse(&r.timestamp_utc, &Rfc3339)
        .ok()
        .and_then(|t| {
            t.format(format_description!("[year][month][day]-[hour][minute][second]"))
                .ok()
        })
        .unwrap_or_else(|| r.timestamp_utc.replace([':', '.'], "-"));
    format!("submission-{}-{}.json", stamp, r.short_id())
}

pub fn save_record(r: &SubmissionRecord) -> Result<PathBuf> {
    save_record_in(&submissions_dir()?, r)
}

pub fn save_record_in(dir: &Path, r: &SubmissionRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(record_file_name(r));
    export_json(&path, r)?;
    tracing::debug!(path = %path.display(), "submission saved");
    Ok(path)
}

pub fn export_json(path: &Path, r: &SubmissionRecord) -> Result<()> {
    let data = serde_json::to_vec_pretty(r).context("serialize submission record")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Most recent records first.
pub fn load_recent(limit: usize) -> Result<Vec<SubmissionRecord>> {
    load_recent_in(&submissions_dir()?, limit)
}

/// `*.json` files in `dir`, newest name first.
fn record_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths.reverse();
    Ok(paths)
}

fn read_record(p: &Path) -> Result<SubmissionRecord> {
    let raw = std::fs::read(p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parse {}", p.display()))
}

pub fn load_recent_in(dir: &Path, limit: usize) -> Result<Vec<SubmissionRecord>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for p in record_paths(dir)?.into_iter().take(limit) {
        match read_record(&p) {
            Ok(r) => out.push(r),
            Err(e) => tracing::warn!(
                path = %p.display(),
                error = %format!("{e:#}"),
                "skipping unreadable record"
            ),
        }
    }
    Ok(out)
}

pub fn delete_record(r: &SubmissionRecord) -> Result<()> {
    delete_record_in(&submissions_dir()?, r)
}

/// Removes the record's file. Files not named by [`record_file_name`] (copied
/// in by hand, say) are found by matching id and timestamp.
pub fn delete_record_in(dir: &Path, r: &SubmissionRecord) -> Result<()> {
    let named = dir.join(record_file_name(r));
    let path = if named.exists() {
        named
    } else {
        find_record_file(dir, r)?.unwrap_or(named)
    };
    std::fs::remove_file(&path).with_context(|| format!("delete {}", path.display()))
}

fn find_record_file(dir: &Path, r: &SubmissionRecord) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    Ok(record_paths(dir)?.into_iter().find(|p| {
        read_record(p).is_ok_and(|on_disk| {
            on_disk.id == r.id && on_disk.timestamp_utc == r.timestamp_utc
        })
    }))
}
