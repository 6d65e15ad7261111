//! Writing generated files, with skip / overwrite / backup / dry-run handling

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Marker between a file name and its backup timestamp
pub const BACKUP_MARKER: &str = ".backup.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    Created,
    Overwritten,
    Skipped(String),
    DryRun,
}

impl WriteStatus {
    pub fn label(&self) -> &'static str {
        match self {
            WriteStatus::Created => "created",
            WriteStatus::Overwritten => "overwritten",
            WriteStatus::Skipped(_) => "skipped",
            WriteStatus::DryRun => "dry-run",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub existed: bool,
    pub status: WriteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    pub bytes: usize,
}

pub struct FileWriter {
    base_path: PathBuf,
    force: bool,
    dry_run: bool,
    backup: bool,
}

impl FileWriter {
    pub fn new(base_path: impl Into<PathBuf>, force: bool, dry_run: bool, backup: bool) -> Self {
        Self {
            base_path: base_path.into(),
            force,
            dry_run,
            backup,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Write `content` to `relative_path` below the base path
    pub fn write(&self, relative_path: &Path, content: &str) -> Result<WriteOutcome> {
        let path = self.base_path.join(relative_path);
        let existed = path.exists();

        let mut outcome = WriteOutcome {
            path: path.clone(),
            relative_path: relative_path.to_path_buf(),
            existed,
            status: WriteStatus::DryRun,
            backup_path: None,
            bytes: content.len(),
        };

        if existed && !self.force {
            outcome.status = WriteStatus::Skipped("already exists".to_string());
            return Ok(outcome);
        }
        if self.dry_run {
            return Ok(outcome);
        }

        if existed && self.backup {
            outcome.backup_path = Some(backup_file(&path)?);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

        outcome.status = if existed {
            WriteStatus::Overwritten
        } else {
            WriteStatus::Created
        };
        Ok(outcome)
    }
}

/// Copy `path` to `{path}.backup.{YYYYmmddHHMMSS}` and return the copy's path.
/// A `-{n}` counter is appended when a backup from the same second exists.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d%H%M%S").to_string();
    let backup_path = |sequence: u32| {
        let mut backup = path.as_os_str().to_owned();
        backup.push(BACKUP_MARKER);
        backup.push(&timestamp);
        if sequence > 0 {
            backup.push(format!("-{}", sequence));
        }
        PathBuf::from(backup)
    };

    let mut sequence = 0;
    let mut backup = backup_path(sequence);
    while backup.exists() {
        sequence += 1;
        backup = backup_path(sequence);
    }

    fs::copy(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    log::debug!("Backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupFile {
    pub path: PathBuf,
    pub original: PathBuf,
    pub timestamp: String,
    /// Counter for backups taken within the same second
    pub sequence: u32,
    pub size: u64,
    #[serde(skip)]
    pub age: Duration,
}

/// All `*.backup.*` files below `root`, newest first
pub fn list_backups(root: &Path) -> Result<Vec<BackupFile>> {
    let mut backups = Vec::new();
    if !root.exists() {
        return Ok(backups);
    }

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let Some(pos) = name.rfind(BACKUP_MARKER) else {
            continue;
        };
        let Some((timestamp, sequence)) = parse_backup_suffix(&name[pos + BACKUP_MARKER.len()..])
        else {
            continue;
        };

        let metadata = entry.metadata()?;
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| m.elapsed().ok())
            .unwrap_or_default();

        backups.push(BackupFile {
            path: entry.path().to_path_buf(),
            original: entry.path().with_file_name(&name[..pos]),
            timestamp,
            sequence,
            size: metadata.len(),
            age,
        });
    }

    backups.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.sequence.cmp(&a.sequence))
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(backups)
}

/// `20260101120000` or `20260101120000-2`
fn parse_backup_suffix(suffix: &str) -> Option<(String, u32)> {
    let (timestamp, sequence) = match suffix.split_once('-') {
        Some((timestamp, sequence)) => (timestamp, sequence.parse().ok()?),
        None => (suffix, 0),
    };
    if timestamp.len() != 14 || !timestamp.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((timestamp.to_string(), sequence))
}

/// Format file size for display
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration for display
pub fn format_age(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{} minutes ago", secs / 60)
    } else if secs < 86400 {
        format!("{} hours ago", secs / 3600)
    } else {
        format!("{} days ago", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MODEL: &str = "app/Models/User.php";

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let writer = FileWriter::new(dir.path(), false, false, false);

        let outcome = writer.write(Path::new(MODEL), "<?php\n").unwrap();
        assert_eq!(outcome.status, WriteStatus::Created);
        assert!(!outcome.existed);
        assert_eq!(fs::read_to_string(dir.path().join(MODEL)).unwrap(), "<?php\n");
    }

    #[test]
    fn test_existing_file_is_skipped_without_force() {
        let dir = TempDir::new().unwrap();
        FileWriter::new(dir.path(), false, false, false)
            .write(Path::new(MODEL), "old")
            .unwrap();

        let outcome = FileWriter::new(dir.path(), false, false, false)
            .write(Path::new(MODEL), "new")
            .unwrap();
        assert_eq!(outcome.status, WriteStatus::Skipped("already exists".to_string()));
        assert_eq!(fs::read_to_string(dir.path().join(MODEL)).unwrap(), "old");
    }

    #[test]
    fn test_force_with_backup() {
        let dir = TempDir::new().unwrap();
        FileWriter::new(dir.path(), false, false, false)
            .write(Path::new(MODEL), "old")
            .unwrap();

        let outcome = FileWriter::new(dir.path(), true, false, true)
            .write(Path::new(MODEL), "new")
            .unwrap();
        assert_eq!(outcome.status, WriteStatus::Overwritten);

        let backup = outcome.backup_path.unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old");
        assert_eq!(fs::read_to_string(dir.path().join(MODEL)).unwrap(), "new");

        let backups = list_backups(dir.path()).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].path, backup);
        assert_eq!(backups[0].original, dir.path().join(MODEL));
    }

    #[test]
    fn test_backups_in_same_second_are_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("User.php");

        fs::write(&path, "first").unwrap();
        let first = backup_file(&path).unwrap();
        fs::write(&path, "second").unwrap();
        let second = backup_file(&path).unwrap();
        fs::write(&path, "third").unwrap();
        let third = backup_file(&path).unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(fs::read_to_string(&first).unwrap(), "first");
        assert_eq!(fs::read_to_string(&second).unwrap(), "second");
        assert_eq!(fs::read_to_string(&third).unwrap(), "third");

        let backups = list_backups(dir.path()).unwrap();
        assert_eq!(backups.len(), 3);
        assert!(backups.iter().all(|b| b.original == path));
    }

    #[test]
    fn test_parse_backup_suffix() {
        assert_eq!(
            parse_backup_suffix("20260101120000"),
            Some(("20260101120000".to_string(), 0))
        );
        assert_eq!(
            parse_backup_suffix("20260101120000-2"),
            Some(("20260101120000".to_string(), 2))
        );
        assert_eq!(parse_backup_suffix("2026"), None);
        assert_eq!(parse_backup_suffix("20260101120000-x"), None);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let writer = FileWriter::new(dir.path(), true, true, true);

        let outcome = writer.write(Path::new(MODEL), "<?php\n").unwrap();
        assert_eq!(outcome.status, WriteStatus::DryRun);
        assert!(!dir.path().join("app").exists());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_age(Duration::from_secs(7200)), "2 hours ago");
    }
}
