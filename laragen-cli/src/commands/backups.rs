//! Backup listing command

use crate::writer::{self, format_age, format_size};
use anyhow::Result;
use std::path::Path;

/// List `*.backup.*` copies left by `generate --backup`
pub fn run(project_path: &Path, detailed: bool) -> Result<()> {
    println!("🔍 Looking for backups in {}...", project_path.display());
    println!();

    let backups = writer::list_backups(project_path)?;
    if backups.is_empty() {
        println!("📭 No backups found");
        println!("💡 Backups are created by `laragen generate --force --backup`");
        return Ok(());
    }

    let total: u64 = backups.iter().map(|b| b.size).sum();
    println!("📦 {} backup(s), {}", backups.len(), format_size(total));
    println!();

    for backup in &backups {
        let original = backup
            .original
            .strip_prefix(project_path)
            .unwrap_or(&backup.original);
        println!(
            "  {} ({}, {})",
            original.display(),
            format_age(backup.age),
            format_size(backup.size)
        );
        if detailed {
            println!("     {}", backup.path.display());
        }
    }

    println!();
    println!("⚠️  Backups are manual-restore only");
    println!("💡 To restore: cp <backup> <original>");
    Ok(())
}
