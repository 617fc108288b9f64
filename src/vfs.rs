//! The on-disk VFS tree: one directory per interactive account, holding the
//! `id`, `home` and `shell` metadata files.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::users::Account;

pub fn ensure_root(root: &Path) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("cannot create VFS root {}", root.display()))
}

/// Immediate subdirectory names of the VFS root. Regular files are not
/// entries and are ignored.
pub fn list_entries(root: &Path) -> Result<Vec<String>> {
    let dir =
        fs::read_dir(root).with_context(|| format!("cannot list VFS root {}", root.display()))?;
    let mut names = Vec::new();
    for entry in dir {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Create the account's directory if missing and rewrite its metadata files
/// in full, even when unchanged. No partial updates.
pub fn write_entry(root: &Path, account: &Account) -> Result<()> {
    let dir = root.join(&account.name);
    if !dir.is_dir() {
        fs::create_dir(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    fs::write(dir.join("id"), format!("{}\n", account.uid))
        .with_context(|| format!("cannot write {}/id", dir.display()))?;
    fs::write(dir.join("home"), format!("{}\n", account.home))
        .with_context(|| format!("cannot write {}/home", dir.display()))?;
    fs::write(dir.join("shell"), format!("{}\n", account.shell))
        .with_context(|| format!("cannot write {}/shell", dir.display()))?;
    Ok(())
}
