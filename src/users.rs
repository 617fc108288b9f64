//! Account-store snapshot and the account-management sub-processes.

use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::Context;

/// Login shells that mark an account as non-interactive.
const NOLOGIN_SHELLS: &[&str] = &[
    "/bin/false",
    "/usr/sbin/nologin",
    "/sbin/nologin",
    "/usr/bin/nologin",
    "/bin/nologin",
];

const VERIFY_ATTEMPTS: u32 = 5;
const VERIFY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read account store {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
    pub shell: String,
}

/// One passwd line: name:pw:uid:gid:gecos:home:shell. Malformed lines are
/// skipped rather than failing the whole read.
fn parse_line(line: &str) -> Option<Account> {
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < 7 {
        return None;
    }
    Some(Account {
        name: fields[0].to_string(),
        uid: fields[2].parse().ok()?,
        gid: fields[3].parse().ok()?,
        home: fields[5].to_string(),
        shell: fields[6].to_string(),
    })
}

fn read_store(path: &Path) -> Result<Vec<Account>, StoreError> {
    let data = std::fs::read_to_string(path).map_err(|source| StoreError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    Ok(data.lines().filter_map(parse_line).collect())
}

pub fn is_interactive(account: &Account) -> bool {
    !account.shell.is_empty() && !NOLOGIN_SHELLS.contains(&account.shell.as_str())
}

/// Full un-cached read of the account store, in store order, with
/// non-interactive accounts filtered out. Pure read, no caching across
/// calls.
pub fn interactive_accounts(path: &Path) -> Result<Vec<Account>, StoreError> {
    Ok(read_store(path)?.into_iter().filter(is_interactive).collect())
}

/// Existence check against the full store, interactive or not. This is the
/// only success signal trusted after an account-management tool runs.
pub fn account_exists(path: &Path, name: &str) -> bool {
    match read_store(path) {
        Ok(accounts) => accounts.iter().any(|a| a.name == name),
        Err(e) => {
            eprintln!("uvsh: {e}");
            false
        }
    }
}

fn run_tool(tool: &str, name: &str) -> bool {
    // The tool's exit status is not authoritative; callers re-query the
    // store instead.
    match Command::new(tool).arg(name).status() {
        Ok(_) => true,
        Err(e) => {
            eprintln!("uvsh: cannot run {tool} {name}: {e}");
            false
        }
    }
}

/// Ask the configured tool to create `name`, then poll the store until the
/// account shows up. Exhausted retries are logged, never fatal; the next
/// reconciliation pass tries again.
pub fn create_account(ctx: &Context, name: &str) -> bool {
    if !run_tool(&ctx.useradd_bin, name) {
        return false;
    }
    for _ in 0..VERIFY_ATTEMPTS {
        if account_exists(&ctx.passwd_path, name) {
            return true;
        }
        thread::sleep(VERIFY_DELAY);
    }
    eprintln!(
        "uvsh: account {name} still missing after {}",
        ctx.useradd_bin
    );
    false
}

/// Counterpart of [`create_account`]: delete `name` and poll the store for
/// its disappearance.
pub fn delete_account(ctx: &Context, name: &str) -> bool {
    if !run_tool(&ctx.userdel_bin, name) {
        return false;
    }
    for _ in 0..VERIFY_ATTEMPTS {
        if !account_exists(&ctx.passwd_path, name) {
            return true;
        }
        thread::sleep(VERIFY_DELAY);
    }
    eprintln!(
        "uvsh: account {name} still present after {}",
        ctx.userdel_bin
    );
    false
}
