//! The reconciliation pass: drive the account store and the VFS tree
//! towards agreement, in both directions.

use crate::users;
use crate::vfs;
use crate::Context;

/// One full reconciliation pass.
///
/// Passes may be requested concurrently by the timer, the inotify watch,
/// the deferred SIGHUP work and the post-command hook; the context lock
/// keeps at most one in flight. Each step works on data captured at its
/// start, nothing rolls back, and a failed pass is corrected by the next
/// one rather than by transactional recovery.
pub fn reconcile(ctx: &Context) {
    let _gate = ctx
        .sync_gate
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let accounts = match users::interactive_accounts(&ctx.passwd_path) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("uvsh: {e}");
            return;
        }
    };
    let dirs = match vfs::list_entries(&ctx.vfs_root) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("uvsh: {e}");
            return;
        }
    };
    if ctx.debug {
        eprintln!(
            "[sync] pass: {} interactive account(s), {} entry dir(s)",
            accounts.len(),
            dirs.len()
        );
    }

    // An entry directory without a matching account is a request to create
    // one: the VFS is the intended-state source in this direction.
    for name in &dirs {
        if !accounts.iter().any(|a| a.name == *name) {
            if ctx.debug {
                eprintln!("[sync] create account {name}");
            }
            users::create_account(ctx, name);
        }
    }

    // Creations above change the set; re-read before mirroring.
    let accounts = match users::interactive_accounts(&ctx.passwd_path) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("uvsh: {e}");
            return;
        }
    };

    // Mirror every account whose entry is present in the captured listing
    // (which includes the directories that requested creations above).
    // Accounts with no entry are deletion requests, not mirror targets;
    // recreating their directories here would resurrect them on the next
    // pass.
    for account in &accounts {
        if dirs.iter().any(|d| d == &account.name) {
            if let Err(e) = vfs::write_entry(&ctx.vfs_root, account) {
                eprintln!("uvsh: {e}");
            }
        }
    }

    // A missing entry directory is a request to delete the account. The
    // comparison uses the listing captured at the start of the pass.
    for account in &accounts {
        if !dirs.iter().any(|d| d == &account.name) {
            if ctx.debug {
                eprintln!("[sync] delete account {}", account.name);
            }
            users::delete_account(ctx, &account.name);
        }
    }
}
