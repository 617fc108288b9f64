//! Background trigger loop: periodic timer, inotify watch on the VFS root
//! and the deferred SIGHUP work, all funneled into the same reconciliation
//! entry point.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify};

use crate::sync::reconcile;
use crate::{take_reload_request, Context};

const TICK: Duration = Duration::from_millis(100);
const SYNC_INTERVAL: Duration = Duration::from_secs(1);

fn init_watch(ctx: &Context) -> Option<Inotify> {
    let inotify = match Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("uvsh: inotify unavailable, timer-only sync: {e}");
            return None;
        }
    };
    let mask = AddWatchFlags::IN_CREATE
        | AddWatchFlags::IN_DELETE
        | AddWatchFlags::IN_MOVED_FROM
        | AddWatchFlags::IN_MOVED_TO;
    match inotify.add_watch(ctx.vfs_root.as_path(), mask) {
        Ok(_) => Some(inotify),
        Err(e) => {
            eprintln!("uvsh: cannot watch {}: {e}", ctx.vfs_root.display());
            None
        }
    }
}

/// Runs until the shutdown flag is observed at the top of an iteration.
/// Shutdown never interrupts an in-flight pass; the caller joins this
/// thread after setting the flag.
pub fn run(ctx: Arc<Context>) {
    let watch = init_watch(&ctx);
    // The startup pass already ran before this thread was spawned.
    let mut last_pass = Instant::now();

    while !ctx.shutdown.load(Ordering::Relaxed) {
        thread::sleep(TICK);
        let mut due = false;

        if take_reload_request() {
            println!("Configuration reloaded");
            due = true;
        }

        if let Some(inotify) = &watch {
            match inotify.read_events() {
                Ok(events) if !events.is_empty() => {
                    if ctx.debug {
                        eprintln!("[watch] {} event(s) on VFS root", events.len());
                    }
                    due = true;
                }
                Ok(_) => {}
                Err(Errno::EAGAIN) => {}
                Err(e) => eprintln!("uvsh: inotify read: {e}"),
            }
        }

        if last_pass.elapsed() >= SYNC_INTERVAL {
            due = true;
        }

        if due {
            reconcile(&ctx);
            last_pass = Instant::now();
        }
    }
}
