use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context as _, Result};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

mod builtins;
mod exec;
mod history;
mod monitor;
mod sync;
mod tokenize;
mod users;
mod vfs;

use history::History;

/// Shared state for the interactive loop and the background monitor. Both
/// hold a reference, not a copy.
pub struct Context {
    pub vfs_root: PathBuf,
    pub passwd_path: PathBuf,
    pub history_path: PathBuf,
    pub home: String,
    pub useradd_bin: String,
    pub userdel_bin: String,
    pub debug: bool,
    pub sync_gate: Mutex<()>,
    pub shutdown: AtomicBool,
}

// Set by the SIGHUP handler, observed by the monitor loop. The handler must
// not touch the filesystem or spawn processes, so the notice and the
// reconciliation pass both happen outside signal context.
static RELOAD_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sighup(_: libc::c_int) {
    RELOAD_REQUESTED.store(true, Ordering::Relaxed);
}

pub fn take_reload_request() -> bool {
    RELOAD_REQUESTED.swap(false, Ordering::Relaxed)
}

fn install_sighup_handler() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sighup),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGHUP, &action) }.context("cannot install SIGHUP handler")?;
    Ok(())
}

struct Options {
    script: Option<String>,
    sync_once: bool,
    vfs_root: Option<PathBuf>,
    passwd: Option<PathBuf>,
    history: Option<PathBuf>,
}

fn usage() {
    eprintln!(
        "usage: uvsh [-c line] [--sync-once] [--vfs-root dir] [--passwd file] [--history file]"
    );
}

fn parse_options() -> Result<Options> {
    let mut opts = Options {
        script: None,
        sync_once: false,
        vfs_root: None,
        passwd: None,
        history: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "-c" => {
                opts.script =
                    Some(args.next().ok_or_else(|| anyhow::anyhow!("missing command after -c"))?);
            }
            "--sync-once" => opts.sync_once = true,
            "--vfs-root" => {
                let v = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing value after --vfs-root"))?;
                opts.vfs_root = Some(PathBuf::from(v));
            }
            "--passwd" => {
                let v = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing value after --passwd"))?;
                opts.passwd = Some(PathBuf::from(v));
            }
            "--history" => {
                let v = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing value after --history"))?;
                opts.history = Some(PathBuf::from(v));
            }
            "-h" | "--help" => {
                usage();
                std::process::exit(0);
            }
            other => eprintln!("uvsh: unknown arg: {other}"),
        }
    }
    Ok(opts)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from)
}

fn build_context(opts: &Options) -> Result<Context> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    let vfs_root = opts
        .vfs_root
        .clone()
        .or_else(|| env_path("UVSH_VFS_ROOT"))
        .unwrap_or_else(|| PathBuf::from(&home).join("users"));
    let passwd_path = opts
        .passwd
        .clone()
        .or_else(|| env_path("UVSH_PASSWD"))
        .unwrap_or_else(|| PathBuf::from("/etc/passwd"));
    let history_path = opts
        .history
        .clone()
        .or_else(|| env_path("UVSH_HISTORY"))
        .unwrap_or_else(|| PathBuf::from(&home).join(".uvsh_history"));
    Ok(Context {
        vfs_root,
        passwd_path,
        history_path,
        home,
        useradd_bin: std::env::var("UVSH_USERADD_BIN").unwrap_or_else(|_| "useradd".to_string()),
        userdel_bin: std::env::var("UVSH_USERDEL_BIN").unwrap_or_else(|_| "userdel".to_string()),
        debug: std::env::var_os("UVSH_DEBUG").is_some(),
        sync_gate: Mutex::new(()),
        shutdown: AtomicBool::new(false),
    })
}

fn run_line(ctx: &Context, line: &str) -> i32 {
    let pipeline = tokenize::tokenize(line, &ctx.home);
    if pipeline.is_empty() {
        return 0;
    }
    if pipeline.len() == 1 {
        if let Some(status) = builtins::try_builtin(&pipeline[0]) {
            return status;
        }
    }
    exec::run_pipeline(&pipeline)
}

fn repl(ctx: &Arc<Context>) -> Result<()> {
    let mut history = History::load(ctx.history_path.clone());
    let monitor = {
        let ctx = Arc::clone(ctx);
        std::thread::spawn(move || monitor::run(ctx))
    };

    let interactive = atty::is(atty::Stream::Stdin);
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        if interactive {
            print!("> ");
            let _ = std::io::stdout().flush();
        }
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => {
                if interactive {
                    println!();
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("uvsh: read error: {e}");
                break;
            }
        }
        let input = line.trim();
        if input == "\\q" {
            break;
        }
        if input.is_empty() {
            continue;
        }
        history.record(input);
        run_line(ctx, input);
        // Synchronous post-command convergence, on top of the background
        // triggers.
        sync::reconcile(ctx);
    }

    ctx.shutdown.store(true, Ordering::Relaxed);
    let _ = monitor.join();
    Ok(())
}

fn main() -> Result<()> {
    let opts = parse_options()?;
    let ctx = Arc::new(build_context(&opts)?);

    install_sighup_handler()?;

    // Startup-time configuration failures are fatal: without the VFS root
    // and a readable account store no useful work is possible.
    vfs::ensure_root(&ctx.vfs_root)?;
    users::interactive_accounts(&ctx.passwd_path)?;

    sync::reconcile(&ctx);

    if opts.sync_once {
        return Ok(());
    }

    if let Some(line) = &opts.script {
        let status = run_line(&ctx, line);
        sync::reconcile(&ctx);
        std::process::exit(status);
    }

    repl(&ctx)
}
