//! Pipeline executor: fork one process per stage, wire adjacent stages with
//! anonymous pipes, wait for everything.

use std::ffi::CString;
use std::os::fd::IntoRawFd;
use std::os::unix::io::RawFd;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, pipe, ForkResult};

/// Run a tokenized pipeline. All stages are spawned before any wait, so
/// back-pressure flows through the kernel pipe buffers. The returned status
/// is the last one reaped, in spawn order; it is best-effort and only used
/// for diagnostics.
pub fn run_pipeline(stages: &[Vec<String>]) -> i32 {
    if stages.is_empty() {
        return 0;
    }

    let mut fds: Vec<(RawFd, RawFd)> = Vec::new();
    for _ in 0..stages.len() - 1 {
        match pipe() {
            Ok((r, w)) => fds.push((r.into_raw_fd(), w.into_raw_fd())),
            Err(e) => {
                eprintln!("uvsh: pipe: {e}");
                for (r, w) in &fds {
                    let _ = close(*r);
                    let _ = close(*w);
                }
                return 1;
            }
        }
    }

    let mut pids = Vec::new();
    for (i, argv) in stages.iter().enumerate() {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                if i > 0 && dup2(fds[i - 1].0, 0).is_err() {
                    std::process::exit(1);
                }
                if i < stages.len() - 1 && dup2(fds[i].1, 1).is_err() {
                    std::process::exit(1);
                }
                // Every pipe end must be closed here, or a downstream stage
                // never sees EOF.
                for (r, w) in &fds {
                    let _ = close(*r);
                    let _ = close(*w);
                }
                exec_stage(argv);
            }
            Ok(ForkResult::Parent { child }) => pids.push(child),
            Err(e) => eprintln!("uvsh: fork: {e}"),
        }
    }

    for (r, w) in &fds {
        let _ = close(*r);
        let _ = close(*w);
    }

    let mut status = 0;
    for pid in pids {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => status = code,
            Ok(WaitStatus::Signaled(_, sig, _)) => status = 128 + sig as i32,
            Ok(_) => {}
            Err(e) => eprintln!("uvsh: waitpid: {e}"),
        }
    }
    status
}

fn exec_stage(argv: &[String]) -> ! {
    let cstrs: Vec<CString> = argv
        .iter()
        .map(|s| CString::new(s.as_str()).unwrap_or_default())
        .collect();
    match execvp(&cstrs[0], &cstrs) {
        Err(Errno::ENOENT) => {
            eprintln!("{}: command not found", argv[0]);
            std::process::exit(127);
        }
        Err(e) => {
            eprintln!("{}: {e}", argv[0]);
            std::process::exit(126);
        }
        Ok(_) => unreachable!(),
    }
}
