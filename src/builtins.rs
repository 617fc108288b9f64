//! Builtins recognized for single-stage command lines. Inside multi-stage
//! pipelines every stage is an external command.

use std::process::Command;

/// Dispatch a single-stage command line. Returns the exit status when the
/// first token names a builtin, `None` otherwise.
pub fn try_builtin(stage: &[String]) -> Option<i32> {
    match stage.first().map(String::as_str) {
        Some("echo") => Some(echo(&stage[1..])),
        Some("\\e") => Some(env_var(&stage[1..])),
        Some("\\l") => Some(disk_info(&stage[1..])),
        _ => None,
    }
}

fn echo(args: &[String]) -> i32 {
    println!("{}", args.join(" "));
    0
}

/// `\e $VAR` prints an environment variable; `:`-separated values (PATH and
/// friends) are printed one component per line.
fn env_var(args: &[String]) -> i32 {
    let Some(raw) = args.first() else {
        eprintln!("usage: \\e $VARIABLE");
        return 2;
    };
    let name = raw.strip_prefix('$').unwrap_or(raw);
    match std::env::var(name) {
        Ok(value) if value.contains(':') => {
            for part in value.split(':') {
                println!("{part}");
            }
            0
        }
        Ok(value) => {
            println!("{value}");
            0
        }
        Err(_) => {
            eprintln!("uvsh: variable ${name} not found");
            1
        }
    }
}

/// `\l /dev/sda` shows the partition layout, trying `lsblk` first and
/// falling back to `fdisk -l`. The device is always a discrete argument.
fn disk_info(args: &[String]) -> i32 {
    let Some(device) = args.first() else {
        eprintln!("usage: \\l /dev/device");
        return 2;
    };
    for tool in ["lsblk", "fdisk"] {
        let mut cmd = Command::new(tool);
        if tool == "fdisk" {
            cmd.arg("-l");
        }
        match cmd.arg(device).status() {
            Ok(status) if status.success() => return 0,
            Ok(_) | Err(_) => continue,
        }
    }
    eprintln!("uvsh: no partition listing for {device}");
    1
}
