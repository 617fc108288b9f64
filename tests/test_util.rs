#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub fn uvsh_bin() -> String {
    std::env::var("CARGO_BIN_EXE_uvsh").unwrap_or_else(|_| "target/debug/uvsh".to_string())
}

/// A self-contained environment for one test: scratch home, VFS root, a
/// passwd-format account store and fake account-management tools that edit
/// that store (so verification-by-re-query is exercised for real).
pub struct Sandbox {
    pub dir: tempfile::TempDir,
    pub vfs_root: PathBuf,
    pub passwd: PathBuf,
}

fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, body).expect("write script");
    let mut perm = std::fs::metadata(path).expect("script metadata").permissions();
    perm.set_mode(0o755);
    std::fs::set_permissions(path, perm).expect("chmod script");
}

fn interactive_names(passwd_lines: &str) -> Vec<String> {
    const NOLOGIN: &[&str] = &[
        "/bin/false",
        "/usr/sbin/nologin",
        "/sbin/nologin",
        "/usr/bin/nologin",
        "/bin/nologin",
    ];
    passwd_lines
        .lines()
        .filter_map(|line| {
            let f: Vec<&str> = line.split(':').collect();
            if f.len() >= 7 && !f[6].is_empty() && !NOLOGIN.contains(&f[6]) {
                Some(f[0].to_string())
            } else {
                None
            }
        })
        .collect()
}

impl Sandbox {
    /// Build a sandbox whose VFS root is pre-seeded with one directory per
    /// interactive account, so a fresh pass starts converged.
    pub fn new(passwd_lines: &str) -> Self {
        Self::with_seed(passwd_lines, true)
    }

    pub fn with_seed(passwd_lines: &str, seed_entries: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let vfs_root = dir.path().join("users");
        std::fs::create_dir_all(&vfs_root).expect("vfs root");
        if seed_entries {
            for name in interactive_names(passwd_lines) {
                std::fs::create_dir_all(vfs_root.join(name)).expect("seed entry");
            }
        }
        let passwd = dir.path().join("passwd");
        std::fs::write(&passwd, passwd_lines).expect("write passwd");
        let useradd = dir.path().join("fake-useradd");
        let userdel = dir.path().join("fake-userdel");
        write_script(
            &useradd,
            &format!(
                "#!/bin/sh\necho \"$1:x:1100:1100::/home/$1:/bin/bash\" >> {p}\n",
                p = passwd.display()
            ),
        );
        write_script(
            &userdel,
            &format!(
                "#!/bin/sh\ngrep -v \"^$1:\" {p} > {p}.tmp; mv {p}.tmp {p}\n",
                p = passwd.display()
            ),
        );
        Sandbox { dir, vfs_root, passwd }
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(uvsh_bin());
        cmd.env("HOME", self.dir.path())
            .env("UVSH_VFS_ROOT", &self.vfs_root)
            .env("UVSH_PASSWD", &self.passwd)
            .env("UVSH_HISTORY", self.dir.path().join("history"))
            .env("UVSH_USERADD_BIN", self.dir.path().join("fake-useradd"))
            .env("UVSH_USERDEL_BIN", self.dir.path().join("fake-userdel"));
        cmd
    }

    pub fn run_script(&self, line: &str) -> Output {
        self.command()
            .arg("-c")
            .arg(line)
            .output()
            .expect("run uvsh -c")
    }

    pub fn sync_once(&self) -> Output {
        self.command()
            .arg("--sync-once")
            .output()
            .expect("run uvsh --sync-once")
    }

    pub fn entry(&self, name: &str) -> PathBuf {
        self.vfs_root.join(name)
    }

    pub fn read_meta(&self, name: &str, file: &str) -> String {
        std::fs::read_to_string(self.entry(name).join(file)).unwrap_or_default()
    }

    pub fn passwd_contents(&self) -> String {
        std::fs::read_to_string(&self.passwd).unwrap_or_default()
    }

    /// Stable snapshot of the VFS tree: sorted (relative path, contents)
    /// pairs, directories listed with empty contents.
    pub fn tree_snapshot(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut stack = vec![self.vfs_root.clone()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir).expect("read_dir") {
                let entry = entry.expect("dir entry");
                let path = entry.path();
                let rel = path
                    .strip_prefix(&self.vfs_root)
                    .expect("under root")
                    .to_string_lossy()
                    .into_owned();
                if path.is_dir() {
                    out.push((rel, String::new()));
                    stack.push(path);
                } else {
                    let data = std::fs::read_to_string(&path).unwrap_or_default();
                    out.push((rel, data));
                }
            }
        }
        out.sort();
        out
    }
}

pub fn stdout_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn stderr_of(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}
