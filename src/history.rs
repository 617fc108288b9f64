//! Plain-text command history: one command per line, most-recent-100 kept.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

const MAX_ENTRIES: usize = 100;
const EXIT_TOKEN: &str = "\\q";

pub struct History {
    path: PathBuf,
    entries: VecDeque<String>,
}

impl History {
    /// Load the tail of the history file; a missing file is an empty
    /// history.
    pub fn load(path: PathBuf) -> Self {
        let mut entries = VecDeque::new();
        if let Ok(data) = std::fs::read_to_string(&path) {
            for line in data.lines() {
                if line.is_empty() || line == EXIT_TOKEN {
                    continue;
                }
                entries.push_back(line.to_string());
                if entries.len() > MAX_ENTRIES {
                    entries.pop_front();
                }
            }
        }
        History { path, entries }
    }

    /// Record one accepted command line. Appends to the file; once the cap
    /// is exceeded the file is rewritten trimmed.
    pub fn record(&mut self, line: &str) {
        if line.is_empty() || line == EXIT_TOKEN {
            return;
        }
        self.entries.push_back(line.to_string());
        if self.entries.len() > MAX_ENTRIES {
            self.entries.pop_front();
            self.rewrite();
            return;
        }
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = appended {
            eprintln!("uvsh: cannot write history {}: {e}", self.path.display());
        }
    }

    fn rewrite(&self) {
        let mut data = String::new();
        for line in &self.entries {
            data.push_str(line);
            data.push('\n');
        }
        if let Err(e) = std::fs::write(&self.path, data) {
            eprintln!("uvsh: cannot rewrite history {}: {e}", self.path.display());
        }
    }
}
