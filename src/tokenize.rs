//! Command-line tokenizer: pipe splitting, quote stripping, tilde expansion.

/// Split an input line into pipeline stages, one token list per stage.
/// Empty segments (leading/trailing `|`, doubled pipes) are dropped, so the
/// result is either empty (blank input) or a list of non-empty stages.
pub fn tokenize(line: &str, home: &str) -> Vec<Vec<String>> {
    line.split('|')
        .map(|segment| split_args(segment.trim(), home))
        .filter(|stage| !stage.is_empty())
        .collect()
}

fn split_args(segment: &str, home: &str) -> Vec<String> {
    segment
        .split_whitespace()
        .map(|token| expand_tilde(&strip_quotes(token), home))
        .collect()
}

/// Strip one pair of matching outer quotes. No escape or nested-quote
/// handling.
fn strip_quotes(token: &str) -> String {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0]
    {
        token[1..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

/// `~` and `~/...` expand to the invoking user's home directory.
/// `~name/...` is passed through unchanged.
fn expand_tilde(token: &str, home: &str) -> String {
    if token == "~" {
        return home.to_string();
    }
    if let Some(rest) = token.strip_prefix("~/") {
        return format!("{home}/{rest}");
    }
    token.to_string()
}
