//! Argument hygiene: metacharacter denial, shell-style tokenization, and
//! flag allow-list enforcement.
//!
//! Tools are spawned without a shell, so none of these characters would be
//! interpreted by us — the deny set and token charset are defense in depth
//! against binaries that re-interpret their own arguments, and they keep
//! logs and metrics labels predictable.

use regex::Regex;
use std::sync::LazyLock;

/// Shell metacharacters that are never allowed in `extra_args`.
pub const DENIED_METACHARS: &[char] = &[';', '&', '|', '`', '$', '>', '<', '\n', '\r'];

/// Charset every token must match after quote-aware splitting.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.:/=+\-,@%]+$").expect("Failed to compile token charset regex")
});

/// Check the raw argument blob: byte length and metacharacter deny set.
/// Valid input is returned to the caller unchanged.
pub fn validate_extra_args(extra_args: &str, max_len: usize) -> Result<(), String> {
    if extra_args.len() > max_len {
        return Err(format!(
            "extra_args is {} bytes, limit is {}",
            extra_args.len(),
            max_len
        ));
    }
    if let Some(ch) = extra_args.chars().find(|c| DENIED_METACHARS.contains(c)) {
        return Err(format!(
            "extra_args contains forbidden metacharacter {:?}",
            ch
        ));
    }
    Ok(())
}

/// Shell-style split honoring single and double quotes, then charset-check
/// every token. The error names the first offending token.
pub fn tokenize(extra_args: &str) -> Result<Vec<String>, String> {
    let trimmed = extra_args.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let tokens =
        shlex::split(trimmed).ok_or_else(|| "extra_args has unbalanced quoting".to_string())?;

    for token in &tokens {
        if !TOKEN_RE.is_match(token) {
            return Err(format!("token {:?} contains disallowed characters", token));
        }
    }
    Ok(tokens)
}

/// Every `-`-prefixed token must have some allow-list entry as a prefix, so
/// `--timeout=30` is admitted by `--timeout`. Value tokens pass freely. An
/// empty allow list means no flag restriction.
pub fn enforce_allow_list(tokens: &[String], allow_list: &[&str]) -> Result<(), String> {
    if allow_list.is_empty() {
        return Ok(());
    }
    for token in tokens {
        if !token.starts_with('-') {
            continue;
        }
        if !allow_list.iter().any(|allowed| token.starts_with(allowed)) {
            return Err(format!("flag {:?} is not permitted for this tool", token));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
