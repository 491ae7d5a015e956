//! Per-question validators. Each returns the message shown before the
//! question is asked again.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

static ENV_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

static REGISTRY_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z0-9]+\.)+[a-z0-9]+$").unwrap());

pub fn validate_env(input: &str) -> Result<(), String> {
    if input != input.to_lowercase() {
        return Err("environment names must be lowercase".to_string());
    }
    // counted the way a browser counts string length
    if input.encode_utf16().count() < 3 {
        return Err("environment names must be longer than 2 characters".to_string());
    }
    if !ENV_NAME.is_match(input) {
        return Err("environment names need to be numbers, letters, and dashes only".to_string());
    }
    Ok(())
}

/// Accepts anything with a leading base-10 integer: surrounding whitespace and
/// a single sign are allowed, trailing characters are ignored.
pub fn validate_port(input: &str) -> Result<(), String> {
    let trimmed = input.trim_start();
    let unsigned = trimmed
        .strip_prefix(['+', '-'])
        .unwrap_or(trimmed);
    if unsigned.starts_with(|c: char| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("ports must be numbers!".to_string())
    }
}

/// `input` is resolved against `project_root` when relative.
pub fn validate_entrypoint(project_root: &Path, input: &str) -> Result<(), String> {
    if !input.is_empty() && project_root.join(input).exists() {
        Ok(())
    } else {
        Err("That file doesn't seem to exist".to_string())
    }
}

pub fn validate_registry(input: &str) -> Result<(), String> {
    if REGISTRY_HOST.is_match(input) {
        Ok(())
    } else {
        Err("You must provide a valid hostname for a docker registry".to_string())
    }
}
