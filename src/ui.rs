//! Centralized output formatting and color utilities.

use colored::Colorize;

/// Check if quiet mode is enabled via environment variable or --quiet flag
pub fn is_quiet() -> bool {
    std::env::var("DVHCHECK_QUIET")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn warn(message: &str) {
    if !is_quiet() {
        eprintln!("{} {}", "⚠".yellow(), message);
    }
}

pub fn success(message: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), message);
    }
}
