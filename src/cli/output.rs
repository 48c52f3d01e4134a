//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress spinners,
//! formatted status messages, and human-readable sizes.

use indicatif::{ProgressBar, ProgressStyle};
use number_prefix::NumberPrefix;

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

pub fn print_success(message: &str) {
    println!("{} {message}", status::SUCCESS);
}

pub fn print_warning(message: &str) {
    eprintln!("{} {message}", status::WARNING);
}

pub fn print_info(message: &str) {
    println!("{} {message}", status::INFO);
}

/// Indented follow-up line under a status message
pub fn print_detail(message: &str) {
    println!("  {message}");
}

/// Final error display at the CLI boundary
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} error: {error:#}", status::ERROR);
}

/// Human-readable byte count (binary prefixes)
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    match NumberPrefix::binary(bytes as f64) {
        NumberPrefix::Standalone(n) => format!("{n} B"),
        NumberPrefix::Prefixed(prefix, n) => format!("{n:.1} {prefix}B"),
    }
}
