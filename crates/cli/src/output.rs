//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

/// Print any document as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format an octet counter as a human-readable size
pub fn format_octets(octets: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if octets >= GB {
        format!("{:.2}Gi", octets as f64 / GB as f64)
    } else if octets >= MB {
        format!("{:.2}Mi", octets as f64 / MB as f64)
    } else if octets >= KB {
        format!("{:.2}Ki", octets as f64 / KB as f64)
    } else {
        format!("{}B", octets)
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "compliant" | "healthy" | "written" | "live" | "up" | "success" => {
            status.green().to_string()
        }
        "degraded" | "fallback" | "unknown" => status.yellow().to_string(),
        "non_compliant" | "unhealthy" | "failed" | "down" | "error" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a QoS score against the SLA threshold
pub fn color_score(score: f64, threshold: f64) -> String {
    let formatted = format!("{:.2}", score);
    if score >= threshold {
        formatted.green().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_octets() {
        assert_eq!(format_octets(512), "512B");
        assert_eq!(format_octets(2048), "2.00Ki");
        assert_eq!(format_octets(1_000_000), "976.56Ki");
        assert_eq!(format_octets(3 * 1024 * 1024 * 1024), "3.00Gi");
    }

    #[test]
    fn test_format_from_config_name() {
        assert_eq!(OutputFormat::from_name("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_name("TABLE"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_name("yaml"), None);
    }

    #[test]
    fn test_uncolored_status_passthrough() {
        colored::control::set_override(false);
        assert_eq!(color_status("COMPLIANT"), "COMPLIANT");
        assert_eq!(color_score(85.0, 85.0), "85.00");
    }
}
