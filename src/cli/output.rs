// Output formatting and display for CLI

use crate::config::TargetDescriptor;
use crate::error::Result;
use colored::*;
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print one row per configured target with its validation result
pub fn print_target_table(checks: &[(TargetDescriptor, Result<()>)]) {
    if checks.is_empty() {
        println!("{}", "No targets configured, events will be dropped".yellow());
        return;
    }

    #[derive(Tabled)]
    struct TargetRow {
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Levels")]
        levels: String,
        #[tabled(rename = "Serializer")]
        serializer: String,
        #[tabled(rename = "Destination")]
        destination: String,
        #[tabled(rename = "Mode")]
        mode: String,
        #[tabled(rename = "Flush")]
        flush: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows: Vec<TargetRow> = checks
        .iter()
        .map(|(descriptor, status)| TargetRow {
            kind: descriptor.kind.clone(),
            name: format_name(&descriptor.name),
            levels: format_levels(&descriptor.min_level, &descriptor.max_level),
            serializer: descriptor.serializer.clone(),
            destination: format_destination(descriptor),
            mode: format!("{:?}", descriptor.mode()).to_lowercase(),
            flush: format!(
                "{} / {}",
                format_cache(descriptor),
                format_interval(descriptor.interval())
            ),
            status: format_status(status),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    println!(
        "{}",
        format!("Total: {} target(s)", checks.len()).dimmed().italic()
    );

    for (descriptor, status) in checks {
        if let Err(e) = status {
            print_error(&format!("{} target '{}': {}", descriptor.kind, descriptor.name, e));
        }
    }
}

/// Print producer and end-to-end throughput of a bench run
pub fn print_bench_summary(events: usize, threads: usize, produced: Duration, total: Duration) {
    println!("\n{}", "Benchmark".bold().underline());
    println!();
    println!("  {:<15} {}", "Threads:".bold(), threads);
    println!("  {:<15} {}", "Events:".bold(), events);
    println!(
        "  {:<15} {} ({})",
        "Produce:".bold(),
        format_duration(produced),
        format_rate(events, produced).cyan()
    );
    println!(
        "  {:<15} {} ({})",
        "With flush:".bold(),
        format_duration(total),
        format_rate(events, total).cyan()
    );
    println!();
}

fn format_name(name: &str) -> String {
    if name.is_empty() || name == "*" {
        "*".dimmed().to_string()
    } else {
        truncate(name, 20)
    }
}

/// Render a level range, with blank bounds shown as open ends
fn format_levels(min: &str, max: &str) -> String {
    let bound = |s: &str, open: &str| {
        if s.is_empty() || s == "*" {
            open.to_string()
        } else {
            s.to_uppercase()
        }
    };
    format!("{}..{}", bound(min, "TRACE"), bound(max, "FATAL"))
}

fn format_destination(descriptor: &TargetDescriptor) -> String {
    match descriptor.kind.as_str() {
        "console" => "stderr".to_string(),
        _ => match &descriptor.root {
            Some(root) => format!(
                "{}/*-{}",
                root.display(),
                descriptor.suffix.as_deref().unwrap_or("log")
            ),
            None => "-".to_string(),
        },
    }
}

fn format_cache(descriptor: &TargetDescriptor) -> String {
    let size = descriptor.cache_size();
    if descriptor.async_mode {
        format!("{} events", size)
    } else {
        format_bytes(size as u64)
    }
}

fn format_status(status: &Result<()>) -> String {
    match status {
        Ok(()) => "ok".green().to_string(),
        Err(_) => "invalid".red().bold().to_string(),
    }
}

fn format_interval(interval: Duration) -> String {
    let ms = interval.as_millis();
    if ms % 1000 == 0 {
        format!("{}s", ms / 1000)
    } else {
        format!("{}ms", ms)
    }
}

/// Format a duration with millisecond precision
fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1000.0;
    if ms < 1000.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

fn format_rate(events: usize, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return "-".to_string();
    }
    let rate = events as f64 / secs;
    if rate >= 1_000_000.0 {
        format!("{:.2}M events/s", rate / 1_000_000.0)
    } else if rate >= 1_000.0 {
        format!("{:.1}K events/s", rate / 1_000.0)
    } else {
        format!("{:.0} events/s", rate)
    }
}

/// Format a byte count in human-readable form
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

/// Truncate a string to a maximum length
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_levels() {
        assert_eq!(format_levels("", ""), "TRACE..FATAL");
        assert_eq!(format_levels("warn", "*"), "WARN..FATAL");
        assert_eq!(format_levels("Debug", "Info"), "DEBUG..INFO");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(8 * 1024), "8.0KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00GB");
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::from_secs(1)), "1s");
        assert_eq!(format_interval(Duration::from_millis(250)), "250ms");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(500, Duration::from_secs(1)), "500 events/s");
        assert_eq!(format_rate(2_500, Duration::from_secs(1)), "2.5K events/s");
        assert_eq!(format_rate(3_000_000, Duration::from_secs(1)), "3.00M events/s");
        assert_eq!(format_rate(10, Duration::ZERO), "-");
    }

    #[test]
    fn test_format_destination() {
        let file = TargetDescriptor {
            root: Some("/var/log/app".into()),
            suffix: Some("txt".to_string()),
            ..TargetDescriptor::default()
        };
        assert_eq!(format_destination(&file), "/var/log/app/*-txt");

        let console = TargetDescriptor {
            kind: "console".to_string(),
            ..TargetDescriptor::default()
        };
        assert_eq!(format_destination(&console), "stderr");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a very long string", 10), "this is...");
    }
}
