//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use readiness_lib::{CheckCategory, CheckOutcome, CheckStatus, ReadinessReport};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the resource summary table
#[derive(Tabled, Serialize)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource: &'static str,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Requested")]
    requested: String,
    #[tabled(rename = "Available")]
    available: String,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return Ok(());
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items)?,
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

fn print_outcome(outcome: &CheckOutcome, indent: &str) {
    let message = format!("{}{}", indent, outcome.message);
    match outcome.status {
        CheckStatus::Pass => print_success(&message),
        CheckStatus::Warn => print_warning(&message),
        CheckStatus::Fail => print_error(&message),
    }
}

fn section_heading(category: CheckCategory) -> Option<&'static str> {
    match category {
        CheckCategory::Storage => Some("Checking storage:"),
        CheckCategory::Permission => Some("Checking RBAC permissions:"),
        CheckCategory::Application => Some("Checking application requirements:"),
        _ => None,
    }
}

fn is_indented(category: CheckCategory) -> bool {
    matches!(category, CheckCategory::Permission | CheckCategory::Application)
}

/// Render a readiness report
pub fn print_report(report: &ReadinessReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(report);
    }

    let mut current: Option<CheckCategory> = None;
    for outcome in &report.checks {
        if current != Some(outcome.category) {
            if let Some(heading) = section_heading(outcome.category) {
                println!("\n{}", heading.bold());
            } else if outcome.category == CheckCategory::Network {
                println!();
            }
            current = Some(outcome.category);
        }
        let indent = if is_indented(outcome.category) { "  " } else { "" };
        print_outcome(outcome, indent);
    }

    if let Some(assessment) = &report.resources {
        let s = &assessment.summary;
        let rows = vec![
            ResourceRow {
                resource: "CPU (cores)",
                total: format!("{:.1}", s.total_cpu.cores()),
                requested: format!("{:.1}", s.used_cpu.cores()),
                available: format!("{:.1}", s.available_cpu.cores()),
            },
            ResourceRow {
                resource: "Memory (GB)",
                total: format!("{:.1}", s.total_memory.as_gib()),
                requested: format!("{:.1}", s.used_memory.as_gib()),
                available: format!("{:.1}", s.available_memory.as_gib()),
            },
        ];
        println!(
            "\n{} ({} nodes, {} pods)",
            "Resource summary".bold(),
            s.node_count,
            s.pod_count
        );
        print_table(&rows, format)?;
    }

    println!();
    match report.permissions_passed() {
        Some(true) => print_success("All permission checks passed"),
        Some(false) => print_warning(
            "Some permission checks failed. You may not have all required permissions to deploy Dynamo AI.",
        ),
        None => {}
    }

    if report.success {
        print_success(&format!(
            "Cluster is ready for deployment in namespace '{}'",
            report.namespace.cyan()
        ));
    } else {
        print_error(&format!(
            "Cluster is not ready for deployment in namespace '{}'",
            report.namespace.cyan()
        ));
    }
    Ok(())
}

/// Mask a secret value for display
pub fn mask(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_headings() {
        assert_eq!(
            section_heading(CheckCategory::Permission),
            Some("Checking RBAC permissions:")
        );
        assert_eq!(section_heading(CheckCategory::Version), None);
    }

    #[test]
    fn test_only_permission_and_application_lines_are_indented() {
        assert!(is_indented(CheckCategory::Permission));
        assert!(is_indented(CheckCategory::Application));
        assert!(!is_indented(CheckCategory::Resources));
    }

    #[test]
    fn test_resource_rows_render_in_both_formats() {
        let rows = vec![ResourceRow {
            resource: "CPU (cores)",
            total: "24.0".to_string(),
            requested: "10.0".to_string(),
            available: "14.0".to_string(),
        }];

        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["resource"], "CPU (cores)");
        assert_eq!(json[0]["available"], "14.0");
        print_table(&rows, OutputFormat::Table).unwrap();
        print_table(&rows, OutputFormat::Json).unwrap();
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("hunter2"), "********");
        assert_eq!(mask(""), "");
    }
}
