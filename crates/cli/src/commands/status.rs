//! Compliance status command

use anyhow::Result;
use assurance_lib::models::{
    ComplianceReport, ErrorReport, MetricSource, PersistenceOutcome, SlaStatus,
};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ClientError, ComplianceResponse};
use crate::output::{
    color_score, color_status, format_octets, print_error, print_json, print_success,
    print_warning, OutputFormat,
};

/// Row for the measurement table
#[derive(Tabled)]
struct MeasurementRow {
    #[tabled(rename = "Measurement")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

/// Fetch a fresh compliance report and render it
///
/// Returns an error when the agent answered with its error document, so the
/// process exits non-zero.
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    match client.compliance_status().await? {
        ComplianceResponse::Report(report) => {
            match format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Table => print_report(&report),
            }
            Ok(())
        }
        ComplianceResponse::Error(error) => {
            match format {
                OutputFormat::Json => print_json(&error)?,
                OutputFormat::Table => print_error_report(&error),
            }
            Err(ClientError::Pipeline(error.error_message).into())
        }
    }
}

fn print_report(report: &ComplianceReport) {
    let sla = &report.sla_compliance;

    println!("{}", "SLA Compliance".bold());
    println!("{}", "=".repeat(50));
    println!("Verdict:    {}", color_status(sla_label(sla.status)));
    println!(
        "QoS Score:  {} (threshold {:.1})",
        color_score(sla.qos_score.value(), sla.threshold),
        sla.threshold
    );
    println!("Checked:    {}", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    let rows = vec![
        MeasurementRow {
            name: "Latency",
            value: format!("{:.2} ms", report.network_metrics.latency_ms),
            source: source_label(report.network_metrics.source),
        },
        MeasurementRow {
            name: "Packet Loss",
            value: format!("{:.3} %", report.network_metrics.packet_loss_percent),
            source: source_label(report.network_metrics.source),
        },
        MeasurementRow {
            name: "In Octets",
            value: format_octets(report.interface_stats.in_octets),
            source: source_label(report.interface_stats.source),
        },
        MeasurementRow {
            name: "Out Octets",
            value: format_octets(report.interface_stats.out_octets),
            source: source_label(report.interface_stats.source),
        },
    ];

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!();

    println!("Device:     {}", color_status(&report.device_probe.status));
    let outcome = match report.storage.outcome {
        PersistenceOutcome::Written => "WRITTEN",
        PersistenceOutcome::Failed => "FAILED",
    };
    println!(
        "Storage:    {} ({})",
        color_status(outcome),
        report.storage.backend
    );
    println!(
        "Model:      {} [{}]",
        report.ai_model.algorithm,
        report.ai_model.features.join(", ")
    );
    println!();

    if sla.status == SlaStatus::Compliant {
        print_success("Service is within SLA");
    } else {
        print_warning("Service is below the SLA threshold");
    }
}

fn print_error_report(error: &ErrorReport) {
    print_error("Agent could not produce a compliance report");
    println!("Error:      {}", error.error_message);
    println!("Checked:    {}", error.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "Verdict:    {} (threshold {:.1})",
        color_status(sla_label(error.sla_compliance.status)),
        error.sla_compliance.threshold
    );
}

fn source_label(source: MetricSource) -> String {
    match source {
        MetricSource::Live => color_status("LIVE"),
        MetricSource::Fallback => color_status("FALLBACK"),
    }
}

fn sla_label(status: SlaStatus) -> &'static str {
    match status {
        SlaStatus::Compliant => "COMPLIANT",
        SlaStatus::NonCompliant => "NON_COMPLIANT",
        SlaStatus::Unknown => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sla_labels_match_wire_names() {
        for status in [SlaStatus::Compliant, SlaStatus::NonCompliant, SlaStatus::Unknown] {
            assert_eq!(serde_json::to_value(status).unwrap(), sla_label(status));
        }
    }
}
