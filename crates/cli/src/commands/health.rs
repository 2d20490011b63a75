//! Agent health command

use anyhow::Result;
use assurance_lib::health::ComponentStatus;
use colored::Colorize;
use serde_json::json;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, OutputFormat};

/// Row for the component table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

/// Show service readiness and per-component health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let service = client.service_info().await?;
    let health = client.component_health().await?;

    match format {
        OutputFormat::Json => {
            print_json(&json!({ "service": service, "health": health }))?;
        }
        OutputFormat::Table => {
            println!("{}", "Agent Health".bold());
            println!("{}", "=".repeat(50));
            println!("Service:  {}", service.service.cyan());
            println!("Version:  {}", service.version);
            println!("Status:   {}", color_status(&service.status));
            println!("Overall:  {}", color_status(status_label(health.status)));
            println!();

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(status_label(component.status)),
                    message: component.message.clone().unwrap_or_else(|| "-".to_string()),
                    last_check: component.last_check.format("%H:%M:%S").to_string(),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

fn status_label(status: ComponentStatus) -> &'static str {
    match status {
        ComponentStatus::Healthy => "healthy",
        ComponentStatus::Degraded => "degraded",
        ComponentStatus::Unhealthy => "unhealthy",
    }
}
