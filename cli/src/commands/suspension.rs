//! Suspension commands

use serde_json::Value;

use super::ApiClient;
use crate::{output::OutputFormat, SuspensionCommands};

pub async fn handle(
    action: SuspensionCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<(), String> {
    match action {
        SuspensionCommands::Run => {
            let outcome: Value = client.post_empty("/suspension/run").await?;
            if let Some(next) = outcome.get("next_run_date") {
                println!("Not suspension day; next run: {}", next);
            }
            format.print(&outcome);
        }
        SuspensionCommands::Suspend { pattern } => {
            let body = serde_json::json!({ "pattern": pattern });
            let result: Value = client.post("/suspension/suspend", &body).await?;
            format.print(&result);
        }
        SuspensionCommands::Reinstate { pattern } => {
            let body = serde_json::json!({ "pattern": pattern });
            let result: Value = client.post("/suspension/reinstate", &body).await?;
            format.print(&result);
        }
        SuspensionCommands::Status { pattern } => {
            let report: Value = client.get(&format!("/suspension/status/{}", pattern)).await?;
            format.print(&report);
        }
    }
    Ok(())
}
