//! Billing commands

use serde_json::Value;

use super::ApiClient;
use crate::{output::OutputFormat, BillingCommands};

pub async fn handle(
    action: BillingCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<(), String> {
    match action {
        BillingCommands::Run => {
            let summary: Value = client.post_empty("/billing/run").await?;
            let created = summary
                .get("created_count")
                .and_then(|c| c.as_u64())
                .unwrap_or(0);
            println!("Invoices created: {}", created);
            format.print(&summary);
        }
        BillingCommands::Preview {
            activation_date,
            price,
            unit,
        } => {
            let path = format!(
                "/billing/proration-preview?activation_date={}&package_price={}&period_unit={}",
                activation_date, price, unit
            );
            let preview: Value = client.get(&path).await?;
            format.print(&preview);
        }
        BillingCommands::Pay { invoice_id } => {
            let body = serde_json::json!({ "invoice_id": invoice_id });
            let outcome: Value = client.post("/billing/payments", &body).await?;
            format.print(&outcome);
        }
    }
    Ok(())
}
