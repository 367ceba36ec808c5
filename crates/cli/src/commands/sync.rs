use pathway_core::models::sync::{SyncOptions, SyncResult};
use pathway_core::HubEvent;

use super::{connect, load_config, open_hub, parse_provider};

/// Run the `sync` command: connect, select the container, sync and print the summary.
pub async fn run(
    config_path: &str,
    provider: &str,
    container_id: &str,
    options: SyncOptions,
) -> anyhow::Result<()> {
    let provider = parse_provider(provider)?;
    let config = load_config(config_path)?;
    let hub = open_hub(&config)?;

    connect(&hub, &config, provider).await?;
    let selection = hub.select(provider, container_id).await?;
    println!(
        "Syncing {} from {}",
        selection.container.display_name,
        provider.display_name()
    );

    let mut events = hub.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                HubEvent::SyncProgress { progress, .. } => {
                    println!("  [{:>3}%] {}", progress.percent, progress.label);
                }
                HubEvent::SyncCompleted(_) | HubEvent::SyncFailed { .. } => break,
                _ => {}
            }
        }
    });

    let outcome = hub.synchronize(provider, &options).await;
    // The printer stops on the terminal event.
    let _ = printer.await;
    let result = outcome?;

    println!();
    print!("{}", format_summary(&result));
    Ok(())
}

fn format_summary(result: &SyncResult) -> String {
    let dist = &result.summary.risk_distribution;
    let mut out = String::new();
    out.push_str(&format!("Run:       {}\n", result.run_id));
    out.push_str(&format!(
        "Synced at: {}\n",
        result.synced_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Students:  {} ({} processed upstream)\n",
        result.summary.total_students, result.students_processed
    ));
    out.push_str(&format!("  High risk:     {}\n", dist.high));
    out.push_str(&format!("  Moderate risk: {}\n", dist.moderate));
    out.push_str(&format!("  Low risk:      {}\n", dist.low));
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use pathway_core::models::provider::ProviderId;
    use pathway_core::models::sync::{RiskDistribution, SyncSummary};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn summary_lists_each_bucket() {
        let result = SyncResult {
            run_id: Uuid::new_v4(),
            provider: ProviderId::Canvas,
            container_id: "2".into(),
            synced_at: Utc::now(),
            students_processed: 42,
            summary: SyncSummary {
                total_students: 42,
                risk_distribution: RiskDistribution {
                    high: 5,
                    moderate: 12,
                    low: 25,
                },
            },
            predictions: Vec::new(),
            source_metadata: BTreeMap::new(),
        };

        let summary = format_summary(&result);
        assert!(summary.contains("Students:  42 (42 processed upstream)"));
        assert!(summary.contains("High risk:     5"));
        assert!(summary.contains("Moderate risk: 12"));
        assert!(summary.contains("Low risk:      25"));
    }
}
