use anyhow::Result;

use distill_core::{AppConfig, HealthCheck, ServiceClient};

pub async fn run(config: &AppConfig, json: bool) -> Result<()> {
    let ranker = ServiceClient::local(config.ranker.port).health().await;
    let summarizer = ServiceClient::local(config.summarizer.port).health().await;

    if json {
        let report = serde_json::json!({
            "ranker": ranker,
            "summarizer": summarizer,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_health("Ranker", config.ranker.port, &ranker);
    print_health("Summarizer", config.summarizer.port, &summarizer);
    Ok(())
}

fn print_health(label: &str, port: u16, health: &HealthCheck) {
    match (&health.status, &health.error) {
        (Some(status), _) if health.healthy => {
            let loaded = if status.model_loaded {
                match status.load_secs {
                    Some(secs) => format!("loaded in {:.1}s", secs),
                    None => "loaded".to_string(),
                }
            } else {
                "not loaded yet".to_string()
            };
            println!("{} (port {}): running", label, port);
            println!("  Model: {} ({})", status.model, loaded);
        }
        (_, Some(error)) => println!("{} (port {}): down [{}]", label, port, error),
        _ => println!("{} (port {}): down", label, port),
    }
}
