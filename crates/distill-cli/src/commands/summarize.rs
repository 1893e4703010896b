use anyhow::Result;

use distill_core::{AppConfig, ServiceClient, SummarizeRequest};

pub async fn run(
    config: &AppConfig,
    port: Option<u16>,
    texts: Vec<String>,
    max_length: usize,
    min_length: usize,
) -> Result<()> {
    let client = ServiceClient::local(port.unwrap_or(config.summarizer.port));
    let request = SummarizeRequest {
        max_length,
        min_length,
        ..SummarizeRequest::new(texts)
    };

    let response = client.summarize(&request).await?;

    println!("{} summaries from {}:\n", response.count, response.model);
    for (i, summary) in response.summaries.iter().enumerate() {
        println!("  [{}] {}", i, summary);
    }

    Ok(())
}
