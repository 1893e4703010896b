use anyhow::Result;

use distill_core::policy::truncate_chars;
use distill_core::{AppConfig, ServiceClient};

const PREVIEW_CHARS: usize = 60;

pub async fn run(
    config: &AppConfig,
    port: Option<u16>,
    query: &str,
    documents: Vec<String>,
) -> Result<()> {
    let client = ServiceClient::local(port.unwrap_or(config.ranker.port));
    let previews: Vec<String> = documents
        .iter()
        .map(|doc| truncate_chars(doc, PREVIEW_CHARS).replace('\n', " "))
        .collect();

    let response = client.rank(query, documents).await?;

    println!("Ranked {} documents with {}:\n", response.count, response.model);
    for (position, result) in response.rankings.iter().enumerate() {
        let preview = previews
            .get(result.index)
            .map(String::as_str)
            .unwrap_or("");
        println!(
            "  {:>3}. [{:>2}] {:>8.3}  {}",
            position + 1,
            result.index,
            result.score,
            preview
        );
    }

    Ok(())
}
