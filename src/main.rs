use anyhow::{Result, bail};
use scoop::{config::Config, extractor::Extractor, prewarm};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: scoop [--prewarm] <url>...";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut warm = false;
    let mut urls = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--prewarm" => warm = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(());
            }
            flag if flag.starts_with('-') => bail!("unknown flag {flag}\n{USAGE}"),
            _ => urls.push(arg),
        }
    }
    if urls.is_empty() {
        bail!(USAGE);
    }

    let config = Config::from_env()?;
    let extractor = Extractor::from_config(&config)?;

    if warm {
        let report = prewarm(&extractor, &urls, config.prewarm_concurrency()).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for url in &urls {
        let output = match extractor.extract_article_cached(url).await {
            Ok(result) => serde_json::to_value(&result)?,
            Err(e) => json!({
                "url": url,
                "error": e.to_string(),
                "fallback": format!("{:?}", e.fallback()),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
