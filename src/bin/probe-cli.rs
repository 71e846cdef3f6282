use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(about = "Management CLI for the relay probe service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000", env = "RELAY_PROBE_URL")]
    url: String,

    #[arg(short, long, default_value = "", env = "RELAY_PROBE_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status (admin)
    Status,
    /// Show current probe settings (admin)
    Settings,
    /// Update probe settings (admin); unspecified fields are left unchanged
    SetSettings {
        #[arg(long)]
        tier4: Option<u64>,
        #[arg(long)]
        tier3: Option<u64>,
        #[arg(long)]
        tier2: Option<u64>,
        #[arg(long)]
        tier1: Option<u64>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        tcp_port: Option<u16>,
        #[arg(long)]
        retry_count: Option<u32>,
        #[arg(long)]
        retry_delay_ms: Option<u64>,
    },
    /// Probe one host
    Probe {
        host: String,
        #[arg(long)]
        mode: Option<String>,
    },
    /// Probe every configured relay concurrently
    ProbeAll {
        #[arg(long)]
        mode: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Settings => {
            let res = client
                .get(format!("{}/admin/ping-settings", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::SetSettings {
            tier4,
            tier3,
            tier2,
            tier1,
            mode,
            tcp_port,
            retry_count,
            retry_delay_ms,
        } => {
            let mut patch = Map::new();
            let mut put = |key: &str, value: Option<Value>| {
                if let Some(v) = value {
                    patch.insert(key.to_string(), v);
                }
            };
            put("tier4", tier4.map(Value::from));
            put("tier3", tier3.map(Value::from));
            put("tier2", tier2.map(Value::from));
            put("tier1", tier1.map(Value::from));
            put("mode", mode.map(Value::from));
            put("tcpPort", tcp_port.map(Value::from));
            put("retryCount", retry_count.map(Value::from));
            put("retryDelayMs", retry_delay_ms.map(Value::from));

            let res = client
                .put(format!("{}/admin/ping-settings", cli.url))
                .headers(headers)
                .json(&Value::Object(patch))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Probe { host, mode } => {
            let mut req = client.get(probe_url(&cli.url, &host)?);
            if let Some(mode) = &mode {
                req = req.query(&[("mode", mode)]);
            }
            let res = req.send().await?;
            print_response(res).await?;
        }
        Commands::ProbeAll { mode } => {
            let servers: Vec<Value> = client
                .get(format!("{}/api/servers", cli.url))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let probes = servers.iter().map(|server| {
                let client = client.clone();
                let url = probe_url(&cli.url, server["host"].as_str().unwrap_or_default())
                    .map_err(|e| e.to_string());
                let mode = mode.clone();
                async move {
                    let mut req = match url {
                        Ok(url) => client.get(url),
                        Err(e) => return Value::String(e),
                    };
                    if let Some(mode) = &mode {
                        req = req.query(&[("mode", mode)]);
                    }
                    match req.send().await {
                        Ok(res) => res.json::<Value>().await.unwrap_or(Value::Null),
                        Err(e) => Value::String(e.to_string()),
                    }
                }
            });
            let results = join_all(probes).await;

            for (server, result) in servers.iter().zip(results) {
                let name = server["name"].as_str().unwrap_or("?");
                let tier = result["tier"].as_str().unwrap_or("error");
                let time = result["time"]
                    .as_u64()
                    .map(|t| format!("{} ms", t))
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<20} {:<12} {}", name, tier, time);
            }
        }
    }

    Ok(())
}

/// `{base}/probe/{host}`, with `host` encoded as a single path segment.
fn probe_url(base: &str, host: &str) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| format!("{} cannot be used as a base URL", base))?
        .pop_if_empty()
        .extend(["probe", host]);
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
