//! fleetql CLI
//!
//! Command-line interface for fleetql:
//! - Invoke named operations against a running API server
//! - Browse the operation catalog
//! - Validate filter expressions locally
//! - Generate a config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fleetql::query::compile;
use fleetql::resources::ResourceKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fleetql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query a device fleet with filters, cursors, rollups and CSV export")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8086", global = true)]
    pub api_url: String,

    /// Output format for listings (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Invoke an operation
    Call {
        /// Operation name (e.g. list_devices)
        operation: String,
        /// Arguments in key=value format
        args: Vec<String>,
        /// Follow cursors until the listing is exhausted
        #[arg(long)]
        all: bool,
    },

    /// List available operations
    Operations,

    /// Show server status
    Status,

    /// Check a filter expression without contacting the server
    Validate {
        /// Filter expression, e.g. "type='EX50' and signal_percent>50"
        query: String,
        /// Resource the filter applies to
        #[arg(short, long, default_value = "devices")]
        resource: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Call { operation, args, all } => {
            let mut body = parse_args(&args)?;
            let url = format!("{}/api/v1/operations/{}", cli.api_url, operation);
            let mut printed_header = false;

            loop {
                let response = client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .with_context(|| format!("cannot reach fleetql API at {}", cli.api_url))?;

                let status = response.status();
                let content_type = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let text = response.text().await?;

                if !status.is_success() {
                    let error: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
                    bail!(
                        "{} ({}): {}",
                        error["error"]["code"].as_str().unwrap_or("error"),
                        status,
                        error["error"]["message"].as_str().unwrap_or(&text)
                    );
                }

                if !content_type.starts_with("application/json") {
                    print!("{}", text);
                    break;
                }

                let data: serde_json::Value = serde_json::from_str(&text)?;
                let is_page = data.get("list").is_some_and(|l| l.is_array());

                if cli.format == "json" || !is_page {
                    println!("{}", serde_json::to_string_pretty(&data)?);
                } else {
                    print_table(&data, !printed_header);
                    printed_header = true;
                }

                match data.get("cursor").and_then(|c| c.as_str()) {
                    Some(cursor) if all && is_page => {
                        body.insert("cursor".to_string(), cursor.into());
                    }
                    _ => break,
                }
            }
        }

        Commands::Operations => {
            let response = client
                .get(format!("{}/api/v1/operations", cli.api_url))
                .send()
                .await
                .with_context(|| format!("cannot reach fleetql API at {}", cli.api_url))?;
            let catalog: serde_json::Value = response.json().await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                println!("{:<32} {:<14} {:<6} SUMMARY", "NAME", "FAMILY", "OUTPUT");
                for op in catalog["operations"].as_array().into_iter().flatten() {
                    println!(
                        "{:<32} {:<14} {:<6} {}",
                        op["name"].as_str().unwrap_or("-"),
                        op["family"].as_str().unwrap_or("-"),
                        op["output"].as_str().unwrap_or("-"),
                        op["summary"].as_str().unwrap_or("")
                    );
                }
            }
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    println!("fleetql v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!(
                        "Source: {} ({})",
                        health["source_name"].as_str().unwrap_or("unknown"),
                        health["source"].as_str().unwrap_or("unknown")
                    );
                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => bail!("API returned error: {}", resp.status()),
                Err(e) => {
                    eprintln!("Make sure the fleetql API server is running:");
                    eprintln!("  cargo run --bin fleetql-api");
                    return Err(e).context(format!("cannot reach fleetql API at {}", cli.api_url));
                }
            }
        }

        Commands::Validate { query, resource } => {
            let kind: ResourceKind = resource.parse().map_err(anyhow::Error::msg)?;
            let filter = compile(kind.schema(), &query)?;
            if filter.is_always_true() {
                println!("Valid: empty query matches every {} record", kind);
            } else {
                println!("Valid for {}: {}", kind, filter.canonical());
            }
        }

        Commands::Config { output } => {
            let config = fleetql::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// `key=value` pairs; integers and booleans keep their JSON type
fn parse_args(args: &[String]) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    let mut map = serde_json::Map::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("argument '{}' is not in key=value format", arg);
        };
        let value = match value {
            "true" => serde_json::Value::Bool(true),
            "false" => serde_json::Value::Bool(false),
            _ => match value.parse::<i64>() {
                Ok(n) if key == "size" => n.into(),
                _ => value.into(),
            },
        };
        map.insert(key.trim().to_string(), value);
    }
    Ok(map)
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_table(page: &serde_json::Value, header: bool) {
    let rows = match page["list"].as_array() {
        Some(rows) if !rows.is_empty() => rows,
        _ => {
            if header {
                println!("No records");
            }
            return;
        }
    };

    let columns: Vec<&str> = rows[0]
        .as_object()
        .map(|o| o.keys().map(String::as_str).collect())
        .unwrap_or_default();

    if header {
        if let Some(count) = page["count"].as_u64() {
            println!("{} matching", count);
        }
        println!("{}", columns.join(" | "));
        println!("{}", "-".repeat(columns.iter().map(|c| c.len() + 3).sum()));
    }

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| match &row[*c] {
                serde_json::Value::Null => "-".to_string(),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}
