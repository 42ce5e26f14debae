use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the integration gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATEWAY_URL", default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "GATEWAY_ADMIN_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Admin view of every integration
    Status,
    /// Aggregate health (Healthy or Degraded)
    Health,
    /// List integration status snapshots
    Integrations,
    /// Force an integration's circuit breaker closed
    Reset {
        name: String,
    },
    /// Send one message through an integration
    Send {
        integration: String,
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client.get(format!("{base}/admin/status"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{base}/health")).send().await?,
        Commands::Integrations => client.get(format!("{base}/v1/integrations")).send().await?,
        Commands::Reset { name } => {
            client.post(format!("{base}/admin/integrations/{name}/reset"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Send { integration, message } => {
            client.post(format!("{base}/v1/messages"))
                .json(&serde_json::json!({
                    "integrationName": integration,
                    "message": message,
                }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{body}");
        Ok(())
    } else {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("{body}");
        std::process::exit(1);
    }
}
