use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the inference gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health and model version
    Health,
    /// Show circuit breaker state
    Circuit,
    /// Force the circuit breaker closed
    Reset,
    /// Predict a single match
    Predict {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        /// Comma-separated feature values
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        features: Vec<f64>,
        /// Add AI insight and strategic advice
        #[arg(long)]
        ai: bool,
    },
    /// Train the model from a JSON file holding {"data": [[...]], "labels": [...]}
    Train {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Health => {
            client.get(format!("{}/health", cli.url)).send().await?
        }
        Commands::Circuit => {
            client.get(format!("{}/circuit", cli.url)).send().await?
        }
        Commands::Reset => {
            client.post(format!("{}/circuit/reset", cli.url)).send().await?
        }
        Commands::Predict { home, away, features, ai } => {
            let body = json!({
                "home_team": home,
                "away_team": away,
                "features": features,
                "enable_ai": ai,
            });
            client.post(format!("{}/predict", cli.url))
                .json(&body)
                .send()
                .await?
        }
        Commands::Train { file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            client.post(format!("{}/train", cli.url))
                .json(&body)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
