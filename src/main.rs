//! Penguin inference service - main entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use penguin_serve::boosting::BoostingConfig;
use penguin_serve::server::{self, ServerConfig};
use penguin_serve::training::{run_training, TrainOptions};

#[derive(Parser)]
#[command(name = "penguin-serve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Penguin species inference service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP inference server
    Serve {
        /// Host to bind (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides API_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Directory with model.json, columns.json, label_classes.json
        #[arg(long)]
        data_dir: Option<String>,
    },
    /// Train the classifier and write serving artifacts
    Train {
        /// Penguins CSV file
        #[arg(long)]
        data: PathBuf,
        /// Output directory for the artifacts
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
        /// Number of boosting rounds
        #[arg(long, default_value_t = 100)]
        n_estimators: usize,
        /// Maximum tree depth
        #[arg(long, default_value_t = 3)]
        max_depth: usize,
        /// Learning rate
        #[arg(long, default_value_t = 0.3)]
        learning_rate: f64,
        /// Random seed for subsampling and the train/test split
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "penguin_serve=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train {
            data,
            out_dir,
            n_estimators,
            max_depth,
            learning_rate,
            seed,
        }) => {
            let opts = TrainOptions {
                config: BoostingConfig {
                    n_estimators,
                    max_depth,
                    learning_rate,
                    random_state: Some(seed),
                    ..Default::default()
                },
                ..TrainOptions::new(data, out_dir)
            };
            let summary = run_training(&opts)?;
            println!("Training complete.");
            println!("Train macro F1: {:.4}", summary.train_report.macro_f1);
            println!("Test macro F1:  {:.4}", summary.test_report.macro_f1);
            println!("\nClassification Report (Test):\n");
            println!("{}", summary.test_report.render());
        }
        Some(Commands::Serve {
            host,
            port,
            data_dir,
        }) => {
            let mut config = ServerConfig::default();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            server::run(config).await?;
        }
        None => {
            server::run(ServerConfig::default()).await?;
        }
    }

    Ok(())
}
