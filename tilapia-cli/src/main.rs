//! Tilapia CLI

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tilapia_compression::{
    Algorithm, CompressionConfig, CompressionEngine, CompressionResult, EncodingNegotiator,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tilapia")]
#[command(about = "Tilapia response compression toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file the way the buffered middleware would
    Compress {
        /// File to compress
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the compressed bytes
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression level (1-9)
        #[arg(long)]
        level: Option<u32>,

        /// Skip files smaller than this many bytes
        #[arg(long)]
        threshold: Option<usize>,

        /// Force one algorithm instead of keeping the smallest output
        #[arg(short, long)]
        algorithm: Option<Algorithm>,

        /// Configuration file (YAML, TOML or JSON)
        #[arg(short, long, env = "TILAPIA_COMPRESSION_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Decompress a file
    Decompress {
        /// File to decompress
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the decompressed bytes
        #[arg(short, long)]
        output: PathBuf,

        /// Encoding token (br, gzip, deflate)
        #[arg(short, long)]
        algorithm: String,
    },

    /// Show how an Accept-Encoding value is negotiated
    Negotiate {
        /// Accept-Encoding header value
        accept_encoding: String,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Path to configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// JSON summary of a compression run
#[derive(Debug, Serialize)]
struct Summary {
    compressed: bool,
    algorithm: &'static str,
    original_size: usize,
    compressed_size: usize,
    compression_ratio: f64,
}

impl From<&CompressionResult> for Summary {
    fn from(result: &CompressionResult) -> Self {
        Self {
            compressed: result.compressed,
            algorithm: result.algorithm_name(),
            original_size: result.original_size,
            compressed_size: result.compressed_size,
            compression_ratio: result.compression_ratio,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            threshold,
            algorithm,
            config,
        } => {
            let config = match config {
                Some(path) => CompressionConfig::load_from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => CompressionConfig::from_env(),
            };

            let mut options = config.options;
            if let Some(level) = level {
                options.level = level;
            }
            if let Some(threshold) = threshold {
                options.threshold = threshold;
            }
            options.validate()?;

            let payload = Bytes::from(
                tokio::fs::read(&input)
                    .await
                    .with_context(|| format!("reading {}", input.display()))?,
            );
            tracing::debug!(size = payload.len(), "Input loaded");

            let engine = CompressionEngine::new();
            let result = match algorithm {
                Some(algorithm) => engine.compress_with(payload, &options, algorithm).await?,
                None => engine.compress(payload, &options).await,
            };

            if let Some(output) = output {
                tokio::fs::write(&output, &result.data)
                    .await
                    .with_context(|| format!("writing {}", output.display()))?;
            }

            println!("{}", serde_json::to_string_pretty(&Summary::from(&result))?);
            Ok(())
        }

        Commands::Decompress {
            input,
            output,
            algorithm,
        } => {
            let payload = tokio::fs::read(&input)
                .await
                .with_context(|| format!("reading {}", input.display()))?;
            let restored = CompressionEngine::new().decompress(&payload, &algorithm)?;
            tokio::fs::write(&output, &restored)
                .await
                .with_context(|| format!("writing {}", output.display()))?;

            tracing::info!(
                algorithm = %algorithm,
                compressed_size = payload.len(),
                size = restored.len(),
                "Decompressed"
            );
            Ok(())
        }

        Commands::Negotiate { accept_encoding } => {
            let candidates = EncodingNegotiator::supported_algorithms(&accept_encoding);
            let summary = serde_json::json!({
                "candidates": candidates.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
                "best": EncodingNegotiator::best_of(&candidates).map(|a| a.as_str()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }

        Commands::CheckConfig { config } => {
            tracing::info!("Validating configuration: {}", config.display());

            match CompressionConfig::load_from_file(&config) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Enabled: {}", cfg.enabled);
                    tracing::info!("  Level: {}", cfg.options.level);
                    tracing::info!("  Minimum response size: {}", cfg.min_response_size);
                    tracing::info!("  Maximum ratio: {}", cfg.max_ratio);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into()))
        .init();

    Ok(())
}
