//! Command-line front end for training and batch scoring.
//!
//! Subcommands:
//!   train      -- fit the pipeline and stacked ensemble, print the evaluation, write a bundle
//!   predict    -- score a member table with a bundle and write `ID_MEMBER,Formations` rows
//!   recommend  -- top-k workshops for one JSON record

use anyhow::Context;
use clap::{Parser, Subcommand};
use formation_recommender::dataset::{load_dataset, LoadOptions, TextEncoding};
use formation_recommender::predict::{write_predictions, Recommender};
use formation_recommender::trainer::{run_training, TrainingConfig};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formations", about = "Workshop recommender training and scoring")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train on a member table and write a model bundle.
    Train {
        /// Training CSV.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output bundle path.
        #[arg(long)]
        out: Option<PathBuf>,

        /// YAML training configuration; flags override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input text encoding (latin-1 or utf-8).
        #[arg(long)]
        encoding: Option<TextEncoding>,
    },

    /// Score every member of a table.
    Predict {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        bundle: PathBuf,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value = "latin-1")]
        encoding: TextEncoding,
    },

    /// Recommend workshops for a single JSON record.
    Recommend {
        #[arg(long)]
        bundle: PathBuf,

        /// Inline JSON object with the member's fields.
        #[arg(long)]
        json: String,

        /// Workshops to return; defaults to the value stored in the bundle.
        #[arg(long)]
        top_k: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Train {
            data,
            out,
            config,
            encoding,
        } => {
            let mut config = match config {
                Some(path) => TrainingConfig::load(&path)
                    .with_context(|| format!("reading config {}", path.display()))?,
                None => TrainingConfig::default(),
            };
            if let Some(data) = data {
                config.data_path = data;
            }
            if let Some(out) = out {
                config.bundle_path = out;
            }
            if let Some(encoding) = encoding {
                config.encoding = encoding;
            }

            let outcome = run_training(&config).context("training failed")?;
            println!("{}", outcome.report);
            println!(
                "\nKept {} of {} rows ({} unknown Filiere, {} without labels)",
                outcome.load_report.kept_rows,
                outcome.load_report.total_rows,
                outcome.load_report.dropped_unknown_filiere,
                outcome.load_report.dropped_unlabeled,
            );
            println!("Bundle written to {}", outcome.bundle_path.display());
        }

        Command::Predict {
            data,
            bundle,
            out,
            encoding,
        } => {
            let recommender = Recommender::load(&bundle)
                .with_context(|| format!("loading bundle {}", bundle.display()))?;
            let table = load_dataset(&data, encoding, LoadOptions::inference())
                .with_context(|| format!("loading {}", data.display()))?;
            let predictions = recommender.batch_predict(&table)?;
            let file = File::create(&out).with_context(|| format!("creating {}", out.display()))?;
            write_predictions(BufWriter::new(file), &predictions)?;
            println!("Predictions for {} members written to {}", predictions.len(), out.display());
        }

        Command::Recommend { bundle, json, top_k } => {
            let recommender = Recommender::load(&bundle)
                .with_context(|| format!("loading bundle {}", bundle.display()))?;
            let request: serde_json::Value =
                serde_json::from_str(&json).context("request is not valid JSON")?;
            let k = top_k.unwrap_or_else(|| recommender.default_top_k());
            let recommendations = recommender.recommend_json(&request, k)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "recommendations": recommendations }))?
            );
        }
    }
    Ok(())
}
