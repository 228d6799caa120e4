//! `vecmetric` - inspect capability detection and kernel dispatch.
//!
//! ```text
//! vecmetric caps
//! vecmetric --allow serial compute cosine f32 "1,2,3" "4,5,6"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vecmetric_core::{
    capabilities, Capabilities, DataType, DispatchConfig, Dispatcher, MetricKind, Score,
};

mod vectors;

#[cfg(test)]
mod vectors_tests;

use vectors::parse_pair;

/// Runtime-dispatched SIMD similarity kernels
#[derive(Parser, Debug)]
#[command(name = "vecmetric")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with the dispatch configuration
    #[arg(short, long, global = true, env = "VECMETRIC_CONFIG")]
    config: Option<PathBuf>,

    /// Allowed capabilities (e.g. "avx2,neon", "serial", "all"); overrides the configuration
    #[arg(short, long, global = true, value_parser = parse_capabilities)]
    allow: Option<Capabilities>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show detected capabilities and the tier chosen for every metric and type
    Caps,
    /// Evaluate a metric on two literal vectors
    Compute {
        /// Metric name or alias (dot, cos, l2sq, hamming, tanimoto, ...)
        #[arg(value_parser = parse_metric)]
        metric: MetricKind,
        /// Element type (f64, f32, f16, i8, b1)
        #[arg(value_parser = parse_datatype)]
        datatype: DataType,
        /// First vector, e.g. "1,2,3"
        a: String,
        /// Second vector
        b: String,
    },
}

fn parse_capabilities(s: &str) -> Result<Capabilities, String> {
    s.parse().map_err(|e: vecmetric_core::Error| e.to_string())
}

fn parse_metric(s: &str) -> Result<MetricKind, String> {
    s.parse().map_err(|e: vecmetric_core::Error| e.to_string())
}

fn parse_datatype(s: &str) -> Result<DataType, String> {
    s.parse().map_err(|e: vecmetric_core::Error| e.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = DispatchConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration from the environment".to_string(),
    })?;
    let allowed = cli.allow.unwrap_or(config.allowed);
    tracing::debug!(%allowed, "using capability mask");
    let dispatcher = Dispatcher::new(allowed);

    match cli.command {
        Command::Caps => cmd_caps(&dispatcher, cli.json),
        Command::Compute {
            metric,
            datatype,
            a,
            b,
        } => cmd_compute(&dispatcher, metric, datatype, &a, &b, cli.json),
    }
}

fn cmd_caps(dispatcher: &Dispatcher, json: bool) -> Result<()> {
    if json {
        let kernels: Vec<_> = dispatcher
            .handles()
            .map(|h| {
                serde_json::json!({
                    "metric": h.kind(),
                    "datatype": h.datatype(),
                    "tier": h.tier(),
                })
            })
            .collect();
        let report = serde_json::json!({
            "detected": capabilities(),
            "allowed": dispatcher.allowed(),
            "viable": dispatcher.viable(),
            "kernels": kernels,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("detected: {}", capabilities());
    println!("allowed:  {}", dispatcher.allowed());
    println!("viable:   {}", dispatcher.viable());
    println!();

    print!("{:<20}", "metric");
    for datatype in DataType::ALL {
        print!("{:<8}", datatype.name());
    }
    println!();
    for kind in MetricKind::ALL {
        print!("{:<20}", kind.name());
        for datatype in DataType::ALL {
            let cell = dispatcher
                .get(kind, datatype)
                .map_or("-", |handle| handle.tier().name());
            print!("{cell:<8}");
        }
        println!();
    }
    Ok(())
}

fn cmd_compute(
    dispatcher: &Dispatcher,
    metric: MetricKind,
    datatype: DataType,
    a: &str,
    b: &str,
    json: bool,
) -> Result<()> {
    let (left, right) = parse_pair(datatype, a, b)?;
    let handle = dispatcher.get(metric, datatype)?;
    let score = handle.compute(left.view(), right.view())?;

    if json {
        let value = match score {
            Score::Real(v) => serde_json::json!(v),
            Score::Count(c) => serde_json::json!(c),
        };
        let report = serde_json::json!({
            "metric": metric,
            "datatype": datatype,
            "tier": handle.tier(),
            "dimension": left.view().len(),
            "score": value,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match score {
            Score::Real(v) => println!("{v}"),
            Score::Count(c) => println!("{c}"),
        }
        tracing::info!(%metric, %datatype, tier = %handle.tier(), "computed");
    }
    Ok(())
}
