//! thicket - split a key across trustees, hide it among decoys, recover it
//!
//! each run generates a random key, builds the anonymity set with the chosen
//! scheme and backend, walks an access order and prints one json summary
//! line to stdout. logs go to stderr.
//!
//! usage:
//!   thicket --scheme thresholded --backend gf16
//!   thicket --params run.json --trustees-first --runs 10
//!   thicket --scheme layered --trustees 30 --dump set.json
//!   thicket --scheme layered --trustees 32 --distinguishable

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use thicket::field::gf16::{key_to_words, words_to_key};
use thicket::{
    generate, recover, shuffled_order, trustees_first, Backend, DealStats, Error, Field, Gf16, Params,
    Recovered, Scheme,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "ristretto255")]
use thicket::Ristretto;

/// thicket simulation driver
#[derive(Parser)]
#[command(name = "thicket")]
#[command(about = "hierarchical secret sharing recovery simulation")]
#[command(version)]
struct Args {
    /// json file with generation and recovery parameters
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// sharing scheme (overrides the params file)
    #[arg(short, long, value_enum)]
    scheme: Option<Scheme>,

    /// field backend
    #[arg(short, long, value_enum, default_value = "ristretto")]
    backend: Backend,

    /// number of real trustees
    #[arg(long)]
    trustees: Option<usize>,

    /// anonymity set size
    #[arg(long)]
    anonymity: Option<usize>,

    /// leaves needed per subsecret
    #[arg(long)]
    threshold: Option<usize>,

    /// search workers per step
    #[arg(long)]
    workers: Option<usize>,

    /// one leaf per trustee (layered scheme)
    #[arg(long)]
    distinguishable: bool,

    /// key length in bytes (gf16 backend)
    #[arg(long, default_value = "32")]
    key_bytes: usize,

    /// visit real trustees before any decoy
    #[arg(long)]
    trustees_first: bool,

    /// number of independent runs
    #[arg(long, default_value = "1")]
    runs: usize,

    /// write the anonymity set of the last run as json
    #[arg(long)]
    dump: Option<PathBuf>,
}

#[derive(Serialize)]
struct Summary {
    run: usize,
    scheme: Scheme,
    backend: Backend,
    #[serde(flatten)]
    stats: DealStats,
    visited: Option<usize>,
    subsecrets: Option<usize>,
    generate_ms: f64,
    recover_ms: f64,
    success: bool,
}

struct Outcome<E> {
    stats: DealStats,
    recovered: Option<Recovered<E>>,
    generate_ms: f64,
    recover_ms: f64,
}

impl<E> Outcome<E> {
    fn summary(&self, run: usize, params: &Params, backend: Backend, success: bool) -> Summary {
        Summary {
            run,
            scheme: params.scheme,
            backend,
            stats: self.stats.clone(),
            visited: self.recovered.as_ref().map(|r| r.visited),
            subsecrets: self.recovered.as_ref().map(|r| r.subsecrets),
            generate_ms: self.generate_ms,
            recover_ms: self.recover_ms,
            success,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("thicket=info".parse()?))
        .init();

    let args = Args::parse();
    let params = load_params(&args)?;
    params.validate().context("invalid parameters")?;

    info!(
        scheme = %params.scheme,
        backend = %args.backend,
        trustees = params.trustees,
        packets = params.anonymity_set_size(),
        runs = args.runs,
        "starting simulation"
    );

    let mut failures = 0;
    for run in 0..args.runs {
        let dump = (run + 1 == args.runs).then_some(args.dump.as_deref()).flatten();
        let summary = match args.backend {
            Backend::Gf16 => run_gf16(&params, &args, run, dump)?,
            Backend::Ristretto => run_ristretto(&params, &args, run, dump)?,
        };
        if !summary.success {
            failures += 1;
        }
        println!("{}", serde_json::to_string(&summary)?);
    }

    if failures > 0 {
        warn!(failures, runs = args.runs, "some runs did not recover the key");
    }
    Ok(())
}

fn load_params(args: &Args) -> Result<Params> {
    let mut params = match &args.params {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Params::default(),
    };
    if let Some(scheme) = args.scheme {
        params.scheme = scheme;
    }
    if let Some(trustees) = args.trustees {
        params.trustees = trustees;
    }
    if let Some(size) = args.anonymity {
        params.anonymity_size = size;
    }
    if let Some(threshold) = args.threshold {
        params.absolute_threshold = threshold;
    }
    if let Some(workers) = args.workers {
        params.workers = workers;
    }
    if args.distinguishable {
        params.distinguishable = true;
    }
    Ok(params)
}

fn run_gf16(params: &Params, args: &Args, run: usize, dump: Option<&Path>) -> Result<Summary> {
    let key = thicket::crypto::random_vec(args.key_bytes);
    let words = key_to_words(&key);
    let field = Gf16::new(words.len());
    let outcome = simulate(&field, &words, params, args, dump)?;
    let success = match &outcome.recovered {
        Some(r) => words_to_key(&r.secret)? == key,
        None => false,
    };
    Ok(outcome.summary(run, params, Backend::Gf16, success))
}

#[cfg(feature = "ristretto255")]
fn run_ristretto(params: &Params, args: &Args, run: usize, dump: Option<&Path>) -> Result<Summary> {
    let field = Ristretto;
    let secret = field.random();
    let outcome = simulate(&field, &secret, params, args, dump)?;
    let success = outcome.recovered.as_ref().is_some_and(|r| r.secret == secret);
    Ok(outcome.summary(run, params, Backend::Ristretto, success))
}

#[cfg(not(feature = "ristretto255"))]
fn run_ristretto(_params: &Params, _args: &Args, _run: usize, _dump: Option<&Path>) -> Result<Summary> {
    anyhow::bail!("built without the ristretto255 backend")
}

fn simulate<F>(
    field: &F,
    secret: &F::Elem,
    params: &Params,
    args: &Args,
    dump: Option<&Path>,
) -> Result<Outcome<F::Elem>>
where
    F: Field,
    F::Elem: Serialize,
{
    let start = Instant::now();
    let deal = generate(field, params, secret).context("generating anonymity set")?;
    let generate_ms = millis(start);

    if let Some(path) = dump {
        let json = serde_json::to_vec_pretty(&deal.set)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "wrote anonymity set");
    }

    let order = if args.trustees_first {
        trustees_first(&deal.set)
    } else {
        shuffled_order(deal.set.len())
    };

    let start = Instant::now();
    let recovered = match recover(field, params, &deal.set, &order) {
        Ok(out) => Some(out),
        Err(Error::SecretNotFound) => None,
        Err(e) => return Err(e).context("recovering secret"),
    };

    Ok(Outcome {
        stats: deal.stats(),
        recovered,
        generate_ms,
        recover_ms: millis(start),
    })
}

fn millis(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
