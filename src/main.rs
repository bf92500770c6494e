//! Runs the analysis on a JSON type model.
//!
//! Usage: `conceptual [settings file]`. Without an argument `conceptual.toml`
//! is read when present; `CONCEPTUAL_*` variables override either.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use conceptual::analysis::Analysis;
use conceptual::hierarchy::TypeModel;
use conceptual::report::{print_lattice, NodeIds};
use conceptual::settings::{OutputFormat, Settings};
use conceptual::{ConceptualError, Result};

fn run() -> Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(path.as_deref())?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    info!(?settings, "settings loaded");

    let model = match settings.model.as_deref() {
        Some(model) => TypeModel::from_path(model)?,
        None => return Err(ConceptualError::Config("no type model given (set `model`)".to_string())),
    };
    let relation = model.relation();
    info!(types = model.types().len(), pairs = relation.len(), "model loaded");

    let analysis = Analysis::run(&relation, &model, settings.purge)?;
    if settings.print_lattice {
        print!("{}", print_lattice(analysis.lattice(), &relation, &mut NodeIds::new()));
    }
    match settings.output {
        OutputFormat::Text => print!("{}", analysis.print_candidates(&relation)),
        OutputFormat::Json => println!("{}", analysis.candidate_graph(&relation).to_json()?),
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
