use std::path::PathBuf;

use clap::Parser;
use log::info;

use prodplan::{
    models::planning::{DefaultBackend, Parameters, PlanningModel, Sets},
    report::Report,
    sensitivity::Sweep,
    Config, Problem,
};

/// Multi-echelon production planning with setup costs and lot sizing
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Directory holding the input tables
    #[clap(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Json file overriding the default configuration
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Run the sensitivity analysis after solving the base model
    #[clap(short, long)]
    sensitivity: bool,

    /// Where the sensitivity analysis writes its results
    #[clap(short, long, default_value = "SA")]
    output_dir: PathBuf,
}

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let problem = Problem::load(&args.data_dir, &config)?;
    let sets = Sets::new(&problem);
    let parameters = Parameters::new(&problem);

    let result = PlanningModel::build(&sets, &parameters).solve()?;
    print!("{}", Report::new(&problem, &result));

    if args.sensitivity {
        let sweep = Sweep::new(&problem, &config.sweep, DefaultBackend);
        for analysis in sweep.run_all() {
            analysis.write(&args.output_dir)?;
        }
        info!(
            "Wrote sensitivity analysis to {}",
            args.output_dir.display()
        );
    }

    Ok(())
}
