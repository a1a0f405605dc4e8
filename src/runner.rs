use std::path::{Path, PathBuf};

use clap::{Args, Command, FromArgMatches as _};
use log::{info, LevelFilter};

use crate::context::Context;
use crate::encounters;
use crate::error::SimError;
use crate::log::set_log_level;
use crate::parameters::{init_parameters, parameters};
use crate::population::ContextPopulationExt;
use crate::random::ContextRandomExt;
use crate::report::{ContextReportExt, DailyDispatchReport, DiseaseStatusReport, RiskChangeHistogramReport};
use crate::tracing_manager;

/// Default cli arguments for the tracesim runner
#[derive(Args, Debug)]
pub struct BaseArgs {
    /// Random seed, overriding the seed in the parameter file
    #[arg(short, long)]
    pub random_seed: Option<u64>,

    /// Optional path for a global properties config file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Optional path for report output
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Prefix for report file names
    #[arg(long, default_value = "")]
    pub file_prefix: String,

    /// Enable logging at the given level (error, warn, info, debug, trace)
    #[arg(short, long)]
    pub log_level: Option<LevelFilter>,

    /// Replace report files left by an earlier run
    #[arg(short, long)]
    pub force_overwrite: bool,
}

fn create_cli() -> Command {
    let cli = Command::new("tracesim");
    BaseArgs::augment_args(cli)
}

/// Runs a simulation with default cli arguments
///
/// This function parses command line arguments and allows you to define a setup function
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to a `Context` and the parsed `BaseArgs`
///
/// # Errors
/// Returns an error if argument parsing or the setup function fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), SimError>,
{
    let matches = create_cli().get_matches();
    let args = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(&args, setup_fn)
}

fn run_with_args_internal<F>(args: &BaseArgs, setup_fn: F) -> Result<Context, Box<dyn std::error::Error>>
where
    F: Fn(&mut Context, &BaseArgs) -> Result<(), SimError>,
{
    if let Some(level) = args.log_level {
        set_log_level(level);
    }

    let mut context = Context::new();

    let config = (!args.config.is_empty()).then(|| Path::new(&args.config));
    init_parameters(&mut context, config)?;

    let report_config = context.report_options();
    if !args.output_dir.is_empty() {
        report_config.directory(PathBuf::from(&args.output_dir));
    }
    report_config
        .file_prefix(args.file_prefix.clone())
        .overwrite(args.force_overwrite);

    let seed = args.random_seed.unwrap_or(parameters(&context).seed);
    info!("random seed: {seed}");
    context.init_random(seed);

    setup_fn(&mut context, args)?;

    context.execute();
    Ok(context)
}

/// Wires the full model together: population, tracing, encounters and the
/// three daily reports.
///
/// # Errors
///
/// Returns an error if the population cannot be built or a report file cannot be created.
pub fn setup_simulation(context: &mut Context, _args: &BaseArgs) -> Result<(), SimError> {
    context.init_population()?;
    tracing_manager::init(context)?;
    encounters::init(context);
    context.add_report::<DailyDispatchReport>("daily_dispatch")?;
    context.add_report::<RiskChangeHistogramReport>("risk_change_histogram")?;
    context.add_report::<DiseaseStatusReport>("disease_status")?;
    Ok(())
}
