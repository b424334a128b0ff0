use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use fcnet::{checkpoint, CheckpointRecord, Matrix, Network, NetworkSpec};

/// Build, inspect, and run feed-forward classifier checkpoints.
#[derive(Parser, Debug)]
#[command(name = "fcnet", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a freshly initialised network and save it as a checkpoint
    Init(InitArgs),

    /// Print the architecture and parameter shapes stored in a checkpoint
    Inspect {
        /// Checkpoint file to read
        checkpoint: PathBuf,
    },

    /// Load a checkpoint and classify one input vector
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Where to write the checkpoint
    out: PathBuf,

    /// Architecture as a NetworkSpec JSON file
    #[arg(long, conflicts_with_all = ["input_size", "output_size", "hidden"])]
    spec: Option<PathBuf>,

    /// Width of the input feature vector
    #[arg(long)]
    input_size: Option<usize>,

    /// Number of output classes
    #[arg(long)]
    output_size: Option<usize>,

    /// Comma-separated hidden layer widths, input side first
    #[arg(long, value_delimiter = ',')]
    hidden: Vec<usize>,

    /// Seed for parameter initialisation
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Checkpoint file to load
    checkpoint: PathBuf,

    /// Comma-separated input features
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    input: Vec<f64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Init(args) => run_init(args),
        Commands::Inspect { checkpoint } => run_inspect(checkpoint),
        Commands::Predict(args) => run_predict(args),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let spec = match (&args.spec, args.input_size, args.output_size) {
        (Some(path), _, _) => NetworkSpec::load_json(path)
            .with_context(|| format!("cannot read spec '{}'", path.display()))?,
        (None, Some(input), Some(output)) => NetworkSpec::new(input, output, args.hidden.clone())?,
        _ => bail!("pass either --spec or both --input-size and --output-size"),
    };

    let network = match args.seed {
        Some(seed) => Network::build_seeded(&spec, seed)?,
        None => Network::build(&spec)?,
    };
    checkpoint::save(&args.out, &network)
        .with_context(|| format!("cannot save checkpoint '{}'", args.out.display()))?;

    info!(
        "wrote {} ({} parameters)",
        args.out.display(),
        network.parameter_count()
    );
    Ok(())
}

fn run_inspect(path: PathBuf) -> Result<()> {
    let record = checkpoint::load_record(&path)
        .with_context(|| format!("cannot read checkpoint '{}'", path.display()))?;
    write_summary(&record, &mut io::stdout().lock())?;
    Ok(())
}

fn write_summary(record: &CheckpointRecord, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "input_size:   {}", record.input_size)?;
    writeln!(out, "hidden_sizes: {:?}", record.hidden_sizes)?;
    writeln!(out, "output_size:  {}", record.output_size)?;
    writeln!(out, "parameters:")?;
    for (name, tensor) in record.state_dict.iter() {
        writeln!(out, "  {:<28} {:?}", name, tensor.shape())?;
    }
    writeln!(out, "total scalars: {}", record.state_dict.scalar_count())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let mut network = checkpoint::load(&args.checkpoint)
        .with_context(|| format!("cannot load checkpoint '{}'", args.checkpoint.display()))?;
    network.eval();

    let log_probs = network.forward(&Matrix::row_vector(args.input))?;
    let class = log_probs.row_argmax()[0];

    println!("{:>6}  {:>12}  {:>10}", "class", "log-prob", "prob");
    for (i, lp) in log_probs.row(0).iter().enumerate() {
        let marker = if i == class { "  <" } else { "" };
        println!("{:>6}  {:>12.6}  {:>10.6}{}", i, lp, lp.exp(), marker);
    }
    println!("predicted class: {class}");
    Ok(())
}
