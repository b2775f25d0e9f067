use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use memory_stats::memory_stats;

use tracemc::collapse::{Collapsed, collapse};
use tracemc::formats::{prism, trace};
use tracemc::generate::{adjacency_list, generate_ctmc, generate_dtmc, generate_mdp};
use tracemc::normalize::normalize;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Type of model to derive from the trace.
    #[arg(value_enum, short, long, default_value_t = ModelType::Dtmc)]
    model_type: ModelType,
    /// Output the normalized transitions and states.
    #[arg(long)]
    output_normalized: bool,
    /// Output the collapsed transitions with their rule metadata.
    #[arg(long)]
    output_collapsed: bool,
    /// Output the derived model in the PRISM explicit format.
    #[arg(long)]
    output_for_prism: bool,
    /// Output the data for the state viewer.
    #[arg(long)]
    output_state_viewer: bool,
    /// Write the .tra table to this file instead of stdout.
    #[arg(long)]
    tra: Option<PathBuf>,
    /// Write the .lab table to this file instead of stdout.
    #[arg(long)]
    lab: Option<PathBuf>,
    /// Write the .trew table to this file.
    #[arg(long)]
    trew: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum ModelType {
    Dtmc,
    Mdp,
    Ctmc,
}

/// Opens the sink for one output table: the given file, or stdout.
fn sink(path: Option<&PathBuf>) -> io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    })
}

fn write_prism(args: &Args, collapsed: &Collapsed) -> io::Result<()> {
    let adjacency = adjacency_list(&collapsed.edges);
    let (n, t) = (collapsed.node_count, collapsed.edge_count);
    match args.model_type {
        ModelType::Dtmc => {
            // A degenerate distribution fails the .tra table but leaves the
            // independent .lab and .trew tables intact.
            match generate_dtmc(&adjacency) {
                Ok(dtmc) => prism::write_dtmc(&mut sink(args.tra.as_ref())?, n, t, &dtmc)?,
                Err(err) => error!("{err}"),
            }
            prism::write_labels(&mut sink(args.lab.as_ref())?, &collapsed.labels)?;
            if args.trew.is_some() {
                prism::write_rewards(&mut sink(args.trew.as_ref())?, t, collapsed)?;
            }
        }
        ModelType::Mdp => {
            match generate_mdp(&adjacency) {
                Ok(model) => prism::write_mdp(&mut sink(args.tra.as_ref())?, n, t, &model)?,
                Err(err) => error!("{err}"),
            }
            prism::write_labels(&mut sink(args.lab.as_ref())?, &collapsed.labels)?;
            if args.trew.is_some() {
                prism::write_rewards(&mut sink(args.trew.as_ref())?, t, collapsed)?;
            }
        }
        ModelType::Ctmc => {
            let ctmc = generate_ctmc(&adjacency);
            prism::write_ctmc(&mut sink(args.tra.as_ref())?, n, t, &ctmc)?;
            prism::write_labels(&mut sink(args.lab.as_ref())?, &collapsed.labels)?;
        }
    }
    Ok(())
}

fn write_state_viewer(args: &Args, collapsed: &Collapsed) -> io::Result<()> {
    let adjacency = adjacency_list(&collapsed.edges);
    let mut stdout = io::stdout();
    match args.model_type {
        ModelType::Dtmc => match generate_dtmc(&adjacency) {
            Ok(dtmc) => prism::write_dtmc_viewer(&mut stdout, collapsed, &dtmc)?,
            Err(err) => error!("{err}"),
        },
        ModelType::Mdp => warn!("MDP output for state viewer not implemented yet."),
        ModelType::Ctmc => warn!("CTMC output for state viewer not implemented yet."),
    }
    Ok(())
}

fn run(args: &Args, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = trace::parse(input)?;
    let (transitions, states, labels) =
        normalize(&raw.initial, &raw.transitions, &raw.states, &raw.labels);

    if args.output_normalized {
        prism::write_normalized(
            &mut io::stdout(),
            raw.state_count,
            raw.transition_count,
            &transitions,
            &states,
        )?;
    } else if args.output_collapsed {
        let collapsed = collapse(&transitions, &states, &labels);
        prism::write_collapsed(&mut io::stdout(), &collapsed)?;
    } else if args.output_for_prism {
        let collapsed = collapse(&transitions, &states, &labels);
        write_prism(args, &collapsed)?;
    } else if args.output_state_viewer {
        let collapsed = collapse(&transitions, &states, &labels);
        write_state_viewer(args, &collapsed)?;
    } else {
        error!("No valid output option provided.");
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (pre_physical_mem, pre_virtual_mem) = if let Some(usage) = memory_stats() {
        (usage.physical_mem, usage.virtual_mem)
    } else {
        warn!("Couldn't get the current memory usage :(");
        (0, 0)
    };
    let time_start = Instant::now();

    let mut input = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut input) {
        error!("Failed to read trace from stdin: {err}");
        std::process::exit(1);
    }
    if let Err(err) = run(&args, &input) {
        error!("{err}");
        std::process::exit(1);
    }

    let elapsed = time_start.elapsed();
    let (post_physical_mem, post_virtual_mem) = if let Some(usage) = memory_stats() {
        (usage.physical_mem, usage.virtual_mem)
    } else {
        warn!("Couldn't get the current memory usage :(");
        (0, 0)
    };
    info!(
        "Elapsed: {:?}. physical mem used: {:.2} MB. virtual mem used: {:.2} MB",
        elapsed,
        post_physical_mem.saturating_sub(pre_physical_mem) as f64 / 1048576.0,
        post_virtual_mem.saturating_sub(pre_virtual_mem) as f64 / 1048576.0
    );
}
