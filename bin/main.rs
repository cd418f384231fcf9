use clap::Parser;
use dfa::analysis::{self, ConditionOutcome, DfType, Options, Status};
use dfa::il::{self, ControlFlowGraph};
use dfa::Error;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

/// Analyze a json control flow graph, and print what is known at each
/// instruction.
#[derive(Debug, Parser)]
#[command(name = "dfa", version, about)]
struct Args {
    /// The control flow graph, as json.
    control_flow_graph: PathBuf,

    /// Initial slot bindings, as a json list of `[slot, dftype]` pairs.
    #[arg(short, long)]
    initial: Option<PathBuf>,

    /// Analysis options, as json. Flags override values read here.
    #[arg(short, long)]
    options: Option<PathBuf>,

    #[arg(long)]
    widening_threshold: Option<usize>,

    #[arg(long)]
    max_call_depth: Option<usize>,

    #[arg(long)]
    max_steps: Option<usize>,

    /// Abort the analysis after this many milliseconds.
    #[arg(long)]
    time_budget_ms: Option<u64>,

    /// Print only branches with a constant condition, and unreachable
    /// offsets.
    #[arg(short, long)]
    quiet: bool,
}

fn options(args: &Args) -> Result<Options, Error> {
    let mut options = match args.options {
        Some(ref path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Options::default(),
    };
    if let Some(widening_threshold) = args.widening_threshold {
        options.set_widening_threshold(widening_threshold);
    }
    if let Some(max_call_depth) = args.max_call_depth {
        options.set_max_call_depth(max_call_depth);
    }
    if let Some(max_steps) = args.max_steps {
        options.set_max_steps(max_steps);
    }
    if let Some(time_budget_ms) = args.time_budget_ms {
        options.set_time_budget(Some(Duration::from_millis(time_budget_ms)));
    }
    Ok(options)
}

fn initial(args: &Args) -> Result<BTreeMap<il::Slot, DfType>, Error> {
    Ok(match args.initial {
        Some(ref path) => {
            let bindings: Vec<(il::Slot, DfType)> =
                serde_json::from_str(&fs::read_to_string(path)?)?;
            bindings.into_iter().collect()
        }
        None => BTreeMap::new(),
    })
}

fn run(args: &Args) -> Result<Status, Error> {
    let control_flow_graph =
        ControlFlowGraph::from_json(&fs::read_to_string(&args.control_flow_graph)?)?;
    let analysis = analysis::analyze(&control_flow_graph, &initial(args)?, &options(args)?, None)?;

    if !args.quiet {
        for instruction in control_flow_graph.instructions() {
            println!("{}", instruction);
            match analysis.state(instruction.offset()) {
                Some(state) => println!("       {}", state),
                None => println!("       unreachable"),
            }
        }
        println!();
    }

    for (offset, outcome) in analysis.constant_conditions() {
        let outcome = if outcome {
            ConditionOutcome::AlwaysTrue
        } else {
            ConditionOutcome::AlwaysFalse
        };
        println!("condition at {} is {}", offset, outcome);
    }
    let unreachable = analysis.unreachable();
    if !unreachable.is_empty() {
        println!(
            "unreachable: {}",
            unreachable
                .iter()
                .map(|offset| offset.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        );
    }
    println!("{} steps", analysis.steps());

    Ok(analysis.status())
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    match run(&args) {
        Ok(Status::Complete) => {}
        Ok(Status::Aborted(reason)) => {
            eprintln!("analysis aborted: {:?}, results are partial", reason);
            process::exit(2);
        }
        Err(error) => {
            eprintln!("error: {}", error);
            process::exit(1);
        }
    }
}
