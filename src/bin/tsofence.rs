//! TSO fence insertion driver for TIR modules.
//!
//! # Usage
//!
//! ```bash
//! # Show where fences go
//! tsofence input.tir --print-fences
//!
//! # Write the fenced module
//! tsofence input.tir --emit -o fenced.tir
//!
//! # Plain TSO hardware ordering, hazards inside basic blocks only
//! tsofence input.tir --relax-read-read --scope block --print-hazards
//! ```

use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tsofence::test_ir::{run_fence_pass, ReportOptions, TestIR};
use tsofence::tso::{PairScope, PassConfig};
use tsofence::FenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scope {
    /// Compare every pair of accesses in a function
    Function,
    /// Compare only accesses within one basic block
    Block,
}

#[derive(Parser)]
#[command(name = "tsofence")]
#[command(about = "Insert memory fences that keep TIR modules correct under TSO", long_about = None)]
struct Cli {
    /// Input TIR file (stdin when omitted)
    input: Option<PathBuf>,

    /// Print the collected memory accesses
    #[arg(long)]
    print_events: bool,

    /// Print every hazardous pair
    #[arg(long)]
    print_hazards: bool,

    /// Print the fence plan and whether the module changed
    #[arg(long)]
    print_fences: bool,

    /// Print run statistics
    #[arg(long)]
    stats: bool,

    /// Print the fenced module
    #[arg(long)]
    emit: bool,

    /// Write the fenced module to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the cross-function step
    #[arg(long)]
    no_cross_function: bool,

    /// Do not treat load-then-load as a hazard
    #[arg(long)]
    relax_read_read: bool,

    /// Which pairs inside a function are compared
    #[arg(long, value_enum, default_value = "function")]
    scope: Scope,

    /// Treat alias information as unavailable for this function
    #[arg(long = "no-alias-info", value_name = "FUNC")]
    no_alias_info: Vec<String>,
}

fn read_input(path: Option<&PathBuf>) -> Result<String, FenceError> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let text = read_input(cli.input.as_ref())?;
    let ir = TestIR::parse(&text).map_err(|reason| FenceError::Parse { reason })?;

    let config = PassConfig::default()
        .with_cross_function(!cli.no_cross_function)
        .with_read_read_hazards(!cli.relax_read_read)
        .with_scope(match cli.scope {
            Scope::Function => PairScope::Function,
            Scope::Block => PairScope::Block,
        });

    let run = run_fence_pass(&ir, config, &cli.no_alias_info)?;

    let options = ReportOptions {
        ir: false,
        events: cli.print_events,
        hazards: cli.print_hazards,
        fences: cli.print_fences,
        stats: cli.stats,
        fenced: false,
    };
    let report = run.render(&options)?;
    if !report.is_empty() {
        println!("{}", report);
    }

    // With no report requested the fenced module is the output.
    let emit = cli.emit || cli.output.is_some() || report.is_empty();
    if emit {
        let fenced = run.render_fenced()?;
        match &cli.output {
            Some(path) => fs::write(path, format!("{}\n", fenced))?,
            None => println!("{}", fenced),
        }
    }

    Ok(())
}
