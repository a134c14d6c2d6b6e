use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource, Report, Result};

use lmc::output::{file_message, message, MsgColor, Output};
use lmc::{Machine, Program};

/// Assembler and interpreter for the Little Man Computer.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide an assembly file to run
    path: Option<PathBuf>,

    /// Print every executed instruction to stderr
    #[arg(short, long, global = true, env = "LMC_TRACE")]
    trace: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a file and run it, reading input from the terminal
    Run {
        /// Assembly file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a file assembles without running it
    Check {
        /// File to check
        name: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .context_lines(lmc::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match args.command {
        Some(Command::Run { name, minimal }) => run(&name, minimal, args.trace),
        Some(Command::Check { name }) => {
            file_message(MsgColor::Green, "Checking", &name);
            let program = assemble(&name)?;
            message(
                MsgColor::Green,
                "Success",
                format!("{} words, {} labels", program.len(), program.symbols().len()),
            );
            Ok(())
        }
        None => match args.path {
            Some(path) => run(&path, false, args.trace),
            None => {
                println!("\n~ lmc v{VERSION} ~");
                println!("{SHORT_INFO}");
                Ok(())
            }
        },
    }
}

fn run(name: &Path, minimal: bool, trace: bool) -> Result<()> {
    Output::set_minimal(minimal);

    file_message(MsgColor::Green, "Assembling", name);
    let program = assemble(name)?;

    let mut machine = Machine::new();
    machine.load(program.words());
    machine.set_trace(trace);

    message(MsgColor::Green, "Running", "assembled program");
    if let Err(err) = machine.run() {
        message(MsgColor::Red, "Faulted", format!("at pc {}", machine.pc()));
        return Err(err.into());
    }

    message(MsgColor::Cyan, "Halted", format!("accumulator {}", machine.accumulator()));
    file_message(MsgColor::Green, "Completed", name);
    Ok(())
}

/// Read and assemble a source file, attaching the source to any diagnostic.
fn assemble(name: &Path) -> Result<Program> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    lmc::assemble(&src).map_err(|err| {
        Report::new(err).with_source_code(NamedSource::new(name.display().to_string(), src.clone()))
    })
}

const SHORT_INFO: &str = r"
A 100-cell, single accumulator educational computer.
Run a program with `lmc <file>` or `lmc run <file>`.
Please use `-h` or `--help` to access the usage instructions.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
