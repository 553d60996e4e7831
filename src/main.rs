use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use bitsim::{Simulator, StepOutcome};

#[derive(Parser, Debug)]
#[command(name = "bitsim")]
#[command(about = "Run a program image on the fixed-width instruction set simulator")]
struct Args {
  /// Path to a program image: a text of 0 and 1 characters, 32 per instruction
  image: PathBuf,

  /// Execute one instruction each time Enter is pressed
  #[arg(long)]
  step: bool,

  /// Print the disassembled program and exit
  #[arg(long)]
  listing: bool,

  /// Stop after this many instructions
  #[arg(long)]
  max_steps: Option<usize>,
}

fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
  init_logging();
  let args = Args::parse();

  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let mut simulator = Simulator::new();
  if let Err(e) = simulator.load_file(&args.image) {
    error!("{}", e);
    process::exit(1);
  }
  info!(instructions = simulator.machine().program().len(), "program loaded");

  if args.listing {
    for (index, line) in simulator.machine().listing().iter().enumerate() {
      println!("{:>3}  {}", index, line);
    }
    return;
  }

  let result = match args.step {
    true  => step(&mut simulator, args.max_steps),
    false => run(&mut simulator, args.max_steps),
  };

  println!("{}", simulator.machine());
  if let Err(e) = result {
    error!("{}", e);
    process::exit(1);
  }
}

fn run(simulator: &mut Simulator, max_steps: Option<usize>) -> bitsim::Result<()> {
  let steps = match max_steps {
    Some(max_steps) => simulator.run_bounded(max_steps)?,
    None            => simulator.run()?,
  };

  match simulator.is_finished() {
    true  => println!("Executed {} instructions.", steps),
    false => println!("Stopped after {} instructions.", steps),
  }
  Ok(())
}

fn step(simulator: &mut Simulator, max_steps: Option<usize>) -> bitsim::Result<()> {
  let stdin = io::stdin();
  let mut lines = stdin.lock().lines();
  let mut steps = 0;

  println!("{}", simulator.machine());
  while max_steps.map_or(true, |max_steps| steps < max_steps) {
    println!("[Enter] step, [q] quit");
    match lines.next() {
      Some(Ok(line)) if line.trim() != "q" => {}
      _ => break,
    }

    match simulator.step()? {
      StepOutcome::Finished => {
        println!("End of program.");
        break;
      }
      StepOutcome::Halted(executed) => {
        println!("{}\nHalted.", executed);
        break;
      }
      StepOutcome::VariablesChanged(executed) => {
        println!("{}", executed);
        for line in simulator.machine().listing() {
          println!("     {}", line);
        }
      }
      StepOutcome::Continued(executed) => println!("{}", executed),
    }
    steps += 1;

    #[cfg(not(feature = "trace_computation"))]
    println!("{}", simulator.machine());
  }
  Ok(())
}
