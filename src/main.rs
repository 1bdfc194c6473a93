//! rrsim: round-robin scheduler simulator

use std::env;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use rrsim::asm::{compile, decompile};
use rrsim::config::Config;
use rrsim::scheduler::{Computer, INIT_PID};

const USAGE: &str = "\
Usage: rrsim <program.s> [options]

Options:
  --cpus N       Number of CPUs
  --quantum Q    Scheduling quantum in ticks (0 disables preemption)
  --ticks N      Maximum number of ticks to run
  --count K      Number of processes to spawn (default 1)
  --disasm       Print the decompiled program
  --check        Compile only
  --dump         Print the final state as TOML
  --config       Print a sample configuration file";

/// Command-line options. Unset values fall back to the loaded config.
#[derive(Debug, Default)]
struct Options {
    path: Option<String>,
    cpus: Option<usize>,
    quantum: Option<u32>,
    ticks: Option<u64>,
    count: usize,
    disasm: bool,
    check: bool,
    dump: bool,
    sample_config: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options {
        count: 1,
        ..Default::default()
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let arg = arg.as_str();
        let mut value = |name: &str| -> anyhow::Result<String> {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value", name))
        };
        match arg {
            "--cpus" => options.cpus = Some(parse_number(&value(arg)?, arg)?),
            "--quantum" => options.quantum = Some(parse_number(&value(arg)?, arg)?),
            "--ticks" => options.ticks = Some(parse_number(&value(arg)?, arg)?),
            "--count" => options.count = parse_number(&value(arg)?, arg)?,
            "--disasm" => options.disasm = true,
            "--check" => options.check = true,
            "--dump" => options.dump = true,
            "--config" => options.sample_config = true,
            flag if flag.starts_with('-') => bail!("unknown option '{}'", flag),
            path => {
                if options.path.is_some() {
                    bail!("more than one program given");
                }
                options.path = Some(path.to_string());
            }
        }
    }
    Ok(options)
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> anyhow::Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("{}: '{}' is not a valid number", name, value))
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!();
            eprintln!("{}", USAGE);
            return Ok(ExitCode::from(2));
        }
    };

    if options.sample_config {
        print!("{}", Config::sample_config());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(path) = options.path.as_deref() else {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::from(2));
    };

    let source =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    let program = match compile(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}: {}", path, e);
            return Ok(ExitCode::FAILURE);
        }
    };
    log::info!("compiled {}: {} instruction(s)", path, program.len());

    if options.disasm {
        print!("{}", decompile(&program));
    }
    if options.check {
        println!("{}: ok ({} instructions)", path, program.len());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::get();
    let cpus = options.cpus.unwrap_or_else(|| config.cpus());
    let quantum = options.quantum.unwrap_or_else(|| config.quantum());
    let max_ticks = options.ticks.unwrap_or_else(|| config.max_ticks());

    let mut computer = Computer::new(cpus, Some(quantum));
    let program = program.shared();
    for _ in 0..options.count {
        computer.spawn(program.clone(), INIT_PID);
    }

    let ticks = computer.run(max_ticks);
    let snapshot = computer.snapshot();

    if options.dump {
        print!("{}", toml::to_string(&snapshot)?);
    } else {
        if options.disasm {
            println!();
        }
        print!("{}", snapshot);
        println!();
        if computer.is_settled() {
            println!("All processes finished after {} tick(s).", ticks);
        } else {
            println!("Stopped after {} tick(s).", ticks);
        }
    }

    Ok(ExitCode::SUCCESS)
}
