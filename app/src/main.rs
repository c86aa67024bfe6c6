extern crate strum;
#[macro_use]
extern crate strum_macros;

mod log;

use std::num::ParseIntError;
use std::path::PathBuf;

use ::log::info;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use common::image::{read_bios, ControlStoreImage, UROM0_FILE, UROM1_FILE};
use common::TICKS_PER_INTERVAL;
use sim::{Machine, Observer};

use crate::log::{setup_logging, LogSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
enum LogTarget {
    Ucode,
    Sim,
}

/// Microcode control store generator and simulator.
#[derive(Parser, Debug)]
#[command(author, version, long_about = None, arg_required_else_help = true)]
struct Args {
    /// Log targets to enable, comma separated (ucode, sim)
    #[arg(long, value_delimiter = ',')]
    log: Vec<LogTarget>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the two control store banks
    Ucode {
        #[arg(long, default_value = UROM0_FILE)]
        out0: PathBuf,

        #[arg(long, default_value = UROM1_FILE)]
        out1: PathBuf,

        /// Dump the annotated `v2.0 raw` listing to stdout
        #[arg(long)]
        print: bool,
    },

    /// Run a bootstrap image, raw or `v2.0 raw`
    Run {
        bios: PathBuf,

        /// Load bank 0 from a file instead of generating the control store
        #[arg(long, requires = "urom1")]
        urom0: Option<PathBuf>,

        #[arg(long, requires = "urom0")]
        urom1: Option<PathBuf>,

        /// Micro-cycles to run
        #[arg(long, default_value_t = TICKS_PER_INTERVAL)]
        ticks: u64,

        /// Print the machine after every instruction
        #[arg(long)]
        step: bool,

        /// Input register value, latched after the first instruction
        #[arg(long, value_parser = parse_byte)]
        input: Option<u8>,
    },

    /// Evaluate one 8-bit ALU operation
    Alu {
        #[arg(value_parser = parse_byte)]
        a: u8,

        #[arg(value_parser = parse_byte)]
        b: u8,

        /// Function select, 0..=15
        #[arg(value_parser = clap::value_parser!(u8).range(0..16))]
        select: u8,

        #[arg(long)]
        logic: bool,

        #[arg(long)]
        carry: bool,
    },
}

fn parse_byte(s: &str) -> Result<u8, ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

struct Console {
    step: bool,
}

impl Observer for Console {
    fn on_output(&mut self, out: u8) {
        println!("out {:02x}", out);
    }

    fn on_update(&mut self, machine: &Machine) {
        if self.step {
            println!("{:?}", machine);
        }
    }
}

fn generate(out0: PathBuf, out1: PathBuf, print: bool) -> Result<()> {
    let store = ucode::ucode(print).context("control store generation failed")?;
    store
        .write_files(&out0, &out1)
        .with_context(|| format!("could not write `{}` and `{}`", out0.display(), out1.display()))?;
    info!(target: "ucode", "{:?}", store);
    eprintln!("wrote `{}` and `{}`", out0.display(), out1.display());
    Ok(())
}

fn run(
    bios: PathBuf,
    urom: Option<(PathBuf, PathBuf)>,
    ticks: u64,
    step: bool,
    input: Option<u8>,
) -> Result<()> {
    let store = match urom {
        Some((urom0, urom1)) => ControlStoreImage::read_files(&urom0, &urom1)
            .with_context(|| format!("could not load `{}` and `{}`", urom0.display(), urom1.display()))?,
        None => ucode::ucode(false).context("control store generation failed")?,
    };
    let image = read_bios(&bios).with_context(|| format!("could not load `{}`", bios.display()))?;

    let mut machine = Machine::new(&store)?;
    machine.load_bios(&image)?;

    let mut console = Console { step };
    machine.step_instruction(&mut console);
    if let Some(input) = input {
        machine.set_input(input);
    }

    if step {
        while machine.ticks() < ticks {
            machine.step_instruction(&mut console);
        }
    } else {
        machine.run(ticks.saturating_sub(machine.ticks()), &mut console);
        println!("{:?}", machine);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(LogSettings {
        ucode: args.log.contains(&LogTarget::Ucode),
        sim: args.log.contains(&LogTarget::Sim),
    })?;

    match args.command {
        Command::Ucode { out0, out1, print } => generate(out0, out1, print),
        Command::Run { bios, urom0, urom1, ticks, step, input } => {
            run(bios, urom0.zip(urom1), ticks, step, input)
        }
        Command::Alu { a, b, select, logic, carry } => {
            let (result, carry_out, zero) = alu::alu8(a, b, select, logic, carry);
            println!("{:02x} carry:{} zero:{}", result, carry_out as u8, zero as u8);
            Ok(())
        }
    }
}
