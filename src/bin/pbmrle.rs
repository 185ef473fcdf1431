use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use env_logger::Env;

use pbmrle::convert::{Command, Options};
use pbmrle::decoder::Validation;

const EXIT_ERROR: i32 = 1;
const EXIT_ABORTED: i32 = 2;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Run-length compress a P4 image into C4
    Compress,
    /// Expand a C4 image back into P4
    Decompress,
    /// Convert a P1 text image into P4
    #[value(name = "texttobin")]
    TextToBin,
    /// Convert a P4 image into P1 text
    #[value(name = "bintotext")]
    BinToText,
}
impl From<Mode> for Command {
    fn from(mode: Mode) -> Command {
        match mode {
            Mode::Compress => Command::Compress,
            Mode::Decompress => Command::Decompress,
            Mode::TextToBin => Command::TextToBin,
            Mode::BinToText => Command::BinToText,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pbmrle")]
#[command(author, version, about = "Convert between text, raw and run-length compressed bitmaps", long_about = None)]
struct Args {
    /// Conversion to perform
    #[arg(value_enum)]
    command: Mode,

    /// Input file
    input: PathBuf,

    /// Output file, only created if the conversion succeeds
    output: PathBuf,

    /// Accept compressed images whose runs do not add up to the image size
    #[arg(long)]
    lenient: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{}", e);
                process::exit(0);
            }
            _ => {
                print!("{}", e);
                process::exit(EXIT_ERROR);
            }
        },
    };

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let options = Options {
        validation: if args.lenient { Validation::Lenient } else { Validation::Strict },
    };
    let command = Command::from(args.command);

    match command.run(&args.input, &args.output, &options) {
        Ok(()) => {
            println!("Conversion complete, output file is \"{}\".", args.output.display());
        }
        Err(e) => {
            println!("{}", e);
            process::exit(if e.is_abort() { EXIT_ABORTED } else { EXIT_ERROR });
        }
    }
}
