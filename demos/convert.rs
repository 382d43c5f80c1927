//! Converts a single .FIT file to TCX.
//!
//! Usage: convert <INPUT> [OUTPUT]
//!
//! Without an output path the document is printed to stdout.

use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

#[derive(Debug)]
enum Error {
    Io(std::io::Error),
    Conversion(fit2tcx::Error),
}
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}
impl From<fit2tcx::Error> for Error {
    fn from(error: fit2tcx::Error) -> Self {
        Error::Conversion(error)
    }
}

fn run(input: &str, output: Option<&str>) -> Result<(), Error> {
    let bytes = fs::read(Path::new(input))?;
    let xml = fit2tcx::convert(&bytes)?;
    match output {
        Some(path) => {
            fs::write(path, xml)?;
            eprintln!("saved to {path}");
        }
        None => println!("{xml}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let mut args = env::args();
    args.next();
    let Some(input) = args.next() else {
        eprintln!("usage: convert <INPUT> [OUTPUT]");
        return ExitCode::FAILURE;
    };
    let output = args.next();
    match run(&input, output.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{input}: {error:?}");
            ExitCode::FAILURE
        }
    }
}
