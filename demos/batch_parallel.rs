//! Converts many .FIT files in parallel, one pipeline per file.
//!
//! Usage: batch_parallel <FILES>...
//!
//! Each FILE produces FILE with its extension replaced by `.tcx`. Files that
//! fail to convert are reported and skipped; the batch continues.

use rayon::prelude::*;
use std::path::Path;

fn convert_one(filename: &String) -> Result<(), String> {
    let path = Path::new(filename);
    let bytes = std::fs::read(path).map_err(|error| error.to_string())?;
    let xml = fit2tcx::convert(&bytes).map_err(|error| error.to_string())?;
    let output = path.with_extension("tcx");
    std::fs::write(&output, xml).map_err(|error| error.to_string())?;
    println!("{} -> {}", filename, output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let start = std::time::Instant::now();
    let mut args = std::env::args();
    args.next();
    let files = args.collect::<Vec<_>>();
    files.par_iter().for_each(|filename| {
        if let Err(error) = convert_one(filename) {
            eprintln!("{filename}: {error}");
        }
    });
    eprintln!("{:?}", start.elapsed());
}
