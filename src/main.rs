//! # layerconf CLI
//!
//! This is the binary entry point for the `layerconf` command-line tool.
//!
//! It parses the command line with `clap`, merges the given documents and
//! prints the result to stdout. The merging itself lives in the library
//! crate; the binary only wires up logging, the fetcher and the output.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
