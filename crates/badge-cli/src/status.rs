//! # Status Subcommand
//!
//! `badge status decode <ENCODED_LIST> --index <N>` reads one bit of a
//! published `encodedList` and prints `1` (set) or `0` (clear).
//! `--stats` adds the decoded length and bit density on stderr.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use badge_status::decode_encoded_list;

/// Arguments for `badge status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub command: StatusCommand,
}

#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    /// Read one bit of an encoded status list.
    Decode {
        /// The `encodedList` value (multibase `u` prefix optional).
        encoded_list: String,

        /// Bit index to read.
        #[arg(long)]
        index: usize,

        /// Print list length and density to stderr.
        #[arg(long)]
        stats: bool,
    },
}

pub fn run_status(args: &StatusArgs) -> Result<u8> {
    match &args.command {
        StatusCommand::Decode {
            encoded_list,
            index,
            stats,
        } => cmd_decode(encoded_list, *index, *stats),
    }
}

fn cmd_decode(encoded_list: &str, index: usize, stats: bool) -> Result<u8> {
    let bits = decode_encoded_list(encoded_list.trim()).context("invalid encodedList")?;
    if stats {
        eprintln!(
            "length: {} bits, set: {}, density: {:.6}",
            bits.len(),
            bits.count_ones(),
            bits.density()
        );
    }
    let bit = bits
        .get(index)
        .with_context(|| format!("index {index} is outside a list of {} bits", bits.len()))?;
    println!("{}", u8::from(bit));
    Ok(0)
}
