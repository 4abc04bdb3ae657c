// Copyright 2023 Viktor Reusch
//
// This file is part of gpx_kml_geojson.
//
// gpx_kml_geojson is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// gpx_kml_geojson is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with gpx_kml_geojson. If not, see <https://www.gnu.org/licenses/>.

//! This is a simple command-line interface for the GPX/KML-to-GeoJSON
//! converter.

use std::{
    fs::{self, File},
    io::{self, stdout, BufWriter, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use gpx_kml_geojson::{convert, Format};
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Convert GPX or KML to GeoJSON.
#[derive(Parser, Debug)]
#[command(name = "gpx_kml_geojson", version, about)]
struct Cli {
    /// Input file, `-` or nothing for STDIN.
    input: Option<PathBuf>,

    /// Output file, STDOUT if missing.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source format, detected from the root element if missing.
    #[arg(short, long, value_parser = parse_format)]
    format: Option<Format>,

    /// Indent the GeoJSON output.
    #[arg(short, long)]
    pretty: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("conversion failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = read_source(cli.input.as_deref())?;
    let collection = convert(&source, cli.format)?;
    debug!(features = collection.features.len(), "converted");

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(stdout().lock()),
    };
    let mut sink = BufWriter::new(sink);
    if cli.pretty {
        serde_json::to_writer_pretty(&mut sink, &collection)?;
    } else {
        serde_json::to_writer(&mut sink, &collection)?;
    }
    writeln!(sink)?;
    sink.flush()?;

    Ok(())
}

/// Read the whole input from `path`, or from STDIN for `None` and `-`.
fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("reading STDIN")?;
            Ok(source)
        }
    }
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse().map_err(|_| format!("expected `gpx` or `kml`, got `{s}`"))
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
