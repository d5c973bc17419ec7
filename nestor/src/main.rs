#![forbid(unsafe_code)]

use std::{fs, path::PathBuf};

use clap::Parser;
use miette::{IntoDiagnostic, NamedSource};

use nestor_sema::{Analysis, ReferenceVerdict, Sema};

/// Reports nested classes that can be declared static.
#[derive(Parser)]
#[command(name = "nestor", version)]
struct Cli {
    /// Source file to analyze.
    file: PathBuf,

    /// Only print classes that can be converted.
    #[arg(long)]
    quiet: bool,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let src = fs::read_to_string(&cli.file).into_diagnostic()?;
    let program = nestor_parse::parse_source(&src).map_err(|report| {
        report.with_source_code(NamedSource::new(cli.file.display().to_string(), src.clone()))
    })?;

    let sema = Sema::new(&program);
    let mut results = sema.analyze_all();
    results.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, analysis) in results {
        match analysis {
            Analysis::Analyzed(ReferenceVerdict::NoOuterReference) => {
                println!("{path}: can be static");
            }
            _ if cli.quiet => {}
            Analysis::Ineligible(reason) => println!("{path}: not eligible ({reason})"),
            Analysis::Analyzed(ReferenceVerdict::OuterReference(reason)) => {
                println!("{path}: cannot be static ({reason})");
            }
        }
    }

    Ok(())
}
