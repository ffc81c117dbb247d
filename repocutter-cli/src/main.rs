//! Repocutter — surgical operations on Subversion dump streams.

mod help;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use repocutter_core::commands;
use repocutter_core::{DumpfileSource, LineSource, SubversionRange};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::exit;

#[derive(Parser, Debug)]
#[command(name = "repocutter")]
#[command(author = "Repocutter Contributors")]
#[command(version)]
#[command(about = "Surgical operations on Subversion dump files")]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Suppress progress and warning chatter
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug tracing
    #[arg(short, long, global = true)]
    debug: bool,

    /// Selection range, e.g. 0:HEAD, 12, 3:9,14:17
    #[arg(short, long, global = true)]
    range: Option<String>,

    /// Read the dump from a file instead of standard input
    #[arg(short, long, global = true)]
    infile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pass through only revisions in the range
    Select,

    /// Pass through only revisions outside the range
    Deselect,

    /// Keep only nodes whose path matches one of the patterns
    Sift { patterns: Vec<String> },

    /// Drop every node whose path matches one of the patterns
    Expunge { patterns: Vec<String> },

    /// Rename paths by regexp: FROM TO pairs, ${1} back-references
    Pathrename { patterns: Vec<String> },

    /// Remove the first segment from every path
    Pop,

    /// Swap the first two segments of every path
    Swap,

    /// Delete properties by name
    Propdel { names: Vec<String> },

    /// Set properties: name=value pairs
    Propset { assignments: Vec<String> },

    /// Rename properties: old->new pairs
    Proprename { mappings: Vec<String> },

    /// Replace log messages from a log-listing file
    Setlog {
        #[arg(long)]
        logentries: PathBuf,
    },

    /// Replace file content with a diagnostic string
    Strip { patterns: Vec<String> },

    /// Regexp-substitute over file content: /pattern/replacement/
    Replace { substitution: String },

    /// Replace paths and committers with generated names
    Obscure,

    /// Renumber revisions into a contiguous sequence
    Renumber {
        #[arg(short, long, default_value_t = 0)]
        base: u64,
    },

    /// Strip boring revisions, keeping structure-changing ones (two passes;
    /// needs a seekable file)
    Reduce { file: PathBuf },

    /// List nodes, one condensed line each
    See,

    /// Emit a Subversion-style log listing
    Log,

    /// Scrub UUID, dates, and committers for use as test input
    Testify,

    /// Print the tool version
    Version,

    /// Describe a subcommand
    Help { topic: Option<String> },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version displays are not errors.
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                let _ = err.print();
                exit(0);
            }
            let _ = err.print();
            exit(1);
        }
    };

    let level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::debug!(command = ?cli.command, range = ?cli.range, "dispatching");
    if let Err(err) = run(cli) {
        eprintln!("repocutter: {:#}", err);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let selection = match &cli.range {
        Some(spec) => SubversionRange::parse(spec)?,
        None => SubversionRange::all(),
    };
    let infile = cli.infile;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Version => {
            writeln!(out, "repocutter version {}", env!("CARGO_PKG_VERSION"))?;
        }
        Commands::Help { topic } => {
            help::print(&mut out, topic.as_deref())?;
        }
        Commands::Renumber { base } => {
            // Renumbering covers the whole stream; the range is ignored.
            let mut source = LineSource::new(open_input(&infile)?);
            commands::renumber(&mut source, base, &mut out)?;
        }
        Commands::Reduce { file } => {
            let reader = BufReader::new(
                File::open(&file).with_context(|| format!("cannot open {:?}", file))?,
            );
            let mut source = DumpfileSource::new(reader);
            commands::reduce(&mut source, &mut out)?;
        }
        Commands::Testify => {
            let mut source = DumpfileSource::new(open_input(&infile)?);
            commands::testify(&mut source, &mut out)?;
        }
        command => {
            let mut source = DumpfileSource::new(open_input(&infile)?);
            match command {
                Commands::Select => commands::select(&mut source, &selection, &mut out)?,
                Commands::Deselect => commands::deselect(&mut source, &selection, &mut out)?,
                Commands::Sift { patterns } => {
                    require_args(&patterns, "sift needs at least one pattern")?;
                    commands::sift(&mut source, &selection, &patterns, &mut out)?;
                }
                Commands::Expunge { patterns } => {
                    require_args(&patterns, "expunge needs at least one pattern")?;
                    commands::expunge(&mut source, &selection, &patterns, &mut out)?;
                }
                Commands::Pathrename { patterns } => {
                    if patterns.is_empty() || patterns.len() % 2 != 0 {
                        return Err(anyhow!("pathrename needs FROM TO pattern pairs"));
                    }
                    let pairs: Vec<(String, String)> = patterns
                        .chunks(2)
                        .map(|pair| (pair[0].clone(), pair[1].clone()))
                        .collect();
                    commands::pathrename(&mut source, &selection, &pairs, &mut out)?;
                }
                Commands::Pop => commands::pop(&mut source, &selection, &mut out)?,
                Commands::Swap => commands::swap(&mut source, &selection, &mut out)?,
                Commands::Propdel { names } => {
                    require_args(&names, "propdel needs at least one property name")?;
                    commands::propdel(&mut source, &selection, &names, &mut out)?;
                }
                Commands::Propset { assignments } => {
                    require_args(&assignments, "propset needs at least one name=value")?;
                    commands::propset(&mut source, &selection, &assignments, &mut out)?;
                }
                Commands::Proprename { mappings } => {
                    require_args(&mappings, "proprename needs at least one old->new")?;
                    commands::proprename(&mut source, &selection, &mappings, &mut out)?;
                }
                Commands::Setlog { logentries } => {
                    let text = std::fs::read_to_string(&logentries)
                        .with_context(|| format!("cannot read {:?}", logentries))?;
                    let entries = commands::props::parse_logentries(&text)?;
                    commands::setlog(&mut source, &selection, &entries, &mut out)?;
                }
                Commands::Strip { patterns } => {
                    commands::strip(&mut source, &selection, &patterns, &mut out)?;
                }
                Commands::Replace { substitution } => {
                    commands::replace(&mut source, &selection, &substitution, &mut out)?;
                }
                Commands::Obscure => commands::obscure(&mut source, &selection, &mut out)?,
                Commands::See => commands::see(&mut source, &selection, &mut out)?,
                Commands::Log => commands::log(&mut source, &selection, &mut out)?,
                Commands::Version
                | Commands::Help { .. }
                | Commands::Renumber { .. }
                | Commands::Reduce { .. }
                | Commands::Testify => unreachable!("handled above"),
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn open_input(infile: &Option<PathBuf>) -> Result<Box<dyn BufRead>> {
    Ok(match infile {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open {:?}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn require_args(args: &[String], message: &str) -> Result<()> {
    if args.is_empty() {
        Err(anyhow!("{}", message))
    } else {
        Ok(())
    }
}
