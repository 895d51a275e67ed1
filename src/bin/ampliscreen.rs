use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;

use ampliscreen::blast::parse_blast_xml_file;
use ampliscreen::config::{self, ScreenParams, Settings};
use ampliscreen::pipeline::{PairReport, ScreenOutcome, NO_PRIMERS_MESSAGE};
use ampliscreen::primer::design_primer_pairs;
use ampliscreen::primer3::Primer3;
use ampliscreen::specificity::{assess, PairSpecificity, PairStatus};
use ampliscreen::{report, seqio, ScreenError, Sequence};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ampliscreen CLI
#[derive(Parser)]
#[command(name = "ampliscreen")]
#[command(version)]
#[command(about = "PCR primer design with genome specificity screening", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Worker threads for screening (0 = all cores); overrides the settings file
    #[arg(long, global = true)]
    threads: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Design primer pairs without screening them
    Design {
        /// Single-record FASTA file, or "-" for stdin
        input: String,
        #[command(flatten)]
        design: DesignArgs,
    },

    /// Design primer pairs and screen every amplicon against a genome
    Screen {
        /// Single-record FASTA file, or "-" for stdin
        input: String,
        #[command(flatten)]
        design: DesignArgs,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Genome database to search
        #[arg(long, default_value = "TbruceiTREU927")]
        database: String,
        /// Print every local alignment below its hit
        #[arg(long)]
        alignments: bool,
        /// Write one row per hit to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the full result to this JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Classify the hits of an existing BLAST XML report (-outfmt 5)
    Classify {
        /// BLAST XML file
        xml: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Print every local alignment below its hit
        #[arg(long)]
        alignments: bool,
    },

    /// List the genome databases requests may target
    Databases,
}

#[derive(Args)]
struct DesignArgs {
    /// Optimal primer melting temperature (50-75)
    #[arg(long, default_value_t = 60)]
    melting_temp: i64,
    /// Minimum PCR product size
    #[arg(long, default_value_t = 100)]
    product_min: i64,
    /// Maximum PCR product size
    #[arg(long, default_value_t = 500)]
    product_max: i64,
}

#[derive(Args)]
struct ThresholdArgs {
    /// Lower bound of the conflicting identity window (percent, >= 80)
    #[arg(long, default_value_t = 80)]
    string_min: i64,
    /// Upper bound of the conflicting identity window (percent, <= 99)
    #[arg(long, default_value_t = 99)]
    string_max: i64,
    /// Identical stretch length that risks off-target silencing (15-25)
    #[arg(long, default_value_t = 20)]
    subunit_length: i64,
}

fn main() {
    let log_level = std::env::var("AMPLISCREEN_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let exit_code = match e.downcast_ref::<ScreenError>() {
            Some(ScreenError::Validation { .. }) | Some(ScreenError::Config(_)) => 2,
            Some(ScreenError::Io(_)) | Some(ScreenError::Csv(_)) => 3,
            Some(ScreenError::SearchOutput(_)) | Some(ScreenError::Sequence(_)) => 4,
            Some(ScreenError::DesignService(_))
            | Some(ScreenError::MalformedDesignResponse(_))
            | Some(ScreenError::SearchService(_)) => 5,
            Some(ScreenError::WorkerPool(_)) | None => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = config::load_or_default(cli.config.as_deref())?;
    if let Some(threads) = cli.threads {
        settings.threads = threads;
    }
    configure_tables();

    match cli.command {
        Commands::Design { input, design } => cmd_design(&settings, &input, &design),
        Commands::Screen { input, design, thresholds, database, alignments, csv, json } => {
            let params = ScreenParams {
                melting_temp: design.melting_temp,
                product_min: design.product_min,
                product_max: design.product_max,
                string_min: thresholds.string_min,
                string_max: thresholds.string_max,
                subunit_length: thresholds.subunit_length,
                database,
            };
            cmd_screen(&settings, &input, &params, alignments, csv, json)
        }
        Commands::Classify { xml, thresholds, alignments } => cmd_classify(&xml, &thresholds, alignments),
        Commands::Databases => cmd_databases(&settings),
    }
}

fn read_input(input: &str) -> anyhow::Result<Sequence> {
    let seq = if input == "-" {
        seqio::read_single_fasta_from(std::io::stdin())?
    } else {
        seqio::read_single_fasta(input)?
    };
    info!(id = %seq.id, len = seq.len(), "read query sequence");
    Ok(seq)
}

fn design_only_params(design: &DesignArgs) -> ScreenParams {
    ScreenParams {
        melting_temp: design.melting_temp,
        product_min: design.product_min,
        product_max: design.product_max,
        string_min: 80,
        string_max: 99,
        subunit_length: 20,
        database: String::new(),
    }
}

fn cmd_design(settings: &Settings, input: &str, design: &DesignArgs) -> anyhow::Result<()> {
    let params = design_only_params(design);
    params.validate_design()?;
    let template = read_input(input)?;
    let designer = Primer3::new(&settings.tools.primer3);
    let pairs = design_primer_pairs(&designer, &template, &params.design_params())?;
    if pairs.is_empty() {
        println!("{NO_PRIMERS_MESSAGE}");
        return Ok(());
    }
    let df = report::primers_dataframe(&pairs).context("building primer table")?;
    println!("{df}");
    Ok(())
}

fn cmd_screen(
    settings: &Settings,
    input: &str,
    params: &ScreenParams,
    alignments: bool,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
) -> anyhow::Result<()> {
    params.validate(settings)?;
    let template = read_input(input)?;
    let query = report::QueryInfo::new(&template, params);
    println!(
        "{} ({} bp) | Tm {} | product {} | {} | stringency {} | subunit {}",
        query.query_id.bold(),
        query.query_length,
        query.melting_temp,
        query.product_size(),
        query.database,
        query.stringency,
        query.subunit_length,
    );
    let outcome = ampliscreen::screen_sequence(&template, params, settings)?;

    match &outcome {
        ScreenOutcome::NoPrimers => println!("{NO_PRIMERS_MESSAGE}"),
        ScreenOutcome::Screened(reports) => {
            for r in reports {
                print_pair(r, alignments);
            }
            let df = report::pairs_dataframe(reports).context("building pair table")?;
            println!("{df}");
        }
    }

    if let Some(path) = csv {
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        report::write_hits_csv(&outcome, BufWriter::new(file))?;
        info!(path = %path.display(), "wrote hit table");
    }
    if let Some(path) = json {
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        report::write_json(&query, &outcome, BufWriter::new(file))?;
        info!(path = %path.display(), "wrote JSON report");
    }
    Ok(())
}

fn cmd_classify(xml: &Path, thresholds: &ThresholdArgs, alignments: bool) -> anyhow::Result<()> {
    let thresholds = config::validate_thresholds(thresholds.string_min, thresholds.string_max, thresholds.subunit_length)?;
    let result = parse_blast_xml_file(xml).with_context(|| format!("reading {}", xml.display()))?;
    let specificity = assess(&result, &thresholds);
    println!("{} (query length {})", paint_status(specificity.status), result.query_length);
    print_hits(&specificity, alignments)
}

fn cmd_databases(settings: &Settings) -> anyhow::Result<()> {
    let names = settings.known_databases();
    let paths: Vec<String> = names
        .iter()
        .map(|n| settings.paths.db_dir.join(n).display().to_string())
        .collect();
    let df = df!(
        "database" => names,
        "path"     => paths,
    )?;
    println!("{df}");
    Ok(())
}

fn paint_status(status: PairStatus) -> ColoredString {
    match status {
        PairStatus::Suitable => status.to_string().green().bold(),
        PairStatus::Bad => status.to_string().red().bold(),
    }
}

fn print_pair(r: &PairReport, alignments: bool) {
    let (left_tm, right_tm) = r.pair.melt_temps_display();
    println!(
        "Pair {}: {} {} / {} (Tm {left_tm}/{right_tm}, product {} bp)",
        r.index + 1,
        paint_status(r.specificity.status),
        r.pair.left_seq,
        r.pair.right_seq,
        r.pair.product_size,
    );
    for line in &r.product {
        println!("{}", line.render(|p| p.red().bold().to_string()));
    }
    println!();
    if let Err(e) = print_hits(&r.specificity, alignments) {
        eprintln!("{} {e}", "Warning:".yellow().bold());
    }
}

fn print_hits(specificity: &PairSpecificity, alignments: bool) -> anyhow::Result<()> {
    let hits = &specificity.hits;
    let df = df!(
        "accession"   => hits.iter().map(|h| h.summary.accession.clone()).collect::<Vec<_>>(),
        "description" => hits.iter().map(|h| h.summary.description.clone()).collect::<Vec<_>>(),
        "verdict"     => hits.iter().map(|h| h.verdict.verdict.as_str().to_string()).collect::<Vec<_>>(),
        "reasons"     => hits.iter().map(|h| h.verdict.reasons.join("; ")).collect::<Vec<_>>(),
        "hsps"        => hits.iter().map(|h| h.verdict.metrics.local_alignments as u64).collect::<Vec<_>>(),
        "identity"    => hits.iter().map(|h| h.verdict.metrics.identities_display()).collect::<Vec<_>>(),
        "length"      => hits.iter().map(|h| h.verdict.metrics.aligned_lengths_display()).collect::<Vec<_>>(),
    )?;
    println!("{df}");
    if alignments {
        for h in hits {
            println!("> {} {}", h.summary.accession, h.summary.description);
            for text in &h.alignments {
                println!("{text}");
            }
        }
    }
    Ok(())
}

/// Show all rows and columns with full cell width.
fn configure_tables() {
    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
    std::env::set_var("POLARS_TABLE_WIDTH", "65535");
}
