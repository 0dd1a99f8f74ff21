use casereport::{
    report, CaseLayout, DuplicatePolicy, FfmpegExtractor, HashColumn, Placeholder, Reconciler, Reconciliation,
    ReportMetadata,
};
use clap::{ArgAction, Parser};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "casereport")]
#[command(author, version, about = "Match a forensic CSV export to its media files and build an HTML report")]
struct Args {
    /// Case directory containing media/ and the CSV export
    path: PathBuf,

    /// Analyst name shown in the report header (prompted if omitted)
    #[arg(long)]
    analyst: Option<String>,

    /// Case number (prompted if omitted)
    #[arg(long = "case")]
    case_number: Option<String>,

    /// Item number (prompted if omitted)
    #[arg(long = "item")]
    item_number: Option<String>,

    /// Column holding the digest (default: try every column)
    #[arg(long)]
    hash_column: Option<String>,

    /// What to do when two media files share a digest: keep-last, keep-first, flag
    #[arg(long, default_value_t = DuplicatePolicy::KeepLast)]
    duplicates: DuplicatePolicy,

    /// ffmpeg binary used for thumbnails
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Seconds before a single thumbnail extraction is abandoned
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Don't extract thumbnails, use the placeholder for every row
    #[arg(long)]
    no_thumbnails: bool,

    /// Image to use instead of the built-in placeholder
    #[arg(long)]
    placeholder: Option<PathBuf>,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Also write a JSON manifest of the run
    #[arg(long)]
    json: Option<PathBuf>,

    /// Don't prompt to open report
    #[arg(long)]
    no_open: bool,

    /// Only show errors (no prompts; missing --analyst/--case/--item stay blank)
    #[arg(short, long)]
    quiet: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    if let Err(e) = run(args) {
        eprintln!("\x1b[31mError:\x1b[0m {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run(args: Args) -> casereport::Result<()> {
    let layout = CaseLayout::discover(&args.path)?;

    if !args.quiet {
        eprintln!("\x1b[1mCasereport - Media Reconciliation\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Export: {}", layout.csv_path.display());
        eprintln!("Media:  {}\n", layout.media_dir.display());
    }

    let ask = !args.quiet;
    let mut stdin = io::stdin().lock();
    let mut stderr = io::stderr();
    let analyst = field(args.analyst, "Analyst name", ask, &mut stdin, &mut stderr);
    let case_number = field(args.case_number, "Case number", ask, &mut stdin, &mut stderr);
    let item_number = field(args.item_number, "Item number", ask, &mut stdin, &mut stderr);
    drop(stdin);
    let metadata = ReportMetadata::new(&layout.title, analyst, case_number, item_number);

    let extractor = FfmpegExtractor::new()
        .with_program(&args.ffmpeg)
        .with_timeout(Duration::from_secs(args.timeout));

    let hash_column = args
        .hash_column
        .map(HashColumn::Named)
        .unwrap_or_default();

    let placeholder = args
        .placeholder
        .map(Placeholder::File)
        .unwrap_or_default();

    let reconciler = Reconciler::new()
        .with_duplicate_policy(args.duplicates)
        .with_hash_column(hash_column)
        .with_extractor(extractor)
        .with_skip_thumbnails(args.no_thumbnails)
        .with_placeholder(placeholder)
        .with_progress(!args.quiet);

    let result = reconciler.run(&layout, &metadata)?;

    if let Some(ref json_path) = args.json {
        report::json::generate(json_path, &metadata, &result)?;
        if !args.quiet {
            eprintln!("\x1b[32mManifest saved: {}\x1b[0m", json_path.display());
        }
    }

    if !args.quiet {
        print_summary(&result);
        eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", layout.report_path.display());

        if !args.no_open {
            offer_open(&layout.report_path);
        }

        eprintln!("\n\x1b[90mReport complete.\x1b[0m");
    }

    Ok(())
}

fn print_summary(result: &Reconciliation) {
    let s = &result.summary;

    eprintln!("\n{}", "─".repeat(70));
    eprintln!("\x1b[1mSummary:\x1b[0m");
    eprintln!("  Media files:        {}", s.media_files);
    eprintln!("  \x1b[32m✓ Matched rows:\x1b[0m     {}", s.matched_rows);
    eprintln!("  \x1b[33m? Unmatched rows:\x1b[0m   {}", s.unmatched_rows);
    eprintln!("  Thumbnails:         {}", s.thumbnails_generated);

    if !s.collisions.is_empty() {
        eprintln!("  \x1b[33mDuplicate digests:\x1b[0m  {}", s.collisions.len());
        for c in &s.collisions {
            eprintln!("    {} {}: {} / {}", c.kind, c.digest, c.existing, c.incoming);
        }
    }
    if !s.skipped_files.is_empty() {
        eprintln!("  \x1b[90mSkipped files:\x1b[0m      {}", s.skipped_files.len());
        for f in &s.skipped_files {
            eprintln!("    {}: {}", f.path.display(), f.reason);
        }
    }
    if !s.thumbnail_failures.is_empty() {
        eprintln!("  \x1b[90mNo thumbnail:\x1b[0m       {}", s.thumbnail_failures.len());
        for f in &s.thumbnail_failures {
            eprintln!("    {}: {}", f.filename, f.reason);
        }
    }
}

/// Use the flag value, or ask on the terminal. Blank when asking is off.
fn field<R: BufRead, W: Write>(value: Option<String>, label: &str, ask: bool, input: &mut R, prompt: &mut W) -> String {
    if let Some(v) = value {
        return v;
    }
    if !ask {
        return String::new();
    }

    let _ = write!(prompt, "{}: ", label);
    prompt.flush().ok();

    let mut line = String::new();
    if input.read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}

fn offer_open(path: &Path) {
    eprint!("\nOpen report in browser? [Y/n] ");
    io::stderr().flush().ok();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        if input.is_empty() || input == "y" || input == "yes" {
            if let Err(e) = open::that(path) {
                eprintln!("Failed to open report: {}", e);
            }
        }
    }
}
