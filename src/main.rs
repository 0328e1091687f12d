use clap::{Args, Parser, Subcommand};
use diffsearch::oracle::{ExternalCipher, estimate_differential};
use diffsearch::search::parallel::{ConsoleReporter, ParallelConfig, run_parallel_search};
use diffsearch::search::{
    BranchAndBound, DifferentialSearch, ExhaustiveSearch, PruningPolicy, SearchConfig,
    ranked_endings,
};
use diffsearch::table::loader::{load_table, parse_difference, write_table};
use diffsearch::table::spn::{HEYS_SBOX, SpnLayer, parse_sbox};
use diffsearch::{DiffError, Difference, Result, RoundTable};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "diffsearch")]
#[command(about = "diffsearch - differential characteristic search for SPN ciphers")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the one-round table comes from
#[derive(Args, Debug)]
struct TableArgs {
    /// Table file in the diffsearch text format
    #[arg(long, conflicts_with = "sbox")]
    table: Option<PathBuf>,
    /// S-box of a Heys-style 16-bit SPN, as hex digits (default: tutorial S-box)
    #[arg(long)]
    sbox: Option<String>,
    /// Drop SPN transitions below this probability when building the table
    #[arg(long, default_value = "0")]
    min_probability: f64,
}

/// Search options shared by the search commands
#[derive(Args, Debug)]
struct SearchArgs {
    /// Number of rounds the characteristic spans
    #[arg(long, short, default_value = "5")]
    rounds: usize,
    /// Pruning policy: exhaustive, best-so-far or threshold:<p>
    #[arg(long, default_value = "exhaustive")]
    pruning: PruningPolicy,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every starting difference in parallel and report the best characteristic
    Search {
        #[command(flatten)]
        table: TableArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Number of worker threads (default: number of CPUs)
        #[arg(long, short = 'j')]
        cores: Option<usize>,
        /// Stop after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// First starting difference to search (hex or decimal)
        #[arg(long, value_parser = parse_difference)]
        first: Option<Difference>,
        /// End of the starting-difference range, exclusive (hex or decimal)
        #[arg(long, value_parser = parse_difference)]
        end: Option<Difference>,
    },
    /// Search a single starting difference and list the strongest endings
    Single {
        #[command(flatten)]
        table: TableArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Starting difference (hex or decimal)
        #[arg(long, value_parser = parse_difference)]
        start: Difference,
        /// Number of endings to print
        #[arg(long, default_value = "10")]
        top: usize,
        /// Compare against unpruned enumeration (small tables only)
        #[arg(long)]
        cross_check: bool,
    },
    /// Build a Heys-style SPN round table and write it to a file
    BuildTable {
        /// S-box as hex digits (default: tutorial S-box)
        #[arg(long)]
        sbox: Option<String>,
        /// Drop transitions below this probability
        #[arg(long, default_value = "0")]
        min_probability: f64,
        /// Output file
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Estimate a differential empirically through an external cipher binary
    Verify {
        /// Cipher executable
        #[arg(long)]
        executable: PathBuf,
        /// Program used to launch the executable (e.g. wine)
        #[arg(long)]
        launcher: Option<String>,
        /// S-box variant number passed to the cipher
        #[arg(long, default_value = "1")]
        sbox_number: u32,
        /// Directory for temporary block files
        #[arg(long)]
        temp_dir: Option<PathBuf>,
        /// Input difference (hex or decimal)
        #[arg(long, value_parser = parse_word)]
        input: u16,
        /// Expected output difference (hex or decimal)
        #[arg(long, value_parser = parse_word)]
        output: u16,
        /// Number of plaintext pairs
        #[arg(long, default_value = "10000")]
        samples: usize,
        /// Key words, comma separated hex (default: the cipher's own key)
        #[arg(long, value_delimiter = ',', value_parser = parse_word)]
        key: Option<Vec<u16>>,
        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,
        /// Keep temporary files and show the cipher's output
        #[arg(long)]
        debug: bool,
    },
}

fn parse_word(text: &str) -> std::result::Result<u16, String> {
    let value = parse_difference(text)?;
    u16::try_from(value).map_err(|_| format!("{} does not fit in 16 bits", text))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// --- Table Construction ---

fn spn_layer(sbox: Option<&str>) -> Result<SpnLayer> {
    let sbox = match sbox {
        Some(text) => parse_sbox(text)?,
        None => HEYS_SBOX.to_vec(),
    };
    SpnLayer::heys(sbox)
}

fn build_table(args: &TableArgs) -> Result<RoundTable> {
    match &args.table {
        Some(path) => load_table(path),
        None => spn_layer(args.sbox.as_deref())?.round_table(args.min_probability),
    }
}

fn search_config(args: &SearchArgs) -> Result<SearchConfig> {
    let config = SearchConfig::default()
        .with_rounds(args.rounds)
        .with_pruning(args.pruning);
    config.validate()?;
    Ok(config)
}

// --- Commands ---

fn run_search(
    table: &TableArgs,
    search: &SearchArgs,
    mut parallel: ParallelConfig,
    range: (Option<Difference>, Option<Difference>),
) -> Result<()> {
    let table = Arc::new(build_table(table)?);
    let config = search_config(search)?;
    let (first, end) = range;
    if first.is_some() || end.is_some() {
        parallel = parallel.with_range(first.unwrap_or(1), end.unwrap_or(table.blocks()));
    }
    println!(
        "Searching {}-round characteristics over {} differences ({} transitions, pruning: {})",
        config.rounds,
        table.blocks(),
        table.transition_count(),
        config.pruning
    );

    let result = run_parallel_search(table, &config, &parallel, &mut ConsoleReporter::stdout())?;

    println!();
    match result.best {
        Some(best) => println!("Best characteristic: {}", best),
        None => println!("No characteristic with a non-zero ending difference was found."),
    }
    for worker in &result.workers {
        match worker.best {
            Some(best) => println!("  worker {}: {}", worker.worker_id, best),
            None => println!("  worker {}: none", worker.worker_id),
        }
    }
    if !result.completed {
        println!("Search was stopped before every starting difference was covered.");
    }
    println!("\nSearch statistics:");
    print!("{}", result.total_statistics.format_summary());
    println!("Wall time: {:.2?}", result.elapsed);
    Ok(())
}

fn run_single(
    table: &TableArgs,
    search: &SearchArgs,
    start: Difference,
    top: usize,
    cross_check: bool,
) -> Result<()> {
    let table = build_table(table)?;
    let config = search_config(search)?;
    if start >= table.blocks() {
        return Err(DiffError::config(format!(
            "start difference {:#x} is outside the {}-difference table",
            start,
            table.blocks()
        )));
    }

    let mut engine = BranchAndBound::with_pruning(&table, config.pruning);
    let timer = Instant::now();
    let probabilities = engine.search(start, config.rounds);
    let elapsed = timer.elapsed();

    let ranked = ranked_endings(&probabilities);
    println!(
        "{} reachable endings from {:#06x} after {} rounds ({:.2?})",
        ranked.len(),
        start,
        config.rounds,
        elapsed
    );
    for ending in ranked.iter().take(top) {
        println!("  {}", ending);
    }
    println!("\nSearch statistics:");
    print!("{}", engine.statistics().format_summary());

    if cross_check {
        let mut reference = ExhaustiveSearch::new(&table);
        let expected = reference.search(start, config.rounds);
        let mismatches = expected
            .iter()
            .zip(&probabilities)
            .filter(|(e, p)| e != p)
            .count();
        if mismatches == 0 {
            println!("Cross-check: all {} endings match exhaustive enumeration", expected.len());
        } else if config.pruning.is_exact() {
            return Err(DiffError::config(format!(
                "cross-check failed: {} endings differ from exhaustive enumeration",
                mismatches
            )));
        } else {
            println!(
                "Cross-check: {} endings differ (expected with pruning policy {})",
                mismatches, config.pruning
            );
        }
    }
    Ok(())
}

fn run_build_table(sbox: Option<&str>, min_probability: f64, output: &Path) -> Result<()> {
    let table = spn_layer(sbox)?.round_table(min_probability)?;
    let mut out = BufWriter::new(File::create(output)?);
    write_table(&table, &mut out)?;
    out.flush()?;
    println!(
        "Wrote {} transitions over {} differences to {}",
        table.transition_count(),
        table.blocks(),
        output.display()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Search {
            table,
            search,
            cores,
            timeout,
            first,
            end,
        } => {
            let mut parallel =
                ParallelConfig::default().with_timeout_option(timeout.map(Duration::from_secs));
            if let Some(cores) = cores {
                parallel = parallel.with_workers(cores);
            }
            run_search(&table, &search, parallel, (first, end))
        }
        Commands::Single {
            table,
            search,
            start,
            top,
            cross_check,
        } => run_single(&table, &search, start, top, cross_check),
        Commands::BuildTable {
            sbox,
            min_probability,
            output,
        } => run_build_table(sbox.as_deref(), min_probability, &output),
        Commands::Verify {
            executable,
            launcher,
            sbox_number,
            temp_dir,
            input,
            output,
            samples,
            key,
            seed,
            debug,
        } => {
            let mut cipher = ExternalCipher::new(executable, sbox_number).with_debug(debug);
            if let Some(launcher) = launcher {
                cipher = cipher.with_launcher(launcher);
            }
            if let Some(dir) = temp_dir {
                cipher = cipher.with_temp_dir(dir);
            }
            let mut rng = match seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_os_rng(),
            };
            estimate_differential(&cipher, input, output, samples, key.as_deref(), &mut rng)
                .map(|estimate| println!("{}", estimate))
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
