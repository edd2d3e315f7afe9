//! TMRT CLI - load a scene, trace it and export results.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use tmrt::prelude::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Log filter selected by the global flags.
#[derive(Clone, Copy)]
enum Verbosity {
    Quiet,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Info => "info",
            Verbosity::Debug => "tmrt=debug,info",
            Verbosity::Trace => "tmrt=trace,debug",
        }
    }
}

#[cfg(feature = "chrome-trace")]
type TraceGuard = Option<tracing_chrome::FlushGuard>;
#[cfg(not(feature = "chrome-trace"))]
type TraceGuard = ();

/// `RUST_LOG` wins unless a flag was given.
fn env_filter(verbosity: Option<Verbosity>) -> EnvFilter {
    match verbosity {
        Some(v) => EnvFilter::new(v.directive()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Verbosity::Info.directive())),
    }
}

/// Install the fmt subscriber, plus a Chrome trace layer when `TMRT_TRACE=1`.
#[cfg(feature = "chrome-trace")]
fn init_tracing(verbosity: Option<Verbosity>) -> TraceGuard {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter(verbosity)).with(fmt_layer);

    if env::var("TMRT_TRACE").ok().as_deref() != Some("1") {
        let _ = registry.try_init();
        return None;
    }

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file("trace.json").build();
    let _ = registry.with(chrome_layer).try_init();
    Some(guard)
}

#[cfg(not(feature = "chrome-trace"))]
fn init_tracing(verbosity: Option<Verbosity>) -> TraceGuard {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr);
    let _ = tracing_subscriber::registry().with(env_filter(verbosity)).with(fmt_layer).try_init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = None;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Some(Verbosity::Debug),
            "-vv" | "--trace" => verbosity = Some(Verbosity::Trace),
            "-q" | "--quiet" => verbosity = Some(Verbosity::Quiet),
            _ => filtered_args.push(arg),
        }
    }

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let _guard = init_tracing(verbosity);

    let result = match filtered_args[0] {
        "sim" | "s" => cmd_sim(&filtered_args[1..]),
        "shell" | "sh" => cmd_shell(&filtered_args[1..]),
        "info" | "i" => cmd_info(&filtered_args[1..]),
        "inspect" | "x" => match filtered_args.get(1) {
            Some(file) => cmd_inspect(Path::new(file)),
            None => {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: tmrt inspect <result.bin>");
                process::exit(1);
            }
        },
        "config" | "c" => cmd_config(&filtered_args[1..]),
        "version" | "-V" | "--version" => {
            print_version();
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Run 'tmrt help' for usage");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn print_version() {
    println!("tmrt {} (built {})", env!("CARGO_PKG_VERSION"), env!("TMRT_BUILD_DATE"));
    println!("target:   {}", env!("TMRT_BUILD_TARGET"));
    println!("features: {}", env!("TMRT_BUILD_FEATURES"));
}

fn print_help() {
    println!("tmrt - ray-tracing simulation for radiant exposure");
    println!();
    println!("USAGE:");
    println!("    tmrt [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    s, sim     [-c file] <cmd>...    Load scene, init, then run commands in order");
    println!("    sh, shell  [-c file]             Read commands from stdin, one per line");
    println!("    i, info    [-c file]             Load the scene and print element counts");
    println!("    x, inspect <result.bin>          Summarize an exported result file");
    println!("    c, config  [-c file]             Print effective settings as JSON");
    println!("    version                          Show version, build date and features");
    println!("    h, help                          Show this help");
    println!();
    println!("SIMULATION COMMANDS:");
    println!("    run            Trace every ray");
    println!("    reset          Restore original rays and re-run init");
    println!("    save [path]    Export results (default: settings export_path)");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Errors only");
    println!();
    println!("EXAMPLES:");
    println!("    tmrt sim run save               # Trace and export to file.bin");
    println!("    tmrt sim run save a.bin reset run save b.bin");
    println!("    tmrt -v info -c scene.json      # Counts for a custom scene");
    println!("    tmrt inspect file.bin           # Bounce statistics");
    println!();
    println!("NOTES:");
    println!("    - Settings default to <config dir>/tmrt/settings.json");
    println!("    - RUST_LOG is honoured when no verbosity flag is given");
    #[cfg(feature = "chrome-trace")]
    println!("    - TMRT_TRACE=1 writes a Chrome trace to trace.json");
}

/// Split off a leading `-c <file>` and load settings accordingly.
fn settings_from_args<'a>(args: &'a [&'a str]) -> Result<(Settings, &'a [&'a str])> {
    match args {
        ["-c" | "--config", path, rest @ ..] => {
            let settings = Settings::load_from(path).with_context(|| format!("loading settings {}", path))?;
            Ok((settings, rest))
        }
        ["-c" | "--config"] => anyhow::bail!("missing settings file after -c"),
        rest => Ok((Settings::load(), rest)),
    }
}

#[cfg(feature = "gpu")]
fn open_simulation(settings: &Settings) -> Result<Simulation<WgpuBackend>> {
    let scene = Scene::load(settings).context("loading scene")?;
    let sources = KernelSources::load(&settings.kernels).context("loading kernels")?;
    let backend = WgpuBackend::new(&sources, settings.workgroup_size)?;
    let pipeline = ComputePipeline::new(backend, &scene, settings.origin())?;

    let mut sim = Simulation::new(pipeline, &settings.export_path);
    sim.on_attach()?;
    Ok(sim)
}

#[cfg(feature = "gpu")]
fn cmd_sim(args: &[&str]) -> Result<()> {
    let (settings, rest) = settings_from_args(args)?;
    let commands = Command::parse_args(rest)?;
    if commands.is_empty() {
        anyhow::bail!("no simulation commands given (expected run, reset or save)");
    }

    let mut sim = open_simulation(&settings)?;
    for cmd in commands {
        sim.submit(cmd);
    }
    for outcome in sim.on_update() {
        report(&outcome?);
    }
    Ok(())
}

#[cfg(feature = "gpu")]
fn cmd_shell(args: &[&str]) -> Result<()> {
    let (settings, _) = settings_from_args(args)?;
    let mut sim = open_simulation(&settings)?;

    let stdin = io::stdin();
    let mut failed = false;
    prompt();
    for line in stdin.lock().lines() {
        let line = line?;
        match Command::parse(&line) {
            Ok(Some(cmd)) => match sim.on_event(&cmd) {
                Ok(outcome) => report(&outcome),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    failed = true;
                }
            },
            Ok(None) => {}
            Err(Error::Command(c)) if matches!(c.as_str(), "quit" | "exit" | "q") => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                failed = true;
            }
        }
        prompt();
    }

    if failed {
        anyhow::bail!("one or more commands failed");
    }
    Ok(())
}

#[cfg(not(feature = "gpu"))]
fn cmd_sim(_args: &[&str]) -> Result<()> {
    anyhow::bail!("GPU backend not available. Rebuild with: cargo build --features gpu")
}

#[cfg(not(feature = "gpu"))]
fn cmd_shell(args: &[&str]) -> Result<()> {
    cmd_sim(args)
}

fn prompt() {
    print!("tmrt> ");
    let _ = io::stdout().flush();
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Traced => println!("traced"),
        Outcome::Reset => println!("reset"),
        Outcome::Saved { path, summary } => println!("saved {}: {}", path.display(), summary),
    }
}

fn cmd_info(args: &[&str]) -> Result<()> {
    let (settings, _) = settings_from_args(args)?;
    let scene = Scene::load(&settings).context("loading scene")?;
    let stats = scene.stats();

    println!("Vertices:  {}", stats.vertices);
    println!("Indices:   {}", stats.indices);
    println!("Facets:    {}", stats.facets);
    println!("  quads:   {}", stats.quads);
    println!("Rays:      {}", stats.rays);
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let records = tmrt::export::read_results(path).with_context(|| format!("reading {}", path.display()))?;
    let summary = ResultSummary::from_records(&records);

    println!("File:      {}", path.display());
    println!("Rays:      {}", summary.rays);
    println!("Bounced:   {}", summary.bounced);
    println!("Max bounce:  {}", summary.max_bounce);
    println!("Mean bounce: {:.3}", summary.mean_bounce);

    let missed = records.iter().filter(|r| r.first_hit_id < 0).count();
    if missed > 0 {
        println!("No hit:    {}", missed);
    }
    Ok(())
}

fn cmd_config(args: &[&str]) -> Result<()> {
    let (settings, _) = settings_from_args(args)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    if let Some(path) = Settings::default_path() {
        eprintln!("(default location: {})", path.display());
    }
    Ok(())
}
