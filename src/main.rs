//! hostfetch command-line interface.

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use hostfetch::cache::{fingerprint, CachePolicy, CacheStore};
use hostfetch::registry::report_warnings;
use hostfetch::signals;
use hostfetch::{Background, Config, Context, ModuleKind, ProbeEnv, ProcessState, Registry, TerminalModes};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hostfetch")]
#[command(version, about = "Fetch and print system information", long_about = None)]
struct Args {
    /// Config file to use instead of searching the config directories
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Modules to print, separated by `:` (e.g. Display:Theme:Brightness)
    #[arg(short, long, value_name = "MODULES")]
    structure: Option<String>,

    /// Print results as JSON (never uses the cache)
    #[arg(long)]
    json: bool,

    /// Ignore cached values and detect everything again
    #[arg(long)]
    recache: bool,

    /// Do not write detected values to the cache
    #[arg(long)]
    no_cache_save: bool,

    /// Print module errors instead of skipping them
    #[arg(long)]
    show_errors: bool,

    /// Run all probes on the main thread
    #[arg(long)]
    no_multithreading: bool,

    /// Plain output without escape sequences
    #[arg(long)]
    pipe: bool,

    /// Percentage rendering: 1 number, 2 bar, 3 both
    #[arg(long, value_name = "BITS")]
    percent_type: Option<u8>,

    /// Print the format placeholders of a module and exit
    #[arg(long, value_name = "MODULE")]
    help_format: Option<String>,

    /// Print the names of all modules and exit
    #[arg(long)]
    list_modules: bool,

    /// Verbose diagnostics on stderr
    #[arg(long)]
    debug: bool,

    /// Module option, e.g. `-o Brightness-ddcci-sleep=20` (repeatable)
    #[arg(short = 'o', long = "option", value_name = "MODULE-KEY=VALUE")]
    options: Vec<String>,
}

impl Args {
    /// Fold command-line overrides into `config`.
    fn apply_to(&self, config: &mut Config) {
        config.recache |= self.recache;
        config.cache_save &= !self.no_cache_save;
        config.show_errors |= self.show_errors;
        config.multithreading &= !self.no_multithreading;
        config.pipe |= self.pipe || !io::stdout().is_terminal();
        if let Some(bits) = self.percent_type {
            config.percent_type = bits;
        }
        config.cli_options.extend(self.options.iter().map(|option| {
            match option.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (option.clone(), String::new()),
            }
        }));
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Restore the terminal and exit when interrupted.
///
/// Workers are left running; process exit reclaims them.
fn install_signal_handler(terminal: Arc<TerminalModes>) {
    if let Err(e) = signals::on_termination(terminal, |_| std::process::exit(0)) {
        warn!(error = %e, "failed to install signal handler");
    }
}

fn load_config(args: &Args, state: &ProcessState) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => {
            let (config, path) = Config::discover(&state.config_dirs)?;
            debug!(path = ?path, "config resolved");
            config
        }
    };
    args.apply_to(&mut config);
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    if args.list_modules {
        let mut out = io::stdout().lock();
        for kind in ModuleKind::all() {
            writeln!(out, "{kind}")?;
        }
        return Ok(());
    }

    let mut registry = Registry::new();
    if let Some(name) = &args.help_format {
        let kind = ModuleKind::from_str(name).map_err(|_| anyhow!("unknown module `{name}`"))?;
        registry.print_help_format(kind, &mut io::stdout().lock())?;
        return Ok(());
    }

    let state = ProcessState::from_env().context("cannot initialize process state")?;
    let config = load_config(&args, &state)?;

    report_warnings(&registry.apply_config(&config));
    if let Some(structure) = &args.structure {
        report_warnings(&registry.parse_structure(structure));
    }

    let background = Background::start(ProbeEnv::from_state(&state), config.multithreading);

    let cache = CacheStore::new(
        state.cache_dir.clone(),
        CachePolicy {
            recache: config.recache,
            save: config.cache_save,
        },
    );
    if !config.recache && cache.validate(&fingerprint(&config.fingerprint_input())) {
        debug!("cache invalidated");
    }

    let ctx = Context {
        state: &state,
        config: &config,
        cache: &cache,
        background: &background,
    };

    if args.json {
        let document = registry.generate_json(&ctx);
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &document)?;
        writeln!(out)?;
        return Ok(());
    }

    state.terminal.configure(
        !config.pipe && config.disable_linewrap,
        !config.pipe && config.hide_cursor,
    );
    install_signal_handler(Arc::clone(&state.terminal));

    let mut out = BufWriter::new(io::stdout());
    state.terminal.apply(&mut out)?;
    let printed = registry
        .print_all(&ctx, &mut out)
        .and_then(|()| out.flush());
    drop(out);
    // Unbuffered, so the modes count as applied until the sequences are out
    state.terminal.restore(&mut io::stdout())?;
    printed?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hostfetch: {e:#}");
            ExitCode::FAILURE
        }
    }
}
