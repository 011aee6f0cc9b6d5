use std::path::{Path, PathBuf};

use beatcut_core::{
    compile_all, CutStrategyKind, EditList, HeadlessSurface, OutputConfig, PreviewSurface,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::TerminalSurface;

fn main() -> beatcut_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { settings, overrides, output } => {
            run_compile(&settings, &overrides, output.as_deref())
        }
        Commands::Validate { settings } => run_validate(&settings),
        Commands::Strategies => {
            for kind in CutStrategyKind::ALL {
                println!("{kind}");
            }
            Ok(())
        }
    }
}

fn run_compile(
    settings: &Path,
    overrides: &Overrides,
    output: Option<&Path>,
) -> beatcut_core::Result<()> {
    let mut config = OutputConfig::from_path(settings)?;
    overrides.apply(&mut config);

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(?settings, seed, "compiling");

    // prompts from parallel rounds would interleave on one terminal
    let interactive = config.threads == 1 && config.versions > 1;
    let plans = compile_all(&config, seed, |_, _| -> Box<dyn PreviewSurface> {
        if interactive {
            Box::new(TerminalSurface)
        } else {
            Box::new(HeadlessSurface)
        }
    })?;

    let list = EditList::build(&config, &plans);
    match output {
        Some(path) => list.write_to(path),
        None => {
            println!("{}", list.to_json()?);
            Ok(())
        }
    }
}

fn run_validate(settings: &Path) -> beatcut_core::Result<()> {
    let config = OutputConfig::from_path(settings)?;
    config.validate()?;
    tracing::info!(
        ?settings,
        rounds = config.rounds.len(),
        "settings are valid"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat-synchronised video compilation cutter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cut every round of a settings file and emit the edit list.
    Compile {
        /// Path to the JSON settings file.
        settings: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
        /// Where to write the edit list; printed to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load and validate a settings file without cutting anything.
    Validate {
        /// Path to the JSON settings file.
        settings: PathBuf,
    },
    /// List the available cutting strategies.
    Strategies,
}

/// Command line values that take precedence over the settings file.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Seed for reproducible cuts.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of rounds compiled in parallel.
    #[arg(short, long)]
    threads: Option<usize>,
    /// Candidate versions offered per cut.
    #[arg(short, long)]
    versions: Option<usize>,
    /// Wrap the rounds with title, transitions and credits.
    #[arg(short, long)]
    assemble: bool,
}

impl Overrides {
    fn apply(&self, config: &mut OutputConfig) {
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(versions) = self.versions {
            config.versions = versions;
        }
        config.assemble |= self.assemble;
    }
}
