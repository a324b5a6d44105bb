use crate::build_info;
use crate::error::{RelaxError, Result};
use crate::grid::Grid;
use crate::init;
use crate::solver::{Realization, SolveOptions};
use crate::stencil::ChangeCriterion;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "profile-with-puffin")]
use std::sync::Mutex;

#[cfg(feature = "profile-with-puffin")]
lazy_static::lazy_static! {
    static ref puffin_server: Mutex<Option<puffin_http::Server>> = {
        println!("Initializing profiling server:");
        let server_addr =
                format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
        println!(
                "Run this to view profiling data:  puffin_viewer {server_addr}"
            );
        let server = puffin_http::Server::new(&server_addr).ok();
        Mutex::new(server)
    };
}

/// Seed used by the random generator unless one is given.
pub const DEFAULT_SEED: u64 = 101121;

/// Random initial values are whole numbers below this.
pub const RANDOM_MAX: u32 = 20;

/// Initial value generator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InitKind {
    /// 1 in the first row and column, 0 elsewhere
    #[default]
    Corner,
    /// 1 on every boundary cell, 0 inside
    Boundary,
    /// Seeded whole numbers in [0, 20)
    Random,
}

/// relax: parallel Jacobi relaxation to a fixed point
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Grid dimension, the grid is size x size.
    #[arg(short, long, default_value = "8")]
    pub size: usize,

    /// Worker threads or ranks.
    /// Under MPI the launch environment decides instead.
    #[arg(short, long, default_value = "4")]
    pub workers: usize,

    /// Stop once no interior cell changes by more than this.
    #[arg(short, long, default_value = "0.0001")]
    pub precision: f64,

    /// Print the grid before every generation and after convergence.
    #[arg(long)]
    pub print: bool,

    /// Which engine computes the fixed point.
    #[arg(short, long, value_enum, default_value_t)]
    pub realization: Realization,

    /// How a cell's change is compared against the precision.
    #[arg(short, long, value_enum, default_value_t)]
    pub criterion: ChangeCriterion,

    /// Initial value generator.
    #[arg(short, long, value_enum, default_value_t)]
    pub init: InitKind,

    /// Seed for `--init random`.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Write a PNG of the converged grid here.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Print build information and quit
    #[arg(long)]
    pub build_info: bool,
}

/// Validated run configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RelaxConfig {
    pub size: usize,
    pub options: SolveOptions,
    pub print: bool,
    pub realization: Realization,
    pub init: InitKind,
    pub seed: u64,
    pub image: Option<PathBuf>,
}

impl RelaxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(RelaxError::invalid("size must be positive"));
        }
        if self.options.workers == 0 {
            return Err(RelaxError::invalid("workers must be positive"));
        }
        let cells = self.size.checked_mul(self.size).ok_or_else(|| {
            RelaxError::invalid(format!("size {} is too large", self.size))
        })?;
        if self.options.workers > cells {
            return Err(RelaxError::invalid(format!(
                "{} workers for a grid of only {cells} cells",
                self.options.workers
            )));
        }
        self.options.validate()
    }

    /// Build the initial grid from the configured generator.
    pub fn initial_grid(&self) -> Result<Grid> {
        let n = self.size;
        match self.init {
            InitKind::Corner => Grid::from_fn(n, init::corner_ones),
            InitKind::Boundary => {
                Grid::from_fn(n, init::uniform_boundary(n, 1.0))
            }
            InitKind::Random => Grid::from_fn(
                n,
                init::seeded_random(n, self.seed, RANDOM_MAX),
            ),
        }
    }
}

impl Args {
    pub fn config(&self) -> Result<RelaxConfig> {
        let config = RelaxConfig {
            size: self.size,
            options: SolveOptions::new(self.workers, self.precision)
                .with_criterion(self.criterion),
            print: self.print,
            realization: self.realization,
            init: self.init,
            seed: self.seed,
            image: self.image.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse the command line, handle `--build-info`, start logging and
    /// validate. Invalid arguments print usage and exit with status 2.
    /// `workers` overrides `--workers` when the launcher decides it.
    /// Returns `None` once the build report is printed; `main` should then
    /// return normally.
    pub fn cli_setup(
        name: &str,
        workers: Option<usize>,
    ) -> Option<(Self, RelaxConfig)> {
        Self::cli_setup_from(name, workers, std::env::args_os())
    }

    /// [`Args::cli_setup`] over an explicit argument list.
    pub fn cli_setup_from<I, T>(
        name: &str,
        workers: Option<usize>,
        argv: I,
    ) -> Option<(Self, RelaxConfig)>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut args = Args::parse_from(argv);
        if let Some(workers) = workers {
            args.workers = workers;
        }

        if args.build_info {
            build_info::print_report(name);
            return None;
        }

        init_logging();

        #[cfg(feature = "profile-with-puffin")]
        {
            profiling::puffin::set_scopes_on(true);
            if let Ok(server) = puffin_server.lock() {
                if server.is_none() {
                    tracing::warn!("profiling server did not start");
                }
            }
        }

        let config = match args.config() {
            Ok(config) => config,
            Err(e) => Args::command()
                .error(ErrorKind::ValueValidation, e.to_string())
                .exit(),
        };

        // The reference solver runs on the global pool.
        if rayon::ThreadPoolBuilder::new()
            .num_threads(config.options.workers)
            .thread_name(|i| format!("rayon_thread_{}", i))
            .build_global()
            .is_err()
        {
            tracing::warn!("rayon global pool was already initialized");
        }

        Some((args, config))
    }

    pub fn finish(&self) {
        #[cfg(feature = "profile-with-puffin")]
        {
            // We want to drop the server so we can flush the profiling data
            // https://stackoverflow.com/questions/68866598/how-do-i-free-memory-in-a-lazy-static
            if let Ok(mut server) = puffin_server.lock() {
                server.take();
            }
        }
    }
}

/// `RUST_LOG` style filtering, `info` when unset.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
