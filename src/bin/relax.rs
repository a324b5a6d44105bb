use relax::config::{Args, RelaxConfig};
use relax::grid::GridRef;
use relax::solver::{self, Solution};
use relax::snapshot;
use std::process::ExitCode;
use tracing::error;

fn run(config: &RelaxConfig) -> relax::Result<Solution> {
    let grid = config.initial_grid()?;
    tracing::info!(
        size = config.size,
        workers = config.options.workers,
        precision = config.options.precision,
        realization = ?config.realization,
        "running"
    );

    let print = config.print;
    let mut observer = |generation: usize, current: GridRef<'_>| {
        if print {
            println!("generation {generation}:");
            print!("{current}");
        }
    };
    let solution =
        solver::solve(config.realization, grid, &config.options, &mut observer)?;

    if let Some(path) = &config.image {
        snapshot::write_png(&solution.grid, path)?;
    }
    Ok(solution)
}

fn main() -> ExitCode {
    let Some((args, config)) = Args::cli_setup("relax", None) else {
        return ExitCode::SUCCESS;
    };

    let result = run(&config);
    args.finish();

    match result {
        Ok(solution) => {
            if config.print {
                println!("converged:");
                print!("{}", solution.grid);
            }
            println!("Generations: {}", solution.generations);
            println!(
                "Time taken: {:10.6} seconds",
                solution.elapsed.as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
