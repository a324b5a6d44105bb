//! One rank per MPI process, e.g. `mpirun -n 4 relax-mpi --size 64`.
//! Only rank 0 builds the grid, prints and times the run. Any rank that
//! fails aborts the whole job.

use relax::comm::{Communicator, MpiComm};
use relax::config::{Args, RelaxConfig};
use relax::grid::GridRef;
use relax::solver::{message_passing, Solution};
use relax::snapshot;
use std::process::ExitCode;
use tracing::error;

fn run(comm: &MpiComm, config: &RelaxConfig) -> relax::Result<Option<Solution>> {
    let initial = if comm.is_coordinator() {
        Some(config.initial_grid()?)
    } else {
        None
    };

    let print = config.print;
    let mut observer = |generation: usize, current: GridRef<'_>| {
        if print {
            println!("generation {generation}:");
            print!("{current}");
        }
    };
    let solution = message_passing::solve_rank(
        comm,
        initial,
        config.size,
        &config.options,
        &mut observer,
    )?;

    if let (Some(solution), Some(path)) = (&solution, &config.image) {
        snapshot::write_png(&solution.grid, path)?;
    }
    Ok(solution)
}

fn main() -> ExitCode {
    let Some(universe) = mpi::initialize() else {
        eprintln!("error: MPI could not be initialized");
        return ExitCode::FAILURE;
    };
    let comm = MpiComm::new(universe.world());
    let Some((args, config)) = Args::cli_setup("relax-mpi", Some(comm.size()))
    else {
        return ExitCode::SUCCESS;
    };

    let result = run(&comm, &config);
    args.finish();

    match result {
        Ok(Some(solution)) => {
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
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            // Peers may be blocked in a collective this rank will never join.
            error!(rank = comm.rank(), "{e}");
            comm.abort(1)
        }
    }
}
