use relax::init;
use relax::solver::{message_passing, reference, shared_memory};
use relax::stencil::StencilKernel;
use relax::*;

use float_cmp::assert_approx_eq;

const REALIZATIONS: [Realization; 3] = [
    Realization::Threads,
    Realization::Ranks,
    Realization::Reference,
];

fn scenario_1_grid() -> Grid {
    Grid::from_vec(3, vec![1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0])
        .unwrap()
}

#[test]
fn single_interior_cell() {
    for realization in REALIZATIONS {
        for workers in [1, 2, 3, 9] {
            let options = SolveOptions::new(workers, 0.0001);
            let solution =
                solver::solve(realization, scenario_1_grid(), &options, &mut Quiet)
                    .unwrap();
            // one generation sets the centre to 1, the next changes nothing
            assert_eq!(solution.generations, 2, "{realization:?} {workers}");
            for v in solution.grid.data() {
                assert_eq!(*v, 1.0);
            }
        }
    }
}

#[test]
fn uniform_boundary_4x4() {
    let n = 4;
    for realization in REALIZATIONS {
        for workers in [1, 3, 16] {
            let grid =
                Grid::from_fn(n, init::uniform_boundary(n, 1.0)).unwrap();
            let options = SolveOptions::new(workers, 0.0001);
            let solution =
                solver::solve(realization, grid, &options, &mut Quiet).unwrap();
            for v in solution.grid.data() {
                assert_approx_eq!(f64, *v, 1.0, epsilon = 0.001);
            }
            // interior cells are symmetric
            let g = &solution.grid;
            assert_eq!(g.get(1, 1), g.get(2, 2));
            assert_eq!(g.get(1, 2), g.get(2, 1));
        }
    }
}

#[test]
fn precision_above_any_change_stops_at_once() {
    let n = 10;
    for realization in REALIZATIONS {
        let grid = Grid::from_fn(n, init::seeded_random(n, 101121, 20)).unwrap();
        let before = grid.clone();
        let options = SolveOptions::new(4, 1000.0);
        let solution =
            solver::solve(realization, grid, &options, &mut Quiet).unwrap();
        assert_eq!(solution.generations, 1);
        for i in solution.grid.edge_indices() {
            assert_eq!(solution.grid.data()[i], before.data()[i]);
        }
    }
}

#[test]
fn decomposition_independence() {
    let n = 12;
    let precision = 0.001;
    let initial =
        || Grid::from_fn(n, init::seeded_random(n, 42, 20)).unwrap();

    let expected =
        reference::solve(initial(), &SolveOptions::new(1, precision), &mut Quiet)
            .unwrap();

    for workers in [1, 2, 5, 7, 144] {
        let options = SolveOptions::new(workers, precision);
        let threads =
            shared_memory::solve(initial(), &options, &mut Quiet).unwrap();
        assert_eq!(threads.generations, expected.generations);
        for (a, b) in threads.grid.data().iter().zip(expected.grid.data()) {
            assert_approx_eq!(f64, *a, *b, epsilon = 1e-12);
        }
    }

    for workers in [1, 3, 8, 13] {
        let options = SolveOptions::new(workers, precision);
        let ranks =
            message_passing::solve(initial(), &options, &mut Quiet).unwrap();
        assert_eq!(ranks.generations, expected.generations);
        for (a, b) in ranks.grid.data().iter().zip(expected.grid.data()) {
            assert_approx_eq!(f64, *a, *b, epsilon = 1e-12);
        }
    }
}

#[test]
fn boundary_never_changes() {
    let n = 9;
    let initial = Grid::from_fn(n, init::seeded_random(n, 3, 20)).unwrap();
    for realization in REALIZATIONS {
        let mut observed = 0;
        let mut observer = |_: usize, current: GridRef<'_>| {
            for i in initial.edge_indices() {
                assert_eq!(current.data()[i], initial.data()[i]);
            }
            observed += 1;
        };
        let options = SolveOptions::new(4, 0.01);
        let solution =
            solver::solve(realization, initial.clone(), &options, &mut observer)
                .unwrap();
        assert_eq!(observed, solution.generations);
        for i in initial.edge_indices() {
            assert_eq!(solution.grid.data()[i], initial.data()[i]);
        }
    }
}

#[test]
fn fixed_point_is_stable() {
    {
        // exact fixed point: applying the kernel again changes nothing
        let solution = solver::solve(
            Realization::Threads,
            scenario_1_grid(),
            &SolveOptions::new(2, 0.0001),
            &mut Quiet,
        )
        .unwrap();
        let kernel = StencilKernel::new(3, 0.0001, ChangeCriterion::Exceeds);
        let mut next = vec![0.0; 9];
        let changed = reference::step(&kernel, solution.grid.data(), &mut next);
        assert!(!changed);
        assert_eq!(next, solution.grid.data());
    }

    {
        let n = 8;
        let precision = 0.001;
        let grid = Grid::from_fn(n, init::seeded_random(n, 9, 20)).unwrap();
        let solution = solver::solve(
            Realization::Ranks,
            grid,
            &SolveOptions::new(3, precision),
            &mut Quiet,
        )
        .unwrap();
        let kernel = StencilKernel::new(n, precision, ChangeCriterion::Exceeds);
        let mut next = vec![0.0; n * n];
        let changed = reference::step(&kernel, solution.grid.data(), &mut next);
        assert!(!changed);
        let after = Grid::from_vec(n, next).unwrap();
        assert!(after.max_abs_diff(&solution.grid) <= precision);
    }
}

#[test]
fn criterion_decides_on_ties() {
    // First generation moves the centre by exactly 1.0
    for realization in REALIZATIONS {
        let exceeds = SolveOptions::new(2, 1.0);
        let solution =
            solver::solve(realization, scenario_1_grid(), &exceeds, &mut Quiet)
                .unwrap();
        assert_eq!(solution.generations, 1);

        let at_least = exceeds.with_criterion(ChangeCriterion::AtLeast);
        let solution =
            solver::solve(realization, scenario_1_grid(), &at_least, &mut Quiet)
                .unwrap();
        assert_eq!(solution.generations, 2);
    }
}

#[test]
fn invalid_options_are_rejected() {
    for realization in REALIZATIONS {
        let zero_precision = SolveOptions::new(2, 0.0);
        assert!(matches!(
            solver::solve(realization, scenario_1_grid(), &zero_precision, &mut Quiet),
            Err(RelaxError::InvalidArgument(_))
        ));
    }
    let too_many = SolveOptions::new(10, 0.1);
    for realization in [Realization::Threads, Realization::Ranks] {
        assert!(solver::solve(realization, scenario_1_grid(), &too_many, &mut Quiet)
            .is_err());
    }
}

#[test]
fn observer_panic_propagates() {
    let n = 6;
    for realization in REALIZATIONS {
        let grid = Grid::from_fn(n, init::seeded_random(n, 5, 20)).unwrap();
        let result = std::panic::catch_unwind(|| {
            let mut observer = |generation: usize, _: GridRef<'_>| {
                if generation == 1 {
                    panic!("observer failed");
                }
            };
            solver::solve(
                realization,
                grid,
                &SolveOptions::new(3, 1e-6),
                &mut observer,
            )
        });
        assert!(result.is_err(), "{realization:?}");
    }
}
