//! Benchmark for QUBO encoding and verification throughput.
//!
//! Run with: cargo run --release --bin bench

use std::collections::BTreeMap;
use std::time::Instant;

use qubo_scheduling::constraints::{Constraint, DifficultyBuckets, LevelBuckets};
use qubo_scheduling::domain::{Problem, Schedule};
use qubo_scheduling::verify;

fn build_problem(n_entities: usize, n_slots: usize) -> Problem {
    let senior = n_entities / 3;
    let junior = n_entities / 3;
    let intermediate = n_entities - senior - junior;
    let hard = n_slots / 3;
    let easy = n_slots / 3;
    let medium = n_slots - hard - easy;

    Problem::builder(
        format!("bench {}x{}", n_entities, n_slots),
        n_entities,
        n_slots,
    )
    .with_constraint(Constraint::consecutive_exclusion(3.5))
    .with_constraint(Constraint::slot_coverage(1.3, 1.0))
    .with_constraint(Constraint::workload_balance(0.3, (n_slots / n_entities) as f64))
    .with_constraint(Constraint::skill_mismatch(
        LevelBuckets::new(senior, intermediate, junior),
        DifficultyBuckets::new(hard, medium, easy),
    ))
    .with_constraint(Constraint::capacity_overflow(3, 0.5))
    .build()
    .unwrap()
}

fn round_robin(n_entities: usize, n_slots: usize) -> Schedule {
    let grid: Vec<Vec<bool>> = (0..n_entities)
        .map(|entity| (0..n_slots).map(|slot| slot % n_entities == entity).collect())
        .collect();
    Schedule::from_grid(grid).unwrap()
}

fn main() {
    let shapes = [(3usize, 11usize), (6, 10), (10, 20), (20, 30)];
    let rounds = 1_000u32;

    println!("Benchmark: constraint encoding and verification");
    println!();

    for (n_entities, n_slots) in shapes {
        let problem = build_problem(n_entities, n_slots);

        let encode_start = Instant::now();
        let qubo = problem.build_qubo().unwrap();
        let encode_elapsed = encode_start.elapsed();

        // Re-encoding must produce the identical model.
        let again = problem.build_qubo().unwrap();
        assert_eq!(
            qubo.to_dense(),
            again.to_dense(),
            "Encoding not deterministic!"
        );

        let schedule = round_robin(n_entities, n_slots);

        let verify_start = Instant::now();
        let mut checksum = 0.0f64;
        for _ in 0..rounds {
            let checks = verify::check(&problem, &schedule).unwrap();
            checksum += verify::total_residual(&checks);
        }
        let verify_elapsed = verify_start.elapsed();
        let checks_per_sec = rounds as f64 / verify_elapsed.as_secs_f64();

        // Model energy of the grid must match the verifier's total residual.
        let indexer = problem.indexer();
        let mut bits = BTreeMap::new();
        for (entity, slot) in schedule.assignments() {
            bits.insert(indexer.to_index(entity, slot).unwrap(), 1u8);
        }
        let energy = qubo.energy(&bits);
        let total_residual = checksum / rounds as f64;
        assert!(
            (energy - total_residual).abs() < 1e-6,
            "Energy {} drifted from residual total {}!",
            energy,
            total_residual
        );

        println!(
            "  {} ({} variables, {} terms)",
            problem.name(),
            qubo.n_variables(),
            qubo.len()
        );
        println!("    Encode: {:.2?}", encode_elapsed);
        println!(
            "    Verify: {:.2?} for {} rounds ({:.0}/sec)",
            verify_elapsed, rounds, checks_per_sec
        );
        println!("    Round-robin energy: {} (verified)", energy);
        println!();
    }
}
