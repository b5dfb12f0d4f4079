#![cfg(feature = "tempering")]

use qanneal::classical::*;
use qanneal::model::IsingModel;
use rand::prelude::SmallRng;
use rand::SeedableRng;

fn frustrated_ring(l: usize) -> IsingModel {
    let edges = (0..l)
        .map(|i| ((i, (i + 1) % l), if i == 0 { 1.0 } else { -1.0 }))
        .collect::<Vec<_>>();
    IsingModel::from_edges(l, &edges, None).unwrap()
}

fn make_container(l: usize, temps: &[f64]) -> TemperingContainer<SmallRng, SmallRng> {
    let model = frustrated_ring(l);
    let rng = SmallRng::seed_from_u64(1234);
    let mut container = TemperingContainer::new(&model, rng, None).unwrap();
    temps.iter().enumerate().for_each(|(i, t)| {
        let rng = SmallRng::seed_from_u64(i as u64);
        container.add_replica(rng, *t).unwrap();
    });
    container
}

#[test]
fn tempering_finds_low_energy() {
    let temps = [0.1, 0.3, 0.7, 1.5, 3.0];
    let mut container = make_container(8, &temps);
    let state = container.run(20000, 10).unwrap();
    let model = frustrated_ring(8);
    // One unsatisfied bond is the best a frustrated ring can do.
    assert_eq!(model.energy(&state).unwrap(), -6.0);
    assert!(container.num_swaps() > 0);
    assert_eq!(container.num_replicas(), temps.len());
}

#[test]
fn replicas_keep_their_temperatures() {
    let temps = [0.5, 1.0, 2.0];
    let mut container = make_container(6, &temps);
    container.run(1000, 1).unwrap();
    let held = container
        .replica_ref()
        .iter()
        .map(|(_, t)| *t)
        .collect::<Vec<_>>();
    assert_eq!(held, temps.to_vec());
    container.iter_over_states(|s| assert_eq!(s.len(), 6));
}

#[test]
fn rejects_bad_temperature() {
    let mut container = make_container(4, &[1.0]);
    assert!(container
        .add_replica(SmallRng::seed_from_u64(0), 0.0)
        .is_err());
    assert_eq!(container.num_replicas(), 1);
}

#[cfg(feature = "parallel-tempering")]
#[test]
fn parallel_run_finds_low_energy() {
    let mut container = make_container(8, &[0.1, 0.3, 0.7, 1.5, 3.0]);
    let state = container.parallel_run(20000, 10).unwrap();
    assert_eq!(frustrated_ring(8).energy(&state).unwrap(), -6.0);
}

#[test]
fn classical_anneal_matches_tracked_energy() {
    let model = frustrated_ring(8);
    let temps = (0..20000)
        .map(|i| 3.0 * (0.9995f64).powi(i))
        .collect::<Vec<_>>();
    let mut annealer = SimulatedAnnealer::new(&model, SmallRng::seed_from_u64(3), None).unwrap();
    let state = annealer.anneal(&temps).unwrap().to_vec();
    assert!((model.energy(&state).unwrap() - annealer.get_energy()).abs() < 1e-9);
    assert_eq!(annealer.get_energy(), -6.0);
}
