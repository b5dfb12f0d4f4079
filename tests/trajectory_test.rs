use proptest::prelude::*;
use qanneal::sqa::SegmentTrajectory;
use rand::prelude::SmallRng;
use rand::{Rng, SeedableRng};

const BETA: f64 = 20.0;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9 * BETA
}

fn sample_times(rng: &mut SmallRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(0.0..BETA)).collect()
}

proptest! {
    #[test]
    fn random_worldlines_are_clean(seed in any::<u64>(), kinks in 0usize..24) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let traj = SegmentTrajectory::random(BETA, kinks, &mut rng).unwrap();
        prop_assert!(traj.verify());
        prop_assert!(traj.is_clean());
        prop_assert!(traj.cuts().len() <= kinks);
        prop_assert_ne!(traj.cuts().len(), 1);
    }

    #[test]
    fn equal_endpoints_cover_the_circle(seed in any::<u64>(), kinks in 0usize..24) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let traj = SegmentTrajectory::random(BETA, kinks, &mut rng).unwrap();
        let full = traj.time_average() * BETA;
        for t in sample_times(&mut rng, 8) {
            prop_assert!(close(traj.integrate(t, t), full));
        }
        prop_assert!(close(traj.integrate(0.0, 0.0), full));
    }

    #[test]
    fn complementary_arcs_sum_to_circle(seed in any::<u64>(), kinks in 0usize..24) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let traj = SegmentTrajectory::random(BETA, kinks, &mut rng).unwrap();
        let full = traj.time_average() * BETA;
        let times = sample_times(&mut rng, 8);
        for w in times.windows(2) {
            let (a, b) = (w[0], w[1]);
            if a == b {
                continue;
            }
            let total = traj.integrate(a, b) + traj.integrate(b, a);
            prop_assert!(close(total, full));
            prop_assert!(traj.integrate(a, b).abs() <= BETA);
        }
    }

    #[test]
    fn inserted_cuts_are_redundant(seed in any::<u64>(), kinks in 0usize..16, extra in 1usize..16) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let before = SegmentTrajectory::random(BETA, kinks, &mut rng).unwrap();
        let mut traj = before.clone();

        let mut positions = sample_times(&mut rng, extra);
        positions.sort_by(f64::total_cmp);
        traj.insert_kinks(positions).unwrap();
        prop_assert!(traj.verify());

        for t in sample_times(&mut rng, 16) {
            prop_assert_eq!(traj.value_at(t), before.value_at(t));
        }
        prop_assert!(close(traj.time_average(), before.time_average()));

        traj.cleanup();
        prop_assert_eq!(traj, before);
    }

    #[test]
    fn cleanup_keeps_values(seed in any::<u64>(), kinks in 0usize..16, extra in 0usize..16) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut traj = SegmentTrajectory::random(BETA, kinks, &mut rng).unwrap();
        let mut positions = sample_times(&mut rng, extra);
        positions.sort_by(f64::total_cmp);
        traj.insert_kinks(positions).unwrap();
        for k in 0..traj.segment_count() {
            if rng.gen_bool(0.5) {
                traj.flip_segment(k);
            }
        }
        let times = sample_times(&mut rng, 16);
        let before = times.iter().map(|t| traj.value_at(*t)).collect::<Vec<_>>();
        let average = traj.time_average();

        traj.cleanup();
        prop_assert!(traj.verify());
        prop_assert!(traj.is_clean());
        let after = times.iter().map(|t| traj.value_at(*t)).collect::<Vec<_>>();
        prop_assert_eq!(before, after);
        prop_assert!(close(traj.time_average(), average));
    }
}

#[test]
fn segments_tile_the_circle() {
    let mut rng = SmallRng::seed_from_u64(1234);
    let traj = SegmentTrajectory::random(BETA, 12, &mut rng).unwrap();
    let total = (0..traj.segment_count())
        .map(|k| traj.segment_duration(k))
        .sum::<f64>();
    assert!(close(total, BETA));
}
