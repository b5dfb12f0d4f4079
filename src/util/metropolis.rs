use rand::Rng;

/// Randomly choose if a step should be made based on inverse temperature and energy change.
///
/// Accepts with probability `min(1, exp(-beta * delta_e))`. No random number is drawn when
/// the move lowers the energy.
pub fn should_flip<R: Rng>(rng: &mut R, beta: f64, delta_e: f64) -> bool {
    // If dE <= 0 then it will always flip, don't bother calculating odds.
    if delta_e > 0.0 {
        let chance = (-beta * delta_e).exp();
        rng.gen::<f64>() < chance
    } else {
        true
    }
}
