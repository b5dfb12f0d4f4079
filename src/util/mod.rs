/// Metropolis acceptance.
pub mod metropolis;
