use crate::errors::Result;
use crate::schedule::AnnealingSchedule;
use crate::sqa::observables::{ObservableCollector, Observables};

/// Provides helpers to samplers which take one sweep per transverse field strength.
pub trait AnnealStepper {
    /// Check that step `step` at field `gamma` can be taken, without touching any state.
    fn check_step(&self, step: usize, gamma: f64) -> Result<()>;

    /// Take a single sweep at transverse field `gamma`.
    fn anneal_step(&mut self, step: usize, gamma: f64) -> Result<()>;

    /// Current per-spin expectation values of pauli-z.
    fn pauli_z(&self) -> Vec<f64>;

    /// Check every step of a schedule.
    fn check_schedule(&self, schedule: &AnnealingSchedule) -> Result<()> {
        schedule
            .iter()
            .enumerate()
            .try_for_each(|(step, gamma)| self.check_step(step, gamma))
    }

    /// Run the full schedule and return the final pauli-z values.
    fn anneal(&mut self, schedule: &AnnealingSchedule) -> Result<Vec<f64>> {
        self.anneal_measure(schedule, (), |_acc, _s| ())?;
        Ok(self.pauli_z())
    }

    /// Run the full schedule and fold across the sampler after each step.
    ///
    /// The whole schedule is checked before the first step is taken.
    fn anneal_measure<F, T>(
        &mut self,
        schedule: &AnnealingSchedule,
        init_t: T,
        state_fold: F,
    ) -> Result<T>
    where
        F: Fn(T, &Self) -> T,
    {
        self.check_schedule(schedule)?;
        let mut acc = init_t;
        for (step, gamma) in schedule.iter().enumerate() {
            self.anneal_step(step, gamma)?;
            acc = state_fold(acc, self);
        }
        Ok(acc)
    }

    /// Run the full schedule keeping the pauli-z values after every step.
    fn anneal_sample(&mut self, schedule: &AnnealingSchedule) -> Result<Observables> {
        let collector = ObservableCollector::with_capacity(schedule.len());
        let collector = self.anneal_measure(schedule, collector, |mut acc, s| {
            acc.record(s.pauli_z());
            acc
        })?;
        Ok(collector.finish(self.pauli_z()))
    }
}
