//! Simulated annealing with a geometric cooling schedule.
//!
//! The engine is generic over `AnnealCandidate`, so the acceptance rule
//! and best-state tracking can be tested on toy problems before they
//! drive label placement.
//!
//! - Candidates mutate in place and hand back an undo token instead of
//!   being cloned before every step. Cloning only happens when a new
//!   best state is recorded.
//! - Improvements and zero-temperature rejections consume no PRNG draw,
//!   so a run is fully determined by its seed.
//! - `Annealer` is a step function: callers drive it in slices with
//!   `advance` and can stop between slices, keeping the best state seen.

use crate::prng::Pcg32;
use crate::types::AnnealParams;

/// A candidate solution that can be mutated, scored and undone.
pub trait AnnealCandidate: Clone {
    /// Opaque undo token returned by `step()`.
    type Undo;

    /// Current energy (lower is better). Should be cached.
    fn energy(&self) -> f64;

    /// One mutation step in place. Returns an undo token.
    fn step(&mut self, rng: &mut Pcg32) -> Self::Undo;

    /// Revert the last step using the undo token.
    fn undo(&mut self, token: Self::Undo);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub iterations: u32,
    pub initial_temperature: f64,
    pub cooling: f64,
    pub min_temperature: f64,
}

impl Schedule {
    pub fn from_params(params: &AnnealParams) -> Self {
        Self {
            iterations: params.iterations,
            initial_temperature: params.initial_temperature,
            cooling: params.cooling,
            min_temperature: params.min_temperature,
        }
    }

    /// Temperature before iteration `i`.
    pub fn temperature_at(&self, i: u32) -> f64 {
        self.initial_temperature * self.cooling.powi(i as i32)
    }

    /// Iterations actually run: the budget or the first iteration whose
    /// temperature drops below the floor, whichever comes first.
    pub fn effective_iterations(&self) -> u32 {
        let mut t = self.initial_temperature;
        let mut i = 0;
        while i < self.iterations && t >= self.min_temperature {
            t *= self.cooling;
            i += 1;
        }
        i
    }
}

/// Metropolis acceptance criterion for minimisation.
///
/// Always accepts improvements (no PRNG draw).
/// T=0: rejects worse (no PRNG draw).
/// T>0: accepts worse with P = exp(-(new - current) / T), consuming one
/// rng.next_float().
pub fn metropolis_accept(current: f64, new: f64, temperature: f64, rng: &mut Pcg32) -> bool {
    if new <= current {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    let p = (-(new - current) / temperature).exp();
    rng.next_float() < p
}

/// Resumable annealing run over one candidate.
#[derive(Debug, Clone)]
pub struct Annealer<C> {
    current: C,
    best: C,
    best_energy: f64,
    rng: Pcg32,
    temperature: f64,
    iteration: u32,
    schedule: Schedule,
}

impl<C: AnnealCandidate> Annealer<C> {
    pub fn new(candidate: C, schedule: Schedule, seed: u64) -> Self {
        let best_energy = candidate.energy();
        Self {
            best: candidate.clone(),
            current: candidate,
            best_energy,
            rng: Pcg32::new(seed, 0),
            temperature: schedule.initial_temperature,
            iteration: 0,
            schedule,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.iteration >= self.schedule.iterations || self.temperature < self.schedule.min_temperature
    }

    /// Run up to `steps` iterations. Returns how many actually ran.
    pub fn advance(&mut self, steps: u32) -> u32 {
        let mut done = 0;
        while done < steps && !self.is_finished() {
            let old = self.current.energy();
            let token = self.current.step(&mut self.rng);
            let new = self.current.energy();

            if old != new {
                if metropolis_accept(old, new, self.temperature, &mut self.rng) {
                    if new < self.best_energy {
                        self.best_energy = new;
                        self.best = self.current.clone();
                    }
                } else {
                    self.current.undo(token);
                }
            }

            self.temperature *= self.schedule.cooling;
            self.iteration += 1;
            done += 1;
        }
        done
    }

    /// Run to completion.
    pub fn run(&mut self) {
        while !self.is_finished() {
            self.advance(u32::MAX);
        }
    }

    /// Fraction of the effective schedule completed, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.is_finished() {
            return 1.0;
        }
        let total = self.schedule.effective_iterations().max(1);
        (self.iteration as f64 / total as f64).min(1.0)
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn current(&self) -> &C {
        &self.current
    }

    pub fn best(&self) -> &C {
        &self.best
    }

    pub fn best_energy(&self) -> f64 {
        self.best_energy
    }

    pub fn into_best(self) -> C {
        self.best
    }
}
