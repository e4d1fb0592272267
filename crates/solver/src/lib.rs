//! Local-search solver: owns the working solution for the duration of one
//! solve and walks it towards a better score one planning variable at a
//! time.
//!
//! The loop is single-threaded and cooperative. Each iteration picks one
//! planning variable round-robin, evaluates every alternative value in its
//! range against the full constraint set, and applies the best strictly
//! improving candidate. When nothing improves, the best non-worsening
//! candidate (lowest value on ties) is taken to walk plateaus. A seeded
//! perturbation kicks the search out of prolonged stalls; the best-so-far
//! snapshot is kept aside and never regresses.
//!
//! Termination: wall-clock deadline, an optional bound on iterations
//! without best-so-far improvement, or reaching an optional target score.
//! An infeasible outcome is an answer, not an error.


use common::{EntityHandle, SolveStats, SolverConfig, SolverResult};
use constraint::CompiledConstraint;
use rand::{rngs::StdRng, Rng, SeedableRng};
use schema::SchemaRegistry;
use store::EntityStore;
use tracing::{debug, info};
use types::Score;

use std::time::Instant;

/// Outcome of one solve: the store restored to the best-so-far solution,
/// its score, and the loop counters.
#[derive(Debug)]
pub struct Solved {
    pub store: EntityStore,
    pub best_score: Score,
    pub stats: SolveStats,
}

/// One planning variable: the entity that carries it plus its value range.
#[derive(Clone, Copy, Debug)]
struct PlanningSlot {
    handle: EntityHandle,
    lo: i64,
    hi: i64,
}

/// The search harness. Borrows the compiled constraint set and schema for
/// the duration of one solve; the entity store passes through by value so
/// there is exactly one mutating owner.
pub struct LocalSearch<'a> {
    registry: &'a SchemaRegistry,
    constraints: &'a [CompiledConstraint],
    config: SolverConfig,
}

impl<'a> LocalSearch<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        constraints: &'a [CompiledConstraint],
        config: SolverConfig,
    ) -> Self {
        Self {
            registry,
            constraints,
            config,
        }
    }

    pub fn solve(&self, mut store: EntityStore) -> SolverResult<Solved> {
        let start = Instant::now();
        let deadline = start + self.config.time_limit;

        let slots = self.planning_slots(&store)?;
        self.initialize(&mut store, &slots)?;

        let mut working = score::evaluate(self.constraints, &store);
        let mut best = working;
        let mut best_values = self.snapshot(&store, &slots)?;
        let mut stats = SolveStats::default();

        info!(
            variables = slots.len(),
            constraints = self.constraints.len(),
            initial_score = %working,
            "solve started"
        );

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut cursor = 0usize;
        let mut since_best = 0u64;
        // Periodic stall escape: after this many iterations without a new
        // best, a handful of variables are re-rolled at random.
        let restart_after = 4 * slots.len() as u64 + 32;

        while !slots.is_empty() {
            if Instant::now() >= deadline {
                break;
            }
            if let Some(limit) = self.config.unimproved_step_limit {
                if since_best >= limit {
                    break;
                }
            }
            if let Some(target) = self.config.target_score {
                if best >= target {
                    break;
                }
            }

            let slot = slots[cursor];
            cursor = (cursor + 1) % slots.len();
            let current = store.planning_value(self.registry, slot.handle)?;

            // Evaluate every alternative value; ascending order plus a
            // strict comparison keeps the lowest value on score ties.
            let mut best_candidate: Option<(Score, i64)> = None;
            for value in slot.lo..slot.hi {
                if value == current {
                    continue;
                }
                store.set_planning(self.registry, slot.handle, value)?;
                let candidate = score::evaluate(self.constraints, &store);
                stats.moves_evaluated += 1;
                if best_candidate.map_or(true, |(score, _)| candidate > score) {
                    best_candidate = Some((candidate, value));
                }
            }

            match best_candidate {
                // Improving moves advance; equal-score moves walk the
                // plateau.
                Some((score, value)) if score >= working => {
                    store.set_planning(self.registry, slot.handle, value)?;
                    working = score;
                    stats.steps += 1;
                }
                _ => {
                    store.set_planning(self.registry, slot.handle, current)?;
                }
            }

            if working > best {
                best = working;
                best_values = self.snapshot(&store, &slots)?;
                since_best = 0;
                debug!(score = %best, steps = stats.steps, "new best solution");
            } else {
                since_best += 1;
                if since_best % restart_after == 0 {
                    self.perturb(&mut store, &slots, &mut rng)?;
                    working = score::evaluate(self.constraints, &store);
                }
            }
        }

        self.restore(&mut store, &slots, &best_values)?;
        stats.duration = start.elapsed();

        info!(
            score = %best,
            steps = stats.steps,
            moves_evaluated = stats.moves_evaluated,
            duration_ms = stats.duration_ms(),
            "solve finished"
        );

        Ok(Solved {
            store,
            best_score: best,
            stats,
        })
    }

    /// All planning variables in deterministic order: classes in
    /// registration order, entities in insertion order.
    fn planning_slots(&self, store: &EntityStore) -> SolverResult<Vec<PlanningSlot>> {
        let mut slots = Vec::new();
        for class in self.registry.classes() {
            let Some(binding) = self.registry.planning_binding(class)? else {
                continue;
            };
            for (handle, _) in store.iterate(class.id) {
                slots.push(PlanningSlot {
                    handle,
                    lo: binding.range.lo,
                    hi: binding.range.hi,
                });
            }
        }
        Ok(slots)
    }

    /// Deterministic starting assignment: round-robin over the range, per
    /// class, in insertion order.
    fn initialize(&self, store: &mut EntityStore, slots: &[PlanningSlot]) -> SolverResult<()> {
        for slot in slots {
            let span = slot.hi - slot.lo;
            let value = slot.lo + (i64::from(slot.handle.slot)) % span;
            store.set_planning(self.registry, slot.handle, value)?;
        }
        Ok(())
    }

    fn snapshot(&self, store: &EntityStore, slots: &[PlanningSlot]) -> SolverResult<Vec<i64>> {
        slots
            .iter()
            .map(|slot| store.planning_value(self.registry, slot.handle))
            .collect()
    }

    fn restore(
        &self,
        store: &mut EntityStore,
        slots: &[PlanningSlot],
        values: &[i64],
    ) -> SolverResult<()> {
        for (slot, value) in slots.iter().zip(values) {
            store.set_planning(self.registry, slot.handle, *value)?;
        }
        Ok(())
    }

    /// Re-roll a small random subset of variables to escape a stall. The
    /// best-so-far snapshot is unaffected.
    fn perturb(
        &self,
        store: &mut EntityStore,
        slots: &[PlanningSlot],
        rng: &mut StdRng,
    ) -> SolverResult<()> {
        let kicks = (slots.len() / 4).max(1);
        for _ in 0..kicks {
            let slot = slots[rng.gen_range(0..slots.len())];
            let value = rng.gen_range(slot.lo..slot.hi);
            store.set_planning(self.registry, slot.handle, value)?;
        }
        debug!(kicks, "perturbed working solution after stall");
        Ok(())
    }
}
