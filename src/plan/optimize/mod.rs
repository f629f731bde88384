//! Rule-based logical plan optimization.
//!
//! Rules are pure plan-to-plan functions grouped into batches. A batch
//! either runs once or loops to a fixpoint, detected by structural
//! equality of the plan before and after a full pass. A fixpoint batch
//! that is still changing the plan at its iteration cap fails with
//! [`OptimizeError::NonTermination`] instead of looping forever.

mod local;
mod rules;

pub use local::{aggregate_over_empty_partial, FieldOracle, LocalOptimizer};
pub use rules::{
    aggregate_over_empty, default_batches, fold_constants, merge_filters, merge_limits,
    propagate_empty, push_down_filters, simplify_filters, split_topn,
};

use thiserror::Error;
use tracing::{debug, trace};

use super::logical::LogicalPlan;

/// Errors from plan optimization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// A fixpoint batch was still rewriting the plan at its iteration cap.
    #[error("batch [{batch}] did not reach a fixpoint after {iterations} iterations")]
    NonTermination {
        /// Name of the offending batch.
        batch: String,
        /// Iterations executed before giving up.
        iterations: usize,
    },
}

/// Optimizer tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
    /// Iteration cap for fixpoint batches.
    pub max_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

/// A single named rewrite rule.
pub struct Rule {
    name: &'static str,
    apply: Box<dyn Fn(LogicalPlan) -> LogicalPlan + Send + Sync>,
}

impl Rule {
    /// Creates a rule from a plan-to-plan function.
    pub fn new(
        name: &'static str,
        apply: impl Fn(LogicalPlan) -> LogicalPlan + Send + Sync + 'static,
    ) -> Self {
        Self { name, apply: Box::new(apply) }
    }

    /// The rule's name, used in logs and non-termination errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Applies the rule.
    #[must_use]
    pub fn apply(&self, plan: LogicalPlan) -> LogicalPlan {
        (self.apply)(plan)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish_non_exhaustive()
    }
}

/// How often a batch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchLimit {
    /// One pass over the rules, no fixpoint check.
    Once,
    /// Loop until a full pass changes nothing, up to the given cap.
    FixedPoint(usize),
}

/// An ordered group of rules sharing one execution policy.
#[derive(Debug)]
pub struct Batch {
    name: &'static str,
    limit: BatchLimit,
    rules: Vec<Rule>,
}

impl Batch {
    /// Creates a batch.
    #[must_use]
    pub fn new(name: &'static str, limit: BatchLimit, rules: Vec<Rule>) -> Self {
        Self { name, limit, rules }
    }

    /// The batch's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Runs batches of rules over logical plans.
#[derive(Debug)]
pub struct Optimizer {
    batches: Vec<Batch>,
}

impl Optimizer {
    /// An optimizer with a custom batch list.
    #[must_use]
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    /// The standard optimizer.
    #[must_use]
    pub fn with_defaults(config: &OptimizerConfig) -> Self {
        Self::new(default_batches(config))
    }

    /// Optimizes `plan`, running every batch in order.
    ///
    /// Rules are pure, so the result is deterministic for a given input.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::NonTermination`] when a fixpoint batch
    /// exhausts its iteration cap while still changing the plan.
    pub fn optimize(&self, plan: LogicalPlan) -> Result<LogicalPlan, OptimizeError> {
        let mut current = plan;
        for batch in &self.batches {
            current = Self::run_batch(batch, current)?;
        }
        Ok(current)
    }

    fn run_batch(batch: &Batch, mut plan: LogicalPlan) -> Result<LogicalPlan, OptimizeError> {
        match batch.limit {
            BatchLimit::Once => Ok(Self::run_pass(batch, plan)),
            BatchLimit::FixedPoint(cap) => {
                for _ in 0..cap {
                    let next = Self::run_pass(batch, plan.clone());
                    if next == plan {
                        return Ok(plan);
                    }
                    plan = next;
                }
                // One more pass decides whether the cap cut a fixpoint
                // short or the batch genuinely oscillates.
                let next = Self::run_pass(batch, plan.clone());
                if next == plan {
                    return Ok(plan);
                }
                Err(OptimizeError::NonTermination {
                    batch: batch.name.to_string(),
                    iterations: cap,
                })
            }
        }
    }

    fn run_pass(batch: &Batch, mut plan: LogicalPlan) -> LogicalPlan {
        for rule in &batch.rules {
            let next = rule.apply(plan.clone());
            if next != plan {
                debug!(batch = batch.name, rule = rule.name(), "rule changed plan");
                trace!(plan = %next.display_tree(), "plan after rule");
            }
            plan = next;
        }
        plan
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::with_defaults(&OptimizerConfig::default())
    }
}
