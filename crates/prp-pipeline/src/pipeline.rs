//! Run orchestration.
//!
//! [`PrpPipeline`] drives a run through strategy, build, and evaluation,
//! recording a history snapshot at every step. Phase boundaries go through
//! the transition validator, a failed phase gate recycles the run, and the
//! evaluation phase ends with the Cerebrum verdict.

use std::sync::Arc;

use prp_core::{
    decide, validate_state, validate_transition, Blueprint, CerebrumConfig, CerebrumDecision,
    Clock, EnforcementProfile, IdGenerator, Phase, PrpState, SystemClock, UuidGenerator, Verdict,
};
use prp_history::ExecutionHistory;
use tracing::info;

use crate::executor::PhaseExecutor;
use crate::validator::Validator;

/// Validators to run per execution phase.
#[derive(Default)]
pub struct PhaseValidators {
    pub strategy: Vec<Arc<dyn Validator>>,
    pub build: Vec<Arc<dyn Validator>>,
    pub evaluation: Vec<Arc<dyn Validator>>,
}

impl PhaseValidators {
    fn for_phase(&self, phase: Phase) -> &[Arc<dyn Validator>] {
        match phase {
            Phase::Strategy => &self.strategy,
            Phase::Build => &self.build,
            Phase::Evaluation => &self.evaluation,
            Phase::Completed | Phase::Recycled => &[],
        }
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The final state snapshot.
    pub state: PrpState,

    /// The Cerebrum decision, when evaluation was reached.
    pub decision: Option<CerebrumDecision>,

    /// Number of snapshots the run appended to the history.
    pub history_len: usize,
}

impl PipelineOutcome {
    /// Whether the run ended promoted.
    pub fn promoted(&self) -> bool {
        self.state.phase == Phase::Completed
    }
}

/// The run orchestrator.
pub struct PrpPipeline {
    history: Arc<dyn ExecutionHistory>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    cerebrum: CerebrumConfig,
    deterministic: bool,
}

impl PrpPipeline {
    /// Pipeline with wall-clock time and UUID identifiers.
    pub fn new(history: Arc<dyn ExecutionHistory>) -> Self {
        Self {
            history,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            cerebrum: CerebrumConfig::default(),
            deterministic: false,
        }
    }

    /// Pipeline with injected collaborators. Runs are marked deterministic
    /// and their snapshots replay byte-identically.
    pub fn deterministic(
        history: Arc<dyn ExecutionHistory>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            history,
            clock,
            ids,
            cerebrum: CerebrumConfig::default(),
            deterministic: true,
        }
    }

    /// Override the decision thresholds.
    pub fn with_cerebrum_config(mut self, config: CerebrumConfig) -> Self {
        self.cerebrum = config;
        self
    }

    /// Drive a blueprint through the full pipeline.
    ///
    /// The outcome's state is terminal (`completed` or `recycled`), or
    /// still in `evaluation` when the Cerebrum verdict is pending. Every
    /// intermediate snapshot lands in the history before the next step runs.
    pub async fn run(
        &self,
        blueprint: Blueprint,
        enforcement_profile: Option<EnforcementProfile>,
        validators: &PhaseValidators,
    ) -> anyhow::Result<PipelineOutcome> {
        let mut state = PrpState::new(
            blueprint,
            enforcement_profile,
            self.clock.as_ref(),
            self.ids.as_ref(),
        );
        state.metadata.deterministic = self.deterministic;
        validate_state(&state)?;

        let run_id = state.run_id.clone();
        info!(run_id = %run_id, title = %state.blueprint.title, "starting run");
        self.history.append(&run_id, state.clone()).await?;

        loop {
            let phase = state.phase;
            let gate = PhaseExecutor::run_phase(
                &mut state,
                validators.for_phase(phase),
                self.clock.as_ref(),
                self.ids.as_ref(),
            )
            .await?;
            state.checkpoint(self.clock.as_ref(), self.ids.as_ref());
            self.history.append(&run_id, state.clone()).await?;

            if !gate.passed {
                info!(run_id = %run_id, phase = %phase, "phase gate failed, recycling");
                let state = self.finish(state, Phase::Recycled).await?;
                return self.outcome(state).await;
            }

            if phase == Phase::Evaluation {
                let decision = decide(&state, &self.cerebrum, self.clock.now());
                info!(
                    run_id = %run_id,
                    verdict = ?decision.decision,
                    confidence = decision.confidence,
                    "cerebrum verdict"
                );
                let verdict = decision.decision;
                state.cerebrum = Some(decision);
                let state = match verdict {
                    Verdict::Promote => self.finish(state, Phase::Completed).await?,
                    Verdict::Recycle => self.finish(state, Phase::Recycled).await?,
                    Verdict::Pending => {
                        // Not enough signal; the run stays live in
                        // evaluation for a later resume or manual recycle.
                        self.history.append(&run_id, state.clone()).await?;
                        state
                    }
                };
                return self.outcome(state).await;
            }

            let next = match phase.next() {
                Some(next) => next,
                None => anyhow::bail!("phase {phase} has no successor"),
            };
            validate_transition(&state, next)?;
            state.phase = next;
            self.history.append(&run_id, state.clone()).await?;
        }
    }

    /// Manually recycle a live run, recording the reason in its outputs.
    pub async fn recycle(
        &self,
        mut state: PrpState,
        reason: impl Into<String>,
    ) -> anyhow::Result<PrpState> {
        let reason = reason.into();
        validate_transition(&state, Phase::Recycled)?;
        info!(run_id = %state.run_id, %reason, "recycling run");
        state
            .outputs
            .insert("recycle_reason".to_string(), serde_json::Value::String(reason));
        self.finish(state, Phase::Recycled).await
    }

    async fn outcome(&self, state: PrpState) -> anyhow::Result<PipelineOutcome> {
        let history_len = self.history.get(&state.run_id).await?.len();
        let decision = state.cerebrum.clone();
        Ok(PipelineOutcome {
            state,
            decision,
            history_len,
        })
    }

    async fn finish(&self, mut state: PrpState, terminal: Phase) -> anyhow::Result<PrpState> {
        validate_transition(&state, terminal)?;
        state.phase = terminal;
        state.metadata.end_time = Some(self.clock.now());
        self.history.append(&state.run_id, state.clone()).await?;
        info!(run_id = %state.run_id, phase = %terminal, "run finished");
        Ok(state)
    }
}
