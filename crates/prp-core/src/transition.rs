//! Phase-transition legality.
//!
//! This check sits at the engine boundary so a buggy executor cannot bypass
//! it: forward moves require the source phase's validation gate to have
//! passed, recycling is always available from a non-terminal phase, and
//! everything else (including regression) is rejected before the new state
//! is committed.

use crate::error::{PrpError, Result};
use crate::state::{Phase, PrpState};

/// Validate a transition of `state` into `to`.
///
/// # Errors
///
/// `PrpError::IllegalTransition` naming both phases and the failing
/// invariant when the move is not legal.
pub fn validate_transition(state: &PrpState, to: Phase) -> Result<()> {
    let from = state.phase;

    // Abort path: any non-terminal phase may recycle.
    if to == Phase::Recycled {
        if from.is_terminal() {
            return Err(PrpError::IllegalTransition {
                from,
                to,
                reason: "terminal phases cannot transition".to_string(),
            });
        }
        return Ok(());
    }

    if from.next() != Some(to) {
        let reason = if from.is_terminal() {
            "terminal phases cannot transition".to_string()
        } else {
            format!("{to} is not a successor of {from}")
        };
        return Err(PrpError::IllegalTransition { from, to, reason });
    }

    // Forward moves require the source phase's gate to have passed.
    match state.validation_results.for_phase(from) {
        Some(gate) if gate.passed => Ok(()),
        Some(_) => Err(PrpError::IllegalTransition {
            from,
            to,
            reason: format!("validation gate for {from} did not pass"),
        }),
        None => Err(PrpError::IllegalTransition {
            from,
            to,
            reason: format!("no validation result recorded for {from}"),
        }),
    }
}
