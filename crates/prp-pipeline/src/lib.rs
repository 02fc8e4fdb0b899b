//! PRP Pipeline - phase execution and run orchestration
//!
//! The engine layer above `prp-core`: validators plug in at the
//! [`Validator`] seam, [`PhaseExecutor`] turns their findings into evidence
//! and phase gates, and [`PrpPipeline`] drives a blueprint through
//! strategy, build, and evaluation with every snapshot appended to an
//! [`ExecutionHistory`](prp_history::ExecutionHistory).

pub mod executor;
pub mod pipeline;
pub mod validator;

pub use executor::PhaseExecutor;
pub use pipeline::{PhaseValidators, PipelineOutcome, PrpPipeline};
pub use validator::{FixedValidator, Validator, ValidatorVerdict};
