//! # lorchestra-transport
//!
//! Where plans leave the process. `SubmissionClient` hands a `Plan` plus
//! `SubmissionMeta` to an engine (`PlanExecutor`) and guarantees every error
//! it returns carries a class. `LocalWalExecutor` is a file-backed engine
//! for local runs; `run_step` chains dispatch, planning and submission.

pub mod boundary;
pub mod meta;
pub mod step;
pub mod wal;

pub use boundary::{
    NOOP_STATUS, NoopExecutor, PlanExecutor, SubmissionClient, Transport, classify_failure,
    submit,
};
pub use meta::{SUBMIT_META_SCHEMA, SubmissionMeta};
pub use step::run_step;
pub use wal::{LocalWalExecutor, WalError, WalRecord, read_records};
