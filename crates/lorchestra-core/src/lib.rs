//! # lorchestra-core
//!
//! The pure half of the callable → plan pipeline:
//!
//! ```text
//! callable mapping ─▶ CallableResult ─▶ build_plan ─▶ Plan ─▶ (submission boundary)
//!                     (XOR items/items_ref)   (one op per item, sha256 keys)
//! ```
//!
//! Nothing here performs I/O. Errors either carry a class or stay
//! unclassified; this crate never reclassifies what it receives.

pub mod error;
pub mod identity;
pub mod plan;
pub mod result;

pub use error::{BoxError, ErrorClass, LorchestraError};
pub use identity::{
    IDEMPOTENCY_KEY_PREFIX, IDENTITY_FIELDS, IdempotencyKey, IdentitySource,
    canonical_json_bytes, idempotency_key, identity_fields,
};
pub use plan::{Operation, PLAN_VERSION, Plan, WAL_APPEND, build_plan};
pub use result::{CallableResult, Item, RESULT_SCHEMA_VERSION, Stats, json_kind};
