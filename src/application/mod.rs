//! Application layer containing the submission write path.
//!
//! [`submission::IdempotentSubmissionService`] decides whether a write is a first
//! submission, a safe replay, or a conflicting duplicate.
//! [`file_payment::FileSubmissionService`] runs bulk uploads through the codec
//! registry before handing them to the same write path.

pub mod file_payment;
pub mod submission;
