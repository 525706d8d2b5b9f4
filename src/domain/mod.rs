//! Domain model: submissions, payloads, payment files, API revisions, and the
//! store port the application layer writes through.

pub mod file;
pub mod fingerprint;
pub mod payment;
pub mod ports;
pub mod submission;
pub mod version;
