//! Inbound adapters: bulk payment file codecs.

pub mod codec;
