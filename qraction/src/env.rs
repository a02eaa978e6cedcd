//! Decoder runtime environment: virtual environment provisioning.

pub mod builder;
