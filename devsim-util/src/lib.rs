//! Utilities for model-building with DEVSim.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod helper_models;
