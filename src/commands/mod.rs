//! Command implementations for the gantry CLI

pub mod build;
pub mod deploy;
pub mod run;
pub mod validate;
