//! Command implementations for the sluice CLI

pub mod check;
pub mod run;
