//! Command implementations for the paysim CLI.

pub mod generate;
pub mod health;
pub mod run;
pub mod stages;
