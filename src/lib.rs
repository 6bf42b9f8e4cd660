//! Surgeon Call Scheduling
//!
//! Builds a finite-domain constraint model of one month of surgeon on-call
//! duty, solves it with a pluggable [`cp::CpSolver`], and maps the result
//! back to a dated call table.
//!
//! The pipeline is [`domains`] -> [`constraints`] -> [`objective`] ->
//! [`cp`] -> [`solution`], driven end to end by [`solver::generate_schedule`].

pub mod api;
#[cfg(feature = "console")]
pub mod console;
pub mod constraints;
pub mod cp;
pub mod demo_data;
pub mod domain;
pub mod domains;
pub mod dto;
pub mod error;
pub mod objective;
pub mod solution;
pub mod solver;
pub mod stats;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
