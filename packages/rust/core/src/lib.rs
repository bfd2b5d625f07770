//! Core pipeline orchestration and domain logic for compenrich.
//!
//! This crate ties together the input table reader, the enrichment client,
//! and the result store into the end-to-end [`pipeline::run`].

pub mod enrichment;
pub mod input;
pub mod pipeline;

#[cfg(test)]
mod testing;
