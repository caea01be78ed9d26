//! Constraint-to-QUBO encoding, decoding and verification for assignment
//! scheduling.
//!
//! A scheduling problem is an entity-by-slot grid of binary assignment
//! variables plus a list of typed constraints. This library encodes the
//! constraints into a sparse QUBO model, submits the model to a pluggable
//! sampler backend, decodes the returned sample into a schedule grid and
//! re-checks every constraint from the grid alone, independently of the
//! encoding.

pub mod api;
pub mod console;
pub mod constraints;
pub mod demo_data;
pub mod domain;
pub mod error;
pub mod qubo;
pub mod remote;
pub mod solver;
pub mod verify;
