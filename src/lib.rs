//! The `sempod` crate provides tools for turning spectral element flow
//! snapshots into vectors for modal decomposition, projecting them onto
//! modes and interpolating them onto structured grids.

pub mod error;
pub mod field;
pub mod flow;
pub mod grid;
pub mod handle;
pub mod interpolation;
pub mod io;
pub mod mesh;
pub mod num;
pub mod projection;
pub mod vector;
