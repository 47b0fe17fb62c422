//! drcal-core: Core types for dual-readout calorimeter event conversion.
//!
//! This crate provides the record types (hits, MC particles), the packed
//! cell-identifier decoder, the per-hit kinematic derivation, and the
//! columnar collection assembly used by the store I/O layer.
//!

pub mod cellid;
pub mod collection;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hit;
pub mod particle;

pub use cellid::CellId;
pub use collection::{
    HitCollection, HitColumns, McCollection, McColumns, OpticalColumns, PhotonBlock,
};
pub use error::{Error, Result};
pub use event::{EventEntry, EventSet};
pub use geometry::SphericalCoords;
pub use hit::{HitRecord, HitSchema, OpticalData, PhotonArrays, ProductionCounts, WAVELEN_BINS};
pub use particle::McParticle;
