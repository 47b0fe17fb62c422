//! Calorimeter hit records.

use crate::cellid::CellId;
use crate::geometry::spherical_from_cartesian;
use std::fmt;
use std::str::FromStr;

/// Fixed column width for the per-hit photon wavelength/time arrays.
pub const WAVELEN_BINS: usize = 6000;

/// Per-wavelength-bin photon counts (early readout schema).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotonArrays {
    /// Total Cerenkov photon count.
    pub ncerenkov: i32,
    /// Total scintillation photon count.
    pub nscintillator: i32,
    /// Cerenkov photon counts per wavelength bin.
    pub nwavelen_cer: Vec<i32>,
    /// Scintillation photon counts per wavelength bin.
    pub nwavelen_scint: Vec<i32>,
    /// Cerenkov photon counts per time bin.
    pub ntime_cer: Vec<i32>,
    /// Scintillation photon counts per time bin.
    pub ntime_scint: Vec<i32>,
}

/// Scalar photon production summary (later readout schema).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductionCounts {
    /// Number of Cerenkov photons produced.
    pub ncerenkovprod: i32,
    /// Number of scintillation photons produced.
    pub nscintillationprod: i32,
    /// Average Cerenkov photon production time.
    pub tavgc: f32,
    /// Average scintillation photon production time.
    pub tavgs: f32,
}

/// Optical readout payload of a hit.
///
/// The two variants are mutually exclusive schema versions; a collection
/// holds hits of exactly one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum OpticalData {
    PhotonArrays(PhotonArrays),
    ProductionCounts(ProductionCounts),
}

impl OpticalData {
    /// Returns the schema variant of this payload.
    #[must_use]
    pub fn schema(&self) -> HitSchema {
        match self {
            OpticalData::PhotonArrays(_) => HitSchema::PhotonArrays,
            OpticalData::ProductionCounts(_) => HitSchema::ProductionCounts,
        }
    }
}

/// Hit schema variant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitSchema {
    /// Per-wavelength-bin photon count arrays.
    PhotonArrays,
    /// Scalar production counts and average times.
    ProductionCounts,
}

impl HitSchema {
    /// Stable name used as the on-disk schema marker.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HitSchema::PhotonArrays => "photon_arrays",
            HitSchema::ProductionCounts => "production_counts",
        }
    }
}

impl fmt::Display for HitSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HitSchema {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "photon_arrays" => Ok(HitSchema::PhotonArrays),
            "production_counts" => Ok(HitSchema::ProductionCounts),
            other => Err(format!("unknown hit schema '{other}'")),
        }
    }
}

/// One calorimeter energy deposit.
///
/// The decoded cell indices and the spherical coordinates are computed
/// once at construction and stored; reloading a persisted hit restores
/// them verbatim without recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    /// Packed cell identifier.
    pub cell_id: CellId,
    /// Deposited energy.
    pub energy: f32,
    /// Cartesian position.
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Decoded detector system index.
    pub system: u32,
    /// Decoded eta index.
    pub neta: u32,
    /// Decoded phi index.
    pub nphi: u32,
    /// Decoded depth index.
    pub ndepth: u32,
    /// Radial distance from the origin.
    pub r: f32,
    /// Polar angle.
    pub theta: f32,
    /// Azimuthal angle.
    pub phi: f32,
    /// Optical readout payload.
    pub optical: OpticalData,
}

impl HitRecord {
    /// Builds a hit from simulation-source fields, deriving the cell
    /// indices and spherical coordinates.
    #[must_use]
    pub fn from_sim(cell_id: u64, energy: f32, x: f32, y: f32, z: f32, optical: OpticalData) -> Self {
        let cell_id = CellId::new(cell_id);
        let coords = spherical_from_cartesian(x, y, z);
        Self {
            cell_id,
            energy,
            x,
            y,
            z,
            system: cell_id.system(),
            neta: cell_id.eta(),
            nphi: cell_id.phi(),
            ndepth: cell_id.depth(),
            r: coords.r,
            theta: coords.theta,
            phi: coords.phi,
            optical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn production_counts() -> OpticalData {
        OpticalData::ProductionCounts(ProductionCounts {
            ncerenkovprod: 10,
            nscintillationprod: 20,
            tavgc: 1.5,
            tavgs: 2.5,
        })
    }

    #[test]
    fn test_from_sim_derives_indices_and_angles() {
        let cell = CellId::pack(1, 42, 100, 2);
        let hit = HitRecord::from_sim(cell.raw(), 0.25, 3.0, 4.0, 0.0, production_counts());

        assert_eq!(hit.system, 1);
        assert_eq!(hit.neta, 42);
        assert_eq!(hit.nphi, 100);
        assert_eq!(hit.ndepth, 2);
        assert_relative_eq!(hit.r, 5.0);
        assert_relative_eq!(hit.phi, 0.927_295_2, epsilon = 1e-6);
    }

    #[test]
    fn test_schema_of_payload() {
        assert_eq!(production_counts().schema(), HitSchema::ProductionCounts);
        let arrays = OpticalData::PhotonArrays(PhotonArrays {
            ncerenkov: 1,
            nscintillator: 2,
            nwavelen_cer: vec![0; 4],
            nwavelen_scint: vec![0; 4],
            ntime_cer: vec![0; 4],
            ntime_scint: vec![0; 4],
        });
        assert_eq!(arrays.schema(), HitSchema::PhotonArrays);
    }

    #[test]
    fn test_schema_marker_roundtrip() {
        for schema in [HitSchema::PhotonArrays, HitSchema::ProductionCounts] {
            assert_eq!(schema.as_str().parse::<HitSchema>().unwrap(), schema);
        }
        assert!("not_a_schema".parse::<HitSchema>().is_err());
    }
}
