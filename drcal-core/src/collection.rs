//! Columnar collection assembly.
//!
//! Collections store records in input order together with per-field
//! columnar projections, one contiguous array per attribute. Index `i`
//! across all arrays refers to the same record. Collections are built once
//! per conversion pass and are not mutated afterwards.

use crate::error::{Error, Result};
use crate::hit::{HitRecord, HitSchema, OpticalData, WAVELEN_BINS};
use crate::particle::McParticle;

/// A fixed-width 2-D block of per-hit photon counts, stored row-major.
///
/// Every row has width [`WAVELEN_BINS`] regardless of occupancy; shorter
/// source arrays are zero-padded and longer ones truncated. An empty
/// collection keeps the declared width with zero rows so the downstream
/// storage schema stays uniform across events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotonBlock {
    data: Vec<i32>,
    rows: usize,
}

impl PhotonBlock {
    fn from_rows<'a, I>(rows: I, count: usize) -> Self
    where
        I: Iterator<Item = &'a [i32]>,
    {
        let mut data = vec![0i32; count * WAVELEN_BINS];
        for (i, row) in rows.enumerate() {
            let n = row.len().min(WAVELEN_BINS);
            data[i * WAVELEN_BINS..i * WAVELEN_BINS + n].copy_from_slice(&row[..n]);
        }
        Self { data, rows: count }
    }

    /// Number of rows (records).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Fixed row width.
    #[must_use]
    pub fn width(&self) -> usize {
        WAVELEN_BINS
    }

    /// The row-major backing storage, `rows * width` long.
    #[must_use]
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    /// One row of the block.
    ///
    /// # Panics
    /// Panics if `index >= rows`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[i32] {
        &self.data[index * WAVELEN_BINS..(index + 1) * WAVELEN_BINS]
    }
}

/// Columnar projection of the optical payloads, one variant per schema.
#[derive(Debug, Clone, PartialEq)]
pub enum OpticalColumns {
    PhotonArrays {
        ncerenkov: Vec<i32>,
        nscintillator: Vec<i32>,
        nwavelen_cer: PhotonBlock,
        nwavelen_scint: PhotonBlock,
        ntime_cer: PhotonBlock,
        ntime_scint: PhotonBlock,
    },
    ProductionCounts {
        ncerenkovprod: Vec<i32>,
        nscintillationprod: Vec<i32>,
        tavgc: Vec<f32>,
        tavgs: Vec<f32>,
    },
}

/// Columnar projection of a hit collection.
#[derive(Debug, Clone, PartialEq)]
pub struct HitColumns {
    pub cell_id: Vec<u64>,
    pub energy: Vec<f32>,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub system: Vec<i32>,
    pub neta: Vec<i32>,
    pub nphi: Vec<i32>,
    pub ndepth: Vec<i32>,
    pub r: Vec<f32>,
    pub theta: Vec<f32>,
    pub phi: Vec<f32>,
    pub optical: OpticalColumns,
}

/// An immutable, order-preserving hit collection with columnar
/// projections.
#[derive(Debug, Clone, PartialEq)]
pub struct HitCollection {
    records: Vec<HitRecord>,
    schema: HitSchema,
    columns: HitColumns,
}

impl HitCollection {
    /// Assembles a collection from records of a single schema variant.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if any record's optical payload
    /// does not match `schema`.
    pub fn new(records: Vec<HitRecord>, schema: HitSchema) -> Result<Self> {
        for (index, record) in records.iter().enumerate() {
            let found = record.optical.schema();
            if found != schema {
                return Err(Error::SchemaMismatch {
                    expected: schema,
                    found,
                    index,
                });
            }
        }
        let columns = Self::project(&records, schema);
        Ok(Self {
            records,
            schema,
            columns,
        })
    }

    /// An empty collection of the given schema variant.
    #[must_use]
    pub fn empty(schema: HitSchema) -> Self {
        let columns = Self::project(&[], schema);
        Self {
            records: Vec::new(),
            schema,
            columns,
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn project(records: &[HitRecord], schema: HitSchema) -> HitColumns {
        let n = records.len();
        let optical = match schema {
            HitSchema::PhotonArrays => {
                let payload = |r: &HitRecord| match &r.optical {
                    OpticalData::PhotonArrays(p) => p.clone(),
                    OpticalData::ProductionCounts(_) => unreachable!("validated in new"),
                };
                let payloads: Vec<_> = records.iter().map(payload).collect();
                OpticalColumns::PhotonArrays {
                    ncerenkov: payloads.iter().map(|p| p.ncerenkov).collect(),
                    nscintillator: payloads.iter().map(|p| p.nscintillator).collect(),
                    nwavelen_cer: PhotonBlock::from_rows(
                        payloads.iter().map(|p| p.nwavelen_cer.as_slice()),
                        n,
                    ),
                    nwavelen_scint: PhotonBlock::from_rows(
                        payloads.iter().map(|p| p.nwavelen_scint.as_slice()),
                        n,
                    ),
                    ntime_cer: PhotonBlock::from_rows(
                        payloads.iter().map(|p| p.ntime_cer.as_slice()),
                        n,
                    ),
                    ntime_scint: PhotonBlock::from_rows(
                        payloads.iter().map(|p| p.ntime_scint.as_slice()),
                        n,
                    ),
                }
            }
            HitSchema::ProductionCounts => {
                let payload = |r: &HitRecord| match &r.optical {
                    OpticalData::ProductionCounts(p) => *p,
                    OpticalData::PhotonArrays(_) => unreachable!("validated in new"),
                };
                OpticalColumns::ProductionCounts {
                    ncerenkovprod: records.iter().map(|r| payload(r).ncerenkovprod).collect(),
                    nscintillationprod: records
                        .iter()
                        .map(|r| payload(r).nscintillationprod)
                        .collect(),
                    tavgc: records.iter().map(|r| payload(r).tavgc).collect(),
                    tavgs: records.iter().map(|r| payload(r).tavgs).collect(),
                }
            }
        };

        HitColumns {
            cell_id: records.iter().map(|r| r.cell_id.raw()).collect(),
            energy: records.iter().map(|r| r.energy).collect(),
            x: records.iter().map(|r| r.x).collect(),
            y: records.iter().map(|r| r.y).collect(),
            z: records.iter().map(|r| r.z).collect(),
            system: records.iter().map(|r| r.system as i32).collect(),
            neta: records.iter().map(|r| r.neta as i32).collect(),
            nphi: records.iter().map(|r| r.nphi as i32).collect(),
            ndepth: records.iter().map(|r| r.ndepth as i32).collect(),
            r: records.iter().map(|r| r.r).collect(),
            theta: records.iter().map(|r| r.theta).collect(),
            phi: records.iter().map(|r| r.phi).collect(),
            optical,
        }
    }

    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the collection has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The schema variant of this collection.
    #[must_use]
    pub fn schema(&self) -> HitSchema {
        self.schema
    }

    /// The hits in input order.
    #[must_use]
    pub fn records(&self) -> &[HitRecord] {
        &self.records
    }

    /// The columnar projection.
    #[must_use]
    pub fn columns(&self) -> &HitColumns {
        &self.columns
    }
}

/// Columnar projection of an MC particle collection.
#[derive(Debug, Clone, PartialEq)]
pub struct McColumns {
    pub pdg: Vec<i32>,
    pub generator_status: Vec<i32>,
    pub simulator_status: Vec<i32>,
    pub charge: Vec<f32>,
    pub time: Vec<f32>,
    pub mass: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub vz: Vec<f64>,
    pub endx: Vec<f64>,
    pub endy: Vec<f64>,
    pub endz: Vec<f64>,
    pub px: Vec<f32>,
    pub py: Vec<f32>,
    pub pz: Vec<f32>,
    pub endpx: Vec<f32>,
    pub endpy: Vec<f32>,
    pub endpz: Vec<f32>,
    pub spinx: Vec<f32>,
    pub spiny: Vec<f32>,
    pub spinz: Vec<f32>,
    pub color_flow_a: Vec<i32>,
    pub color_flow_b: Vec<i32>,
    pub energy: Vec<f64>,
}

/// An immutable, order-preserving MC particle collection with columnar
/// projections.
#[derive(Debug, Clone, PartialEq)]
pub struct McCollection {
    records: Vec<McParticle>,
    columns: McColumns,
}

impl McCollection {
    /// Assembles a collection from particle records.
    #[must_use]
    pub fn new(records: Vec<McParticle>) -> Self {
        let columns = McColumns {
            pdg: records.iter().map(|p| p.pdg).collect(),
            generator_status: records.iter().map(|p| p.generator_status).collect(),
            simulator_status: records.iter().map(|p| p.simulator_status).collect(),
            charge: records.iter().map(|p| p.charge).collect(),
            time: records.iter().map(|p| p.time).collect(),
            mass: records.iter().map(|p| p.mass).collect(),
            vx: records.iter().map(|p| p.vx).collect(),
            vy: records.iter().map(|p| p.vy).collect(),
            vz: records.iter().map(|p| p.vz).collect(),
            endx: records.iter().map(|p| p.endx).collect(),
            endy: records.iter().map(|p| p.endy).collect(),
            endz: records.iter().map(|p| p.endz).collect(),
            px: records.iter().map(|p| p.px).collect(),
            py: records.iter().map(|p| p.py).collect(),
            pz: records.iter().map(|p| p.pz).collect(),
            endpx: records.iter().map(|p| p.endpx).collect(),
            endpy: records.iter().map(|p| p.endpy).collect(),
            endpz: records.iter().map(|p| p.endpz).collect(),
            spinx: records.iter().map(|p| p.spinx).collect(),
            spiny: records.iter().map(|p| p.spiny).collect(),
            spinz: records.iter().map(|p| p.spinz).collect(),
            color_flow_a: records.iter().map(|p| p.color_flow_a).collect(),
            color_flow_b: records.iter().map(|p| p.color_flow_b).collect(),
            energy: records.iter().map(|p| p.energy).collect(),
        };
        Self { records, columns }
    }

    /// Number of particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the collection has no particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The particles in input order.
    #[must_use]
    pub fn records(&self) -> &[McParticle] {
        &self.records
    }

    /// The columnar projection.
    #[must_use]
    pub fn columns(&self) -> &McColumns {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::{PhotonArrays, ProductionCounts};

    fn array_hit(cell: u64, fill: i32, len: usize) -> HitRecord {
        HitRecord::from_sim(
            cell,
            1.0,
            1.0,
            0.0,
            0.0,
            OpticalData::PhotonArrays(PhotonArrays {
                ncerenkov: fill,
                nscintillator: fill + 1,
                nwavelen_cer: vec![fill; len],
                nwavelen_scint: vec![fill; len],
                ntime_cer: vec![fill; len],
                ntime_scint: vec![fill; len],
            }),
        )
    }

    fn scalar_hit(cell: u64) -> HitRecord {
        HitRecord::from_sim(
            cell,
            1.0,
            1.0,
            0.0,
            0.0,
            OpticalData::ProductionCounts(ProductionCounts {
                ncerenkovprod: 3,
                nscintillationprod: 4,
                tavgc: 0.5,
                tavgs: 0.6,
            }),
        )
    }

    #[test]
    fn test_empty_collection_keeps_declared_width() {
        let coll = HitCollection::empty(HitSchema::PhotonArrays);
        assert!(coll.is_empty());
        match &coll.columns().optical {
            OpticalColumns::PhotonArrays { nwavelen_cer, .. } => {
                assert_eq!(nwavelen_cer.rows(), 0);
                assert_eq!(nwavelen_cer.width(), WAVELEN_BINS);
                assert!(nwavelen_cer.as_slice().is_empty());
            }
            OpticalColumns::ProductionCounts { .. } => panic!("wrong schema"),
        }
    }

    #[test]
    fn test_photon_rows_padded_and_truncated() {
        let records = vec![array_hit(1, 7, 10), array_hit(2, 9, WAVELEN_BINS + 50)];
        let coll = HitCollection::new(records, HitSchema::PhotonArrays).unwrap();
        match &coll.columns().optical {
            OpticalColumns::PhotonArrays { ntime_scint, .. } => {
                assert_eq!(ntime_scint.rows(), 2);
                assert_eq!(ntime_scint.row(0)[9], 7);
                assert_eq!(ntime_scint.row(0)[10], 0); // zero padding
                assert_eq!(ntime_scint.row(1)[WAVELEN_BINS - 1], 9);
            }
            OpticalColumns::ProductionCounts { .. } => panic!("wrong schema"),
        }
    }

    #[test]
    fn test_columns_aligned_and_ordered() {
        let records = vec![scalar_hit(11), scalar_hit(22), scalar_hit(33)];
        let coll = HitCollection::new(records, HitSchema::ProductionCounts).unwrap();
        let cols = coll.columns();
        assert_eq!(cols.cell_id, vec![11, 22, 33]);
        assert_eq!(cols.energy.len(), coll.len());
        assert_eq!(cols.system.len(), coll.len());
        match &cols.optical {
            OpticalColumns::ProductionCounts { ncerenkovprod, .. } => {
                assert_eq!(ncerenkovprod.len(), coll.len());
            }
            OpticalColumns::PhotonArrays { .. } => panic!("wrong schema"),
        }
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let records = vec![scalar_hit(1), array_hit(2, 0, 4)];
        let err = HitCollection::new(records, HitSchema::ProductionCounts).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { index: 1, .. }));
    }

    #[test]
    fn test_mc_columns_aligned() {
        let particle = McParticle {
            pdg: 11,
            generator_status: 1,
            simulator_status: 0,
            charge: -1.0,
            time: 0.0,
            mass: 0.000_511,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            endx: 1.0,
            endy: 2.0,
            endz: 3.0,
            px: 3.0,
            py: 4.0,
            pz: 0.0,
            endpx: 0.0,
            endpy: 0.0,
            endpz: 0.0,
            spinx: 0.0,
            spiny: 0.0,
            spinz: 1.0,
            color_flow_a: 0,
            color_flow_b: 0,
            energy: McParticle::energy_momentum(3.0, 4.0, 0.0, 0.000_511),
        };
        let coll = McCollection::new(vec![particle.clone(), particle]);
        assert_eq!(coll.len(), 2);
        assert_eq!(coll.columns().pdg, vec![11, 11]);
        assert_eq!(coll.columns().energy.len(), 2);
    }
}
