//! Simulation-source event dump ingestion.
//!
//! The upstream simulation writes events as a JSON array; each event
//! exposes a hit sub-collection and a particle sub-collection under the
//! source field names. Decoding the simulation's native container format
//! is out of scope here; the dump is the interface boundary, and every
//! record is converted into core records (with derived fields computed)
//! at this point.

use crate::error::{Error, Result};
use drcal_core::{
    EventEntry, EventSet, HitCollection, HitRecord, HitSchema, McCollection, McParticle,
    OpticalData, PhotonArrays, ProductionCounts,
};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A 3-vector as the source exposes it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimVector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Color-flow tag as the source exposes it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimColorFlow {
    pub a: i32,
    pub b: i32,
}

/// Optical readout payload, one of the two mutually exclusive schema
/// variants. Which variant a dump carries is decided by the fields
/// present on its hits.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SimOptical {
    PhotonArrays {
        ncerenkov: i32,
        nscintillator: i32,
        nwavelen_cer: Vec<i32>,
        nwavelen_scint: Vec<i32>,
        ntime_cer: Vec<i32>,
        ntime_scint: Vec<i32>,
    },
    ProductionCounts {
        #[serde(rename = "nCerenkovProd")]
        ncerenkovprod: i32,
        #[serde(rename = "nScintillationProd")]
        nscintillationprod: i32,
        #[serde(rename = "tAvgC")]
        tavgc: f32,
        #[serde(rename = "tAvgS")]
        tavgs: f32,
    },
}

/// One calorimeter hit as the source exposes it.
#[derive(Debug, Clone, Deserialize)]
pub struct SimHit {
    #[serde(rename = "cellID")]
    pub cell_id: u64,
    pub energy: f32,
    pub position: SimVector3,
    #[serde(flatten)]
    pub optical: SimOptical,
}

/// One MC truth particle as the source exposes it.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParticle {
    #[serde(rename = "PDG")]
    pub pdg: i32,
    #[serde(rename = "generatorStatus")]
    pub generator_status: i32,
    #[serde(rename = "simulatorStatus")]
    pub simulator_status: i32,
    pub charge: f32,
    pub time: f32,
    pub mass: f64,
    pub vertex: SimVector3,
    pub endpoint: SimVector3,
    pub momentum: SimVector3,
    #[serde(rename = "momentumAtEndpoint")]
    pub momentum_at_endpoint: SimVector3,
    pub spin: SimVector3,
    #[serde(rename = "colorFlow")]
    pub color_flow: SimColorFlow,
}

/// One event as the source exposes it. `hits` may be absent or null.
#[derive(Debug, Clone, Deserialize)]
pub struct SimEvent {
    #[serde(default)]
    pub hits: Option<Vec<SimHit>>,
    pub particles: Vec<SimParticle>,
}

impl SimHit {
    #[allow(clippy::cast_possible_truncation)]
    fn into_record(self) -> HitRecord {
        let optical = match self.optical {
            SimOptical::PhotonArrays {
                ncerenkov,
                nscintillator,
                nwavelen_cer,
                nwavelen_scint,
                ntime_cer,
                ntime_scint,
            } => OpticalData::PhotonArrays(PhotonArrays {
                ncerenkov,
                nscintillator,
                nwavelen_cer,
                nwavelen_scint,
                ntime_cer,
                ntime_scint,
            }),
            SimOptical::ProductionCounts {
                ncerenkovprod,
                nscintillationprod,
                tavgc,
                tavgs,
            } => OpticalData::ProductionCounts(ProductionCounts {
                ncerenkovprod,
                nscintillationprod,
                tavgc,
                tavgs,
            }),
        };
        HitRecord::from_sim(
            self.cell_id,
            self.energy,
            self.position.x as f32,
            self.position.y as f32,
            self.position.z as f32,
            optical,
        )
    }
}

impl SimParticle {
    #[allow(clippy::cast_possible_truncation)]
    fn into_record(self) -> McParticle {
        let (px, py, pz) = (
            self.momentum.x as f32,
            self.momentum.y as f32,
            self.momentum.z as f32,
        );
        McParticle {
            pdg: self.pdg,
            generator_status: self.generator_status,
            simulator_status: self.simulator_status,
            charge: self.charge,
            time: self.time,
            mass: self.mass,
            vx: self.vertex.x,
            vy: self.vertex.y,
            vz: self.vertex.z,
            endx: self.endpoint.x,
            endy: self.endpoint.y,
            endz: self.endpoint.z,
            px,
            py,
            pz,
            endpx: self.momentum_at_endpoint.x as f32,
            endpy: self.momentum_at_endpoint.y as f32,
            endpz: self.momentum_at_endpoint.z as f32,
            spinx: self.spin.x as f32,
            spiny: self.spin.y as f32,
            spinz: self.spin.z as f32,
            color_flow_a: self.color_flow.a,
            color_flow_b: self.color_flow.b,
            energy: McParticle::energy_momentum(px, py, pz, self.mass),
        }
    }
}

/// Loads a simulation event dump into an [`EventSet`].
///
/// Events are numbered by their position in the dump. The hit schema
/// variant is taken from the first hit present anywhere in the dump;
/// a dump with no hits at all defaults to the production-count variant.
/// A hit of the other variant anywhere in the dump is an error.
///
/// # Errors
/// Returns an error if the file cannot be opened, the dump does not
/// parse, or the dump mixes optical schema variants.
pub fn load_sim_events<P: AsRef<Path>>(path: P) -> Result<EventSet> {
    let file = File::open(path)?;
    let events: Vec<SimEvent> = serde_json::from_reader(BufReader::new(file))?;
    assemble_events(events)
}

fn assemble_events(events: Vec<SimEvent>) -> Result<EventSet> {
    let schema = dump_schema(&events);

    let mut set = EventSet::new();
    for (number, event) in events.into_iter().enumerate() {
        let hits = match event.hits {
            Some(hits) => {
                let records: Vec<HitRecord> =
                    hits.into_iter().map(SimHit::into_record).collect();
                HitCollection::new(records, schema).map_err(|e| {
                    Error::InvalidFormat(format!("event {number}: {e}"))
                })?
            }
            None => HitCollection::empty(schema),
        };
        let particles = McCollection::new(
            event.particles.into_iter().map(SimParticle::into_record).collect(),
        );
        set.insert(
            number,
            EventEntry {
                hits,
                particles: Some(particles),
            },
        );
    }
    Ok(set)
}

fn dump_schema(events: &[SimEvent]) -> HitSchema {
    events
        .iter()
        .filter_map(|e| e.hits.as_deref())
        .flatten()
        .next()
        .map_or(HitSchema::ProductionCounts, |hit| match hit.optical {
            SimOptical::PhotonArrays { .. } => HitSchema::PhotonArrays,
            SimOptical::ProductionCounts { .. } => HitSchema::ProductionCounts,
        })
}
