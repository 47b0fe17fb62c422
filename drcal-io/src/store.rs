//! HDF5 event store.
//!
//! Layout: a top-level `Events` group with one `Event_<n>` child group per
//! event, each holding `HitCollection` and `MCCollection` groups with one
//! typed dataset per field. Top-level attributes: `N_Events` (persisted
//! event count), `drcal_format_version`, and `hit_schema` (optical schema
//! marker).

use crate::error::{Error, Result};
use drcal_core::{
    CellId, EventEntry, EventSet, HitCollection, HitRecord, HitSchema, McCollection, McParticle,
    OpticalColumns, OpticalData, PhotonArrays, PhotonBlock, ProductionCounts,
};
use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{File, Group};
use ndarray::{ArrayView, ArrayView1};
use std::path::Path;
use std::str::FromStr;

/// Store format version stamped on every written file.
pub const FORMAT_VERSION: &str = "0.1";

const EVENTS_GROUP: &str = "Events";
const EVENT_PREFIX: &str = "Event_";
const HIT_GROUP: &str = "HitCollection";
const MC_GROUP: &str = "MCCollection";
const PHOTON_DEFLATE: u8 = 4;

/// Writes an event set to a store file.
///
/// Events are visited in ascending event-number order. An event without a
/// resolvable particle collection is dropped with a diagnostic and leaves
/// no trace in the file; the `N_Events` attribute counts only the events
/// actually persisted.
///
/// # Errors
/// Returns an error if the file cannot be created, the set mixes optical
/// schema variants, or HDF5 I/O fails.
pub fn write_store<P: AsRef<Path>>(path: P, events: &EventSet) -> Result<usize> {
    let file = File::create(path)?;
    set_attr_str(&file, "drcal_format_version", FORMAT_VERSION)?;
    let schema = events.schema();
    if let Some(schema) = schema {
        set_attr_str(&file, "hit_schema", schema.as_str())?;
    }

    let events_grp = file.create_group(EVENTS_GROUP)?;
    let mut persisted = 0usize;

    for (number, entry) in events.iter() {
        let Some(particles) = &entry.particles else {
            eprintln!("warning: no MCCollection found for event {number}, dropping");
            continue;
        };
        if let Some(schema) = schema {
            if entry.hits.schema() != schema {
                return Err(Error::InvalidFormat(format!(
                    "event {number} uses schema {}, store is {schema}",
                    entry.hits.schema()
                )));
            }
        }

        let event_grp = events_grp.create_group(&format!("{EVENT_PREFIX}{number}"))?;
        write_hit_group(&event_grp, &entry.hits)?;
        write_mc_group(&event_grp, particles)?;
        persisted += 1;
    }

    let count = u32::try_from(persisted)
        .map_err(|_| Error::InvalidFormat("event count exceeds u32 range".to_string()))?;
    file.new_attr::<u32>()
        .create("N_Events")?
        .write_scalar(&count)?;
    Ok(persisted)
}

/// Reads a store file back into an event set.
///
/// Event-group names are parsed as `Event_<integer>`; a name that fails
/// to parse, or a group missing any required dataset, is skipped with a
/// diagnostic and never partially reconstructed. The optical schema is
/// resolved from the `hit_schema` attribute, falling back to probing the
/// datasets of each event for files written without the marker.
///
/// # Errors
/// Returns an error if the file cannot be opened, the `Events` group is
/// absent, or the schema marker carries an unknown value.
pub fn read_store<P: AsRef<Path>>(path: P) -> Result<EventSet> {
    let file = File::open(path)?;
    let marker = match read_attr_opt_string(&file, "hit_schema")? {
        Some(value) => Some(
            HitSchema::from_str(&value).map_err(Error::InvalidFormat)?,
        ),
        None => None,
    };

    let events_grp = file.group(EVENTS_GROUP)?;
    let mut set = EventSet::new();

    for name in events_grp.member_names()? {
        let Some(number) = parse_event_number(&name) else {
            eprintln!("warning: invalid event group name '{name}', skipping");
            continue;
        };
        match read_event(&events_grp, &name, marker) {
            Ok(entry) => set.insert(number, entry),
            Err(e) => eprintln!("warning: skipping event {number}: {e}"),
        }
    }

    Ok(set)
}

fn parse_event_number(name: &str) -> Option<usize> {
    name.strip_prefix(EVENT_PREFIX)?.parse().ok()
}

fn read_event(events: &Group, name: &str, marker: Option<HitSchema>) -> Result<EventEntry> {
    let event_grp = events.group(name)?;
    let hit_grp = event_grp.group(HIT_GROUP)?;
    let schema = marker.unwrap_or(if hit_grp.link_exists("ncerenkovprod") {
        HitSchema::ProductionCounts
    } else {
        HitSchema::PhotonArrays
    });

    let hits = read_hit_group(&hit_grp, schema)?;
    let mc_grp = event_grp.group(MC_GROUP)?;
    let particles = read_mc_group(&mc_grp)?;

    Ok(EventEntry {
        hits,
        particles: Some(particles),
    })
}

fn write_hit_group(event: &Group, hits: &HitCollection) -> Result<()> {
    let group = event.create_group(HIT_GROUP)?;
    let cols = hits.columns();

    write_vec(&group, "cellID", &cols.cell_id)?;
    write_vec(&group, "E", &cols.energy)?;
    write_vec(&group, "x", &cols.x)?;
    write_vec(&group, "y", &cols.y)?;
    write_vec(&group, "z", &cols.z)?;
    write_vec(&group, "system", &cols.system)?;
    write_vec(&group, "neta", &cols.neta)?;
    write_vec(&group, "nphi", &cols.nphi)?;
    write_vec(&group, "ndepth", &cols.ndepth)?;

    match &cols.optical {
        OpticalColumns::PhotonArrays {
            ncerenkov,
            nscintillator,
            nwavelen_cer,
            nwavelen_scint,
            ntime_cer,
            ntime_scint,
        } => {
            write_vec(&group, "ncerenkov", ncerenkov)?;
            write_vec(&group, "nscintillator", nscintillator)?;
            write_photon_block(&group, "nwavelen_cer", nwavelen_cer)?;
            write_photon_block(&group, "nwavelen_scint", nwavelen_scint)?;
            write_photon_block(&group, "ntime_cer", ntime_cer)?;
            write_photon_block(&group, "ntime_scint", ntime_scint)?;
        }
        OpticalColumns::ProductionCounts {
            ncerenkovprod,
            nscintillationprod,
            tavgc,
            tavgs,
        } => {
            write_vec(&group, "ncerenkovprod", ncerenkovprod)?;
            write_vec(&group, "nscintillationprod", nscintillationprod)?;
            write_vec(&group, "tavgc", tavgc)?;
            write_vec(&group, "tavgs", tavgs)?;
        }
    }

    write_vec(&group, "r", &cols.r)?;
    write_vec(&group, "theta", &cols.theta)?;
    write_vec(&group, "phi", &cols.phi)?;
    Ok(())
}

fn write_mc_group(event: &Group, particles: &McCollection) -> Result<()> {
    let group = event.create_group(MC_GROUP)?;
    let cols = particles.columns();

    write_vec(&group, "PDG", &cols.pdg)?;
    write_vec(&group, "generatorStatus", &cols.generator_status)?;
    write_vec(&group, "simulatorStatus", &cols.simulator_status)?;
    write_vec(&group, "charge", &cols.charge)?;
    write_vec(&group, "time", &cols.time)?;
    write_vec(&group, "mass", &cols.mass)?;
    write_vec(&group, "vx", &cols.vx)?;
    write_vec(&group, "vy", &cols.vy)?;
    write_vec(&group, "vz", &cols.vz)?;
    write_vec(&group, "endx", &cols.endx)?;
    write_vec(&group, "endy", &cols.endy)?;
    write_vec(&group, "endz", &cols.endz)?;
    write_vec(&group, "px", &cols.px)?;
    write_vec(&group, "py", &cols.py)?;
    write_vec(&group, "pz", &cols.pz)?;
    write_vec(&group, "endpx", &cols.endpx)?;
    write_vec(&group, "endpy", &cols.endpy)?;
    write_vec(&group, "endpz", &cols.endpz)?;
    write_vec(&group, "spinx", &cols.spinx)?;
    write_vec(&group, "spiny", &cols.spiny)?;
    write_vec(&group, "spinz", &cols.spinz)?;
    write_vec(&group, "colorFlowa", &cols.color_flow_a)?;
    write_vec(&group, "colorFlowb", &cols.color_flow_b)?;
    Ok(())
}

#[allow(clippy::cast_sign_loss)]
fn read_hit_group(group: &Group, schema: HitSchema) -> Result<HitCollection> {
    let cell_id = read_dataset_vec::<u64>(group, "cellID")?;
    let n = cell_id.len();

    let energy = read_column::<f32>(group, "E", n)?;
    let x = read_column::<f32>(group, "x", n)?;
    let y = read_column::<f32>(group, "y", n)?;
    let z = read_column::<f32>(group, "z", n)?;
    let system = read_column::<i32>(group, "system", n)?;
    let neta = read_column::<i32>(group, "neta", n)?;
    let nphi = read_column::<i32>(group, "nphi", n)?;
    let ndepth = read_column::<i32>(group, "ndepth", n)?;
    let r = read_column::<f32>(group, "r", n)?;
    let theta = read_column::<f32>(group, "theta", n)?;
    let phi = read_column::<f32>(group, "phi", n)?;

    let optical: Vec<OpticalData> = match schema {
        HitSchema::PhotonArrays => {
            let ncerenkov = read_column::<i32>(group, "ncerenkov", n)?;
            let nscintillator = read_column::<i32>(group, "nscintillator", n)?;
            let nwavelen_cer = read_photon_rows(group, "nwavelen_cer", n)?;
            let nwavelen_scint = read_photon_rows(group, "nwavelen_scint", n)?;
            let ntime_cer = read_photon_rows(group, "ntime_cer", n)?;
            let ntime_scint = read_photon_rows(group, "ntime_scint", n)?;

            (0..n)
                .map(|i| {
                    OpticalData::PhotonArrays(PhotonArrays {
                        ncerenkov: ncerenkov[i],
                        nscintillator: nscintillator[i],
                        nwavelen_cer: nwavelen_cer[i].clone(),
                        nwavelen_scint: nwavelen_scint[i].clone(),
                        ntime_cer: ntime_cer[i].clone(),
                        ntime_scint: ntime_scint[i].clone(),
                    })
                })
                .collect()
        }
        HitSchema::ProductionCounts => {
            let ncerenkovprod = read_column::<i32>(group, "ncerenkovprod", n)?;
            let nscintillationprod = read_column::<i32>(group, "nscintillationprod", n)?;
            let tavgc = read_column::<f32>(group, "tavgc", n)?;
            let tavgs = read_column::<f32>(group, "tavgs", n)?;

            (0..n)
                .map(|i| {
                    OpticalData::ProductionCounts(ProductionCounts {
                        ncerenkovprod: ncerenkovprod[i],
                        nscintillationprod: nscintillationprod[i],
                        tavgc: tavgc[i],
                        tavgs: tavgs[i],
                    })
                })
                .collect()
        }
    };

    // Stored values are restored verbatim; derived fields are not
    // recomputed on read.
    let records: Vec<HitRecord> = (0..n)
        .map(|i| HitRecord {
            cell_id: CellId::new(cell_id[i]),
            energy: energy[i],
            x: x[i],
            y: y[i],
            z: z[i],
            system: system[i] as u32,
            neta: neta[i] as u32,
            nphi: nphi[i] as u32,
            ndepth: ndepth[i] as u32,
            r: r[i],
            theta: theta[i],
            phi: phi[i],
            optical: optical[i].clone(),
        })
        .collect();

    Ok(HitCollection::new(records, schema)?)
}

fn read_mc_group(group: &Group) -> Result<McCollection> {
    let pdg = read_dataset_vec::<i32>(group, "PDG")?;
    let n = pdg.len();

    let generator_status = read_column::<i32>(group, "generatorStatus", n)?;
    let simulator_status = read_column::<i32>(group, "simulatorStatus", n)?;
    let charge = read_column::<f32>(group, "charge", n)?;
    let time = read_column::<f32>(group, "time", n)?;
    let mass = read_column::<f64>(group, "mass", n)?;
    let vx = read_column::<f64>(group, "vx", n)?;
    let vy = read_column::<f64>(group, "vy", n)?;
    let vz = read_column::<f64>(group, "vz", n)?;
    let endx = read_column::<f64>(group, "endx", n)?;
    let endy = read_column::<f64>(group, "endy", n)?;
    let endz = read_column::<f64>(group, "endz", n)?;
    let px = read_column::<f32>(group, "px", n)?;
    let py = read_column::<f32>(group, "py", n)?;
    let pz = read_column::<f32>(group, "pz", n)?;
    let endpx = read_column::<f32>(group, "endpx", n)?;
    let endpy = read_column::<f32>(group, "endpy", n)?;
    let endpz = read_column::<f32>(group, "endpz", n)?;
    let spinx = read_column::<f32>(group, "spinx", n)?;
    let spiny = read_column::<f32>(group, "spiny", n)?;
    let spinz = read_column::<f32>(group, "spinz", n)?;
    let color_flow_a = read_column::<i32>(group, "colorFlowa", n)?;
    let color_flow_b = read_column::<i32>(group, "colorFlowb", n)?;

    let records: Vec<McParticle> = (0..n)
        .map(|i| McParticle {
            pdg: pdg[i],
            generator_status: generator_status[i],
            simulator_status: simulator_status[i],
            charge: charge[i],
            time: time[i],
            mass: mass[i],
            vx: vx[i],
            vy: vy[i],
            vz: vz[i],
            endx: endx[i],
            endy: endy[i],
            endz: endz[i],
            px: px[i],
            py: py[i],
            pz: pz[i],
            endpx: endpx[i],
            endpy: endpy[i],
            endpz: endpz[i],
            spinx: spinx[i],
            spiny: spiny[i],
            spinz: spinz[i],
            color_flow_a: color_flow_a[i],
            color_flow_b: color_flow_b[i],
            energy: McParticle::energy_momentum(px[i], py[i], pz[i], mass[i]),
        })
        .collect();

    Ok(McCollection::new(records))
}

fn write_vec<T: H5Type>(group: &Group, name: &str, data: &[T]) -> Result<()> {
    let dataset = group.new_dataset::<T>().shape((data.len(),)).create(name)?;
    if !data.is_empty() {
        dataset.write(ArrayView1::from(data))?;
    }
    Ok(())
}

fn write_photon_block(group: &Group, name: &str, block: &PhotonBlock) -> Result<()> {
    // Chunk dims must be nonzero even for the zero-row placeholder.
    let chunk_rows = block.rows().clamp(1, 256);
    let dataset = group
        .new_dataset::<i32>()
        .shape((block.rows(), block.width()))
        .chunk((chunk_rows, block.width()))
        .deflate(PHOTON_DEFLATE)
        .create(name)?;
    if block.rows() > 0 {
        let view = ArrayView::from_shape((block.rows(), block.width()), block.as_slice())
            .map_err(|e| Error::InvalidFormat(format!("photon block shape mismatch: {e}")))?;
        dataset.write(view)?;
    }
    Ok(())
}

fn read_dataset_vec<T: H5Type>(group: &Group, name: &str) -> Result<Vec<T>> {
    let dataset = group.dataset(name)?;
    Ok(dataset.read_raw::<T>()?)
}

fn read_column<T: H5Type>(group: &Group, name: &str, expected: usize) -> Result<Vec<T>> {
    let data = read_dataset_vec::<T>(group, name)?;
    if data.len() != expected {
        return Err(Error::InvalidFormat(format!(
            "dataset '{name}' has {} entries, expected {expected}",
            data.len()
        )));
    }
    Ok(data)
}

fn read_photon_rows(group: &Group, name: &str, expected: usize) -> Result<Vec<Vec<i32>>> {
    let dataset = group.dataset(name)?;
    let shape = dataset.shape();
    if shape.len() != 2 {
        return Err(Error::InvalidFormat(format!(
            "dataset '{name}' must be 2-D, got {} dimensions",
            shape.len()
        )));
    }
    if shape[0] != expected {
        return Err(Error::InvalidFormat(format!(
            "dataset '{name}' has {} rows, expected {expected}",
            shape[0]
        )));
    }
    let width = shape[1];
    let flat = dataset.read_raw::<i32>()?;
    Ok((0..expected)
        .map(|i| flat[i * width..(i + 1) * width].to_vec())
        .collect())
}

fn set_attr_str(group: &Group, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    group
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn read_attr_opt_string(group: &Group, name: &str) -> Result<Option<String>> {
    match group.attr(name) {
        Ok(attr) => {
            let value: VarLenUnicode = attr.read_scalar()?;
            Ok(Some(value.to_string()))
        }
        Err(_) => Ok(None),
    }
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drcal_core::WAVELEN_BINS;
    use tempfile::NamedTempFile;

    fn scalar_hit(cell: u64, energy: f32) -> HitRecord {
        HitRecord::from_sim(
            cell,
            energy,
            3.0,
            4.0,
            0.0,
            OpticalData::ProductionCounts(ProductionCounts {
                ncerenkovprod: 5,
                nscintillationprod: 6,
                tavgc: 0.5,
                tavgs: 0.7,
            }),
        )
    }

    fn particle(pdg: i32) -> McParticle {
        McParticle {
            pdg,
            generator_status: 1,
            simulator_status: 0,
            charge: -1.0,
            time: 0.25,
            mass: 0.000_511,
            vx: 0.1,
            vy: 0.2,
            vz: 0.3,
            endx: 1.0,
            endy: 2.0,
            endz: 3.0,
            px: 3.0,
            py: 4.0,
            pz: 0.0,
            endpx: 0.5,
            endpy: 0.6,
            endpz: 0.7,
            spinx: 0.0,
            spiny: 0.0,
            spinz: 1.0,
            color_flow_a: 1,
            color_flow_b: 2,
            energy: McParticle::energy_momentum(3.0, 4.0, 0.0, 0.000_511),
        }
    }

    fn scalar_event(hits: Vec<HitRecord>, pdgs: &[i32]) -> EventEntry {
        EventEntry {
            hits: HitCollection::new(hits, HitSchema::ProductionCounts).unwrap(),
            particles: Some(McCollection::new(pdgs.iter().map(|&p| particle(p)).collect())),
        }
    }

    #[test]
    fn test_roundtrip_preserves_fields_and_order() {
        let mut set = EventSet::new();
        set.insert(0, scalar_event(vec![scalar_hit(4098, 0.5), scalar_hit(7, 0.25)], &[11, -11]));
        set.insert(2, scalar_event(vec![scalar_hit(99, 1.5)], &[22]));

        let file = NamedTempFile::new().unwrap();
        let persisted = write_store(file.path(), &set).unwrap();
        assert_eq!(persisted, 2);

        let loaded = read_store(file.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.schema(), Some(HitSchema::ProductionCounts));

        let entry = loaded.get(0).unwrap();
        assert_eq!(entry.hits.records(), set.get(0).unwrap().hits.records());
        assert_eq!(
            entry.particles.as_ref().unwrap().records(),
            set.get(0).unwrap().particles.as_ref().unwrap().records()
        );

        let order: Vec<usize> = loaded.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn test_event_without_particles_dropped() {
        let mut set = EventSet::new();
        set.insert(0, scalar_event(vec![scalar_hit(1, 0.5)], &[11]));
        set.insert(
            1,
            EventEntry {
                hits: HitCollection::new(vec![scalar_hit(2, 0.5)], HitSchema::ProductionCounts)
                    .unwrap(),
                particles: None,
            },
        );

        let file = NamedTempFile::new().unwrap();
        let persisted = write_store(file.path(), &set).unwrap();
        assert_eq!(persisted, 1);

        let h5 = File::open(file.path()).unwrap();
        let count: u32 = h5.attr("N_Events").unwrap().read_scalar().unwrap();
        assert_eq!(count, 1);
        // The dropped event leaves no trace.
        assert!(!h5.group(EVENTS_GROUP).unwrap().link_exists("Event_1"));

        let loaded = read_store(file.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get(1).is_none());
    }

    #[test]
    fn test_zero_hit_event_keeps_photon_shape() {
        let mut set = EventSet::new();
        set.insert(
            0,
            EventEntry {
                hits: HitCollection::empty(HitSchema::PhotonArrays),
                particles: Some(McCollection::new(vec![particle(13)])),
            },
        );

        let file = NamedTempFile::new().unwrap();
        write_store(file.path(), &set).unwrap();

        let h5 = File::open(file.path()).unwrap();
        let hits = h5.group("Events/Event_0/HitCollection").unwrap();
        for name in ["nwavelen_cer", "nwavelen_scint", "ntime_cer", "ntime_scint"] {
            let shape = hits.dataset(name).unwrap().shape();
            assert_eq!(shape, vec![0, WAVELEN_BINS]);
        }

        let loaded = read_store(file.path()).unwrap();
        assert!(loaded.get(0).unwrap().hits.is_empty());
        assert_eq!(loaded.get(0).unwrap().hits.schema(), HitSchema::PhotonArrays);
    }
}
