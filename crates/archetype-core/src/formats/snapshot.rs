//! Canonical binary snapshot.
//!
//! Layout: `AENV` magic, one version byte, an 8-byte little-endian checksum
//! of the payload, then the postcard payload. Tables are written in key
//! order, so identical datasets encode to identical bytes.

use crate::dataset::ReferenceData;
use crate::dwelling::{
    CHARACTERISTICS_TABLE, Characteristics, DOMESTIC_HOT_WATER_TABLE, DomesticHotWater,
    INSULATION_TABLE, InsulationPerformance, SPACE_HEATING_TABLE, SpaceHeating,
    VENTILATION_TABLE, Ventilation,
};
use crate::envelope::ENVELOPE_TABLE;
use crate::error::{DataError, DataResult};
use crate::table::{Entry, ReferenceTable};
use crate::types::{ArchetypeRef, EnvelopeRecord, ScenarioKey, ScenarioRef};
use crate::validation::{ValidationConfig, ValidationReport};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"AENV";
pub const SNAPSHOT_VERSION: u8 = 1;
const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 1 + 8;

type Rows<K, V> = Vec<(K, Entry<V>)>;

#[derive(Serialize, Deserialize)]
struct Payload {
    config: ValidationConfig,
    envelope: Rows<ScenarioKey, EnvelopeRecord>,
    characteristics: Rows<ArchetypeRef, Characteristics>,
    ventilation: Rows<ScenarioRef, Ventilation>,
    space_heating: Rows<ScenarioRef, SpaceHeating>,
    domestic_hot_water: Rows<ScenarioRef, DomesticHotWater>,
    insulation: Rows<ScenarioRef, InsulationPerformance>,
    issues: ValidationReport,
}

fn rows<K: Ord + Clone + Display, V: Clone>(table: &ReferenceTable<K, V>) -> Rows<K, V> {
    table.iter().map(|(k, e)| (k.clone(), e.clone())).collect()
}

fn table<K: Ord + Clone + Display, V>(
    name: &'static str,
    rows: Rows<K, V>,
) -> ReferenceTable<K, V> {
    let mut table = ReferenceTable::new(name);
    for (key, entry) in rows {
        table.insert(key, entry.value, entry.source);
    }
    table
}

/// 64-bit payload digest.
#[cfg(not(feature = "crypto-hash"))]
#[must_use]
pub fn checksum(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET_BASIS, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// 64-bit payload digest (leading bytes of the BLAKE3 hash).
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn checksum(bytes: &[u8]) -> u64 {
    let hash = blake3::hash(bytes);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

/// Check if bytes start with the snapshot magic.
#[must_use]
pub fn is_snapshot(bytes: &[u8]) -> bool {
    bytes.starts_with(&SNAPSHOT_MAGIC)
}

/// Encode the whole dataset, load findings included.
pub fn encode_snapshot(data: &ReferenceData) -> DataResult<Vec<u8>> {
    let payload = Payload {
        config: data.config,
        envelope: rows(&data.envelope),
        characteristics: rows(&data.characteristics),
        ventilation: rows(&data.ventilation),
        space_heating: rows(&data.space_heating),
        domestic_hot_water: rows(&data.domestic_hot_water),
        insulation: rows(&data.insulation),
        issues: data.issues.clone(),
    };
    let body = postcard::to_allocvec(&payload)?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&SNAPSHOT_MAGIC);
    bytes.push(SNAPSHOT_VERSION);
    bytes.extend_from_slice(&checksum(&body).to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode a snapshot, verifying magic, version and checksum.
pub fn decode_snapshot(bytes: &[u8]) -> DataResult<ReferenceData> {
    if bytes.len() < HEADER_LEN {
        return Err(DataError::Truncated(bytes.len()));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    let (magic, rest) = header.split_at(SNAPSHOT_MAGIC.len());
    if magic != SNAPSHOT_MAGIC {
        return Err(DataError::InvalidMagic);
    }
    let (version, digest) = rest.split_at(1);
    if version != [SNAPSHOT_VERSION] {
        return Err(DataError::UnsupportedVersion(version.first().copied().unwrap_or_default()));
    }
    let mut expected = [0u8; 8];
    expected.copy_from_slice(digest);
    let expected = u64::from_le_bytes(expected);
    let actual = checksum(body);
    if expected != actual {
        return Err(DataError::ChecksumMismatch { expected, actual });
    }

    let payload: Payload = postcard::from_bytes(body)?;
    Ok(ReferenceData {
        envelope: table(ENVELOPE_TABLE, payload.envelope),
        characteristics: table(CHARACTERISTICS_TABLE, payload.characteristics),
        ventilation: table(VENTILATION_TABLE, payload.ventilation),
        space_heating: table(SPACE_HEATING_TABLE, payload.space_heating),
        domestic_hot_water: table(DOMESTIC_HOT_WATER_TABLE, payload.domestic_hot_water),
        insulation: table(INSULATION_TABLE, payload.insulation),
        issues: payload.issues,
        config: payload.config,
    })
}
