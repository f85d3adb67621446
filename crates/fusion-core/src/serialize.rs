//! Snapshot support for router layouts.
//!
//! Only what cannot be re-derived is written: each router's position and its
//! rendering attribute, plus the tick. Networks, rings and cursors are
//! runtime structures and are rebuilt from grid adjacency on restore.

use crate::config::RouterConfig;
use crate::engine::RouterEngine;
use crate::grid::{GridAdjacency, GridPosition};
use crate::network::RouterError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a router snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xF051_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur while restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot does not fit the grid: {0}")]
    Restore(#[from] RouterError),
}

// ---------------------------------------------------------------------------
// Snapshot layout
// ---------------------------------------------------------------------------

/// Header prepended to every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// The persisted part of one router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRecord {
    pub position: GridPosition,
    pub blend_bits: u16,
}

#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    routers: Vec<RouterRecord>,
}

/// Decode only the header of a snapshot.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: EngineSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Engine integration
// ---------------------------------------------------------------------------

impl RouterEngine {
    /// Persisted records for every router, in position order.
    pub fn router_records(&self) -> Vec<RouterRecord> {
        let mut records: Vec<RouterRecord> = self
            .routers()
            .map(|(_, node)| RouterRecord {
                position: node.position(),
                blend_bits: node.blend_bits(),
            })
            .collect();
        records.sort_by_key(|r| r.position);
        records
    }

    /// Write the engine's persisted state.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = EngineSnapshot {
            header: SnapshotHeader::new(self.tick()),
            routers: self.router_records(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Build an engine from a snapshot. Networks are rediscovered from
    /// `grid`, which must already contain the routers being restored.
    pub fn restore(
        data: &[u8],
        grid: &impl GridAdjacency,
        config: RouterConfig,
    ) -> Result<Self, DeserializeError> {
        let snapshot: EngineSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let mut engine = RouterEngine::with_config(config);
        engine.place_all(snapshot.routers.iter().map(|r| r.position), grid)?;
        for record in &snapshot.routers {
            engine.set_blend_bits(record.position, record.blend_bits)?;
        }
        engine.set_tick(snapshot.header.tick);
        tracing::debug!(
            routers = snapshot.routers.len(),
            networks = engine.network_count(),
            tick = snapshot.header.tick,
            "restored router snapshot"
        );
        Ok(engine)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, TileGrid};
    use crate::id::ConsumerId;

    fn pos(x: i32, y: i32) -> GridPosition {
        GridPosition::new(x, y)
    }

    fn two_lines() -> (TileGrid, RouterEngine) {
        let mut grid = TileGrid::new();
        for x in 0..3 {
            grid.set(pos(x, 0), Cell::Router);
            grid.set(pos(x, 5), Cell::Router);
        }
        grid.set(pos(0, 1), Cell::Consumer(ConsumerId(1)));
        let mut engine = RouterEngine::new();
        for x in 0..3 {
            engine.on_placed(pos(x, 0), &grid).unwrap();
            engine.on_placed(pos(x, 5), &grid).unwrap();
        }
        (grid, engine)
    }

    #[test]
    fn header_validation() {
        assert!(SnapshotHeader::new(0).validate().is_ok());

        let mut bad = SnapshotHeader::new(0);
        bad.magic = 0xDEAD_BEEF;
        assert!(matches!(bad.validate(), Err(DeserializeError::InvalidMagic(0xDEAD_BEEF))));

        let mut future = SnapshotHeader::new(0);
        future.version = FORMAT_VERSION + 1;
        assert!(matches!(future.validate(), Err(DeserializeError::FutureVersion(_))));

        let mut old = SnapshotHeader::new(0);
        old.version = 0;
        assert!(matches!(old.validate(), Err(DeserializeError::UnsupportedVersion(0))));
    }

    #[test]
    fn restore_rebuilds_networks_and_attributes() {
        let (grid, mut engine) = two_lines();
        engine.set_blend_bits(pos(1, 0), 0x0F1).unwrap();
        engine.end_tick(&grid);
        engine.end_tick(&grid);

        let data = engine.serialize().expect("serialize");
        let restored = RouterEngine::restore(&data, &grid, RouterConfig::default()).expect("restore");

        assert_eq!(restored.tick(), 2);
        assert_eq!(restored.router_count(), 6);
        assert_eq!(restored.network_count(), 2);
        assert_eq!(restored.router_records(), engine.router_records());

        let net = restored.network_at(pos(0, 0)).unwrap();
        assert_eq!(restored.network(net).unwrap().ring().len(), 1);
    }

    #[test]
    fn header_is_readable_alone() {
        let (_, engine) = two_lines();
        let data = engine.serialize().unwrap();
        let header = read_snapshot_header(&data).unwrap();
        assert_eq!(header, SnapshotHeader::new(0));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let result = RouterEngine::restore(&[1, 2, 3], &TileGrid::new(), RouterConfig::default());
        assert!(matches!(result, Err(DeserializeError::Decode(_))));
    }
}
