//! Binary Writer
//!
//! Two passes over one seekable stream:
//!
//! 1. Byte-order flag, zeroed table region sized from the registry, then
//!    every body in [`EntityKind::ALL`] order. Each body's start is recorded
//!    as that entity's offset.
//! 2. Seek back to the table region and overwrite it with the real
//!    `(id, offset)` tables. The tables must fill the region exactly.
//!
//! Instances own no body; their references carry the origin's id.

pub mod bodies;
pub mod stream;
pub mod tables;

use std::io::{Seek, Write};

use log::{debug, info};

pub use stream::OStream;

use crate::errors::{ExportError, Result};
use crate::registry::{EntityKind, EntityRegistry};

/// Byte-order flag value for little-endian files.
pub const LITTLE_ENDIAN_FLAG: u8 = 1;

/// Where things ended up in the written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub tables_offset: u64,
    pub tables_size: u64,
    pub total_size: u64,
}

/// Writes the registry into `sink` and returns the sink.
///
/// The registry must be fully populated and every entity must carry a payload.
/// On error the sink content is undefined and must be discarded.
pub fn write_file<W: Write + Seek>(registry: &mut EntityRegistry, sink: W) -> Result<(W, WriteSummary)> {
    registry.validate()?;

    let mut out = OStream::new(sink)?;
    out.write_u8(LITTLE_ENDIAN_FLAG)?;

    let tables_offset = out.pos();
    let tables_size = tables::reserved_size(registry);
    tables::write_placeholder(&mut out, tables_size)?;

    // Pass 1: bodies
    for kind in EntityKind::ALL {
        let ids: Vec<_> = registry.entities(kind).iter().map(|e| e.id).collect();
        for id in ids {
            let offset = out.pos();
            let entity = registry
                .get(id)
                .ok_or_else(|| ExportError::Internal(format!("entity {id} vanished")))?;
            let payload = entity
                .payload
                .as_ref()
                .ok_or_else(|| ExportError::Internal(format!("{} {id} has no payload", entity.kind)))?;
            bodies::write_body(&mut out, payload)?;
            debug!("Wrote {kind} {id} '{}' at {offset}", entity.name);
            registry.set_offset(id, offset)?;
        }
    }
    let end = out.pos();
    info!("Pass 1 complete: {} entities, {end} bytes", registry.len());

    // Pass 2: tables
    out.seek(tables_offset)?;
    tables::write_tables(&mut out, registry)?;
    let written = out.pos() - tables_offset;
    if written != tables_size {
        return Err(ExportError::Internal(format!(
            "offset tables took {written} bytes, {tables_size} were reserved"
        )));
    }
    let total_size = out.seek_end()?;
    out.flush()?;
    info!("Pass 2 complete: {tables_size} table bytes at {tables_offset}");

    Ok((
        out.into_inner(),
        WriteSummary {
            tables_offset,
            tables_size,
            total_size,
        },
    ))
}
