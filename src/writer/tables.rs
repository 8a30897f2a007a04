//! Offset tables.
//!
//! Layout, repeated for every [`EntityKind`] in file order:
//!
//! ```text
//! u64 count
//! count × (u64 id, u64 offset)   sorted by id
//! ```
//!
//! The region is reserved before any body is written, so its size must be a
//! pure function of the registry population.

use std::io::{Seek, Write};

use super::stream::OStream;
use crate::errors::{ExportError, Result};
use crate::registry::{EntityKind, EntityRegistry};

const COUNT_SIZE: u64 = 8;
const ENTRY_SIZE: u64 = 16;

/// Bytes needed by the tables of the current registry population.
#[must_use]
pub fn reserved_size(registry: &EntityRegistry) -> u64 {
    EntityKind::ALL
        .iter()
        .map(|&kind| COUNT_SIZE + ENTRY_SIZE * registry.count(kind) as u64)
        .sum()
}

/// Fills the reserved region with zeroes.
pub fn write_placeholder<W: Write + Seek>(out: &mut OStream<W>, size: u64) -> Result<()> {
    let zeros = vec![0u8; usize::try_from(size).map_err(|_| ExportError::Internal("table region too large".to_string()))?];
    out.write_bytes(&zeros)
}

/// Writes every kind's table at the current position.
pub fn write_tables<W: Write + Seek>(out: &mut OStream<W>, registry: &EntityRegistry) -> Result<()> {
    for kind in EntityKind::ALL {
        let table = registry.offset_table(kind)?;
        out.write_count(table.len())?;
        for (id, offset) in table {
            out.write_u64(id.0)?;
            out.write_u64(offset)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_size_counts_reserved_shaders() {
        let mut registry = EntityRegistry::default();
        // Eleven counts plus four bootstrap shader entries.
        assert_eq!(reserved_size(&registry), 11 * 8 + 4 * 16);
        registry.register(EntityKind::Camera, "cam", 1).unwrap();
        assert_eq!(reserved_size(&registry), 11 * 8 + 5 * 16);
    }
}
