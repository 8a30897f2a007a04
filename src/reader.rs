//! Table reader for written files.
//!
//! Only the header is decoded: byte-order flag and offset tables. Bodies are
//! left to the engine; [`read_type_at`] peeks at a body's discriminant.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::{ExportError, Result};
use crate::registry::EntityKind;
use crate::writer::LITTLE_ENDIAN_FLAG;

/// One kind's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindTable {
    pub kind: EntityKind,
    /// `(id, offset)` pairs in file order.
    pub entries: Vec<(u64, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTables {
    pub tables: Vec<KindTable>,
}

impl FileTables {
    #[must_use]
    pub fn table(&self, kind: EntityKind) -> &[(u64, u64)] {
        self.tables
            .iter()
            .find(|t| t.kind == kind)
            .map_or(&[], |t| t.entries.as_slice())
    }

    #[must_use]
    pub fn offset_of(&self, kind: EntityKind, id: u64) -> Option<u64> {
        self.table(kind).iter().find(|(i, _)| *i == id).map(|(_, o)| *o)
    }
}

/// Reads the byte-order flag and every offset table from the start of `reader`.
pub fn read_tables<R: Read + Seek>(reader: &mut R) -> Result<FileTables> {
    reader.seek(SeekFrom::Start(0))?;
    let flag = reader.read_u8()?;
    if flag != LITTLE_ENDIAN_FLAG {
        return Err(ExportError::Internal(format!("unsupported byte-order flag {flag}")));
    }
    let mut tables = Vec::with_capacity(EntityKind::ALL.len());
    for kind in EntityKind::ALL {
        let count = reader.read_u64::<LittleEndian>()?;
        let mut entries = Vec::new();
        for _ in 0..count {
            let id = reader.read_u64::<LittleEndian>()?;
            let offset = reader.read_u64::<LittleEndian>()?;
            entries.push((id, offset));
        }
        tables.push(KindTable { kind, entries });
    }
    Ok(FileTables { tables })
}

/// Reads the u64 type discriminant at `offset`.
pub fn read_type_at<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<u64> {
    reader.seek(SeekFrom::Start(offset))?;
    Ok(reader.read_u64::<LittleEndian>()?)
}
