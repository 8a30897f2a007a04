//! Position-tracking little-endian output stream.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Mat4, Vec3, Vec4};

use crate::errors::Result;

/// Output stream over any seekable sink.
///
/// Tracks the absolute write position so entity offsets can be recorded
/// without querying the sink.
pub struct OStream<W: Write + Seek> {
    writer: W,
    pos: u64,
}

impl<W: Write + Seek> OStream<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        let pos = writer.stream_position()?;
        Ok(Self { writer, pos })
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    /// Length-prefixed counts and ids.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        self.write_u64(count as u64)
    }

    pub fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        for c in v.to_array() {
            self.write_f32(c)?;
        }
        Ok(())
    }

    pub fn write_vec4(&mut self, v: Vec4) -> Result<()> {
        for c in v.to_array() {
            self.write_f32(c)?;
        }
        Ok(())
    }

    /// 16 floats, column-major.
    pub fn write_matrix(&mut self, m: &Mat4) -> Result<()> {
        for c in m.to_cols_array() {
            self.write_f32(c)?;
        }
        Ok(())
    }

    pub fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        for &v in values {
            self.write_f32(v)?;
        }
        Ok(())
    }

    /// Byte blob prefixed by its u64 length.
    pub fn write_blob(&mut self, data: &[u8]) -> Result<()> {
        self.write_count(data.len())?;
        self.write_bytes(data)
    }

    /// UTF-8 string prefixed by its u64 byte length.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_blob(s.as_bytes())
    }

    /// Seek to an absolute position and return it.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Seek to the end and return the position.
    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::End(0))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_position_tracks_writes_and_seeks() {
        let mut out = OStream::new(Cursor::new(Vec::new())).unwrap();
        out.write_u8(1).unwrap();
        out.write_u64(0).unwrap();
        out.write_string("abc").unwrap();
        assert_eq!(out.pos(), 1 + 8 + 8 + 3);

        out.seek(1).unwrap();
        out.write_u64(0xAABB).unwrap();
        assert_eq!(out.pos(), 9);
        assert_eq!(out.seek_end().unwrap(), 20);

        let bytes = out.into_inner().into_inner();
        assert_eq!(&bytes[1..3], &[0xBB, 0xAA]);
        assert_eq!(&bytes[17..], b"abc");
    }

    #[test]
    fn test_matrix_is_column_major() {
        let mut out = OStream::new(Cursor::new(Vec::new())).unwrap();
        let m = Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0));
        out.write_matrix(&m).unwrap();
        let bytes = out.into_inner().into_inner();
        assert_eq!(bytes.len(), 64);
        let x = f32::from_le_bytes(bytes[48..52].try_into().unwrap());
        assert_eq!(x, 5.0);
    }
}
