//! Binary persistence of the record store.
//!
//! File layout (all integers little-endian):
//!
//! ```text
//! [MAGIC 8B "QUIVRDB\0"][VERSION u32][SECTION u32][CHECKSUM u32]
//! record_count : u64
//! repeat record_count times:
//!     id          : i32
//!     field_count : u64
//!     repeat field_count times:
//!         name_len : u64
//!         name     : name_len bytes UTF-8
//!         tag      : i32   // 0 = integer, 1 = float, 2 = string
//!         payload  : i64 | f64 | (u64 length + bytes UTF-8)
//! ```
//!
//! The checksum is CRC32 over everything after the header. Writes go to a
//! temporary sibling file and rename into place, so a failed write never
//! clobbers the previous snapshot.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{QuiverDbError, Result};
use crate::metadata::store::{DataStore, Record};
use crate::metadata::value::FieldValue;
use crate::persistence::{FileHeader, Section};
use crate::types::DocId;

const TAG_INT: i32 = 0;
const TAG_FLOAT: i32 = 1;
const TAG_STR: i32 = 2;

impl DataStore {
    /// Write the record table to `path`.
    ///
    /// The field index is not persisted; it is rebuilt on load from the
    /// records themselves.
    pub fn serialize(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut body = Vec::new();

        // Walk ids in order so equal stores serialize to equal bytes
        write_u64(&mut body, self.len() as u64);
        for &id in self.ids() {
            let record = self
                .record(id)
                .ok_or_else(|| QuiverDbError::internal("id set references missing record"))?;
            write_record(&mut body, id, record);
        }

        let header = FileHeader::new(Section::Metadata, crc32fast::hash(&body));

        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&header.to_bytes())?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Read a record table from `path` into a fresh store, rebuilding the
    /// field index and id set.
    pub fn deserialize(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        let body = FileHeader::verify(&data, Section::Metadata)?;

        let mut cursor = Cursor { data: body, pos: 0 };
        let record_count = cursor.read_u64()?;

        let mut store = DataStore::new();
        for _ in 0..record_count {
            let (id, record) = read_record(&mut cursor)?;
            store.set(id, record);
        }

        if cursor.pos != body.len() {
            return Err(QuiverDbError::corrupt_format(
                "trailing bytes after last record",
            ));
        }

        Ok(store)
    }
}

fn write_record(out: &mut Vec<u8>, id: DocId, record: &Record) {
    out.extend_from_slice(&id.to_le_bytes());
    write_u64(out, record.len() as u64);
    for (name, value) in record {
        write_u64(out, name.len() as u64);
        out.extend_from_slice(name.as_bytes());
        write_value(out, value);
    }
}

fn write_value(out: &mut Vec<u8>, value: &FieldValue) {
    match value {
        FieldValue::Int(i) => {
            out.extend_from_slice(&TAG_INT.to_le_bytes());
            out.extend_from_slice(&i.to_le_bytes());
        }
        FieldValue::Float(f) => {
            out.extend_from_slice(&TAG_FLOAT.to_le_bytes());
            out.extend_from_slice(&f.to_le_bytes());
        }
        FieldValue::Str(s) => {
            out.extend_from_slice(&TAG_STR.to_le_bytes());
            write_u64(out, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
    }
}

fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn read_record(cursor: &mut Cursor<'_>) -> Result<(DocId, Record)> {
    let id = cursor.read_i32()?;
    let field_count = cursor.read_u64()?;

    let mut record = Record::new();
    for _ in 0..field_count {
        let name = cursor.read_string()?;
        let value = read_value(cursor)?;
        record.insert(name, value);
    }

    Ok((id, record))
}

fn read_value(cursor: &mut Cursor<'_>) -> Result<FieldValue> {
    match cursor.read_i32()? {
        TAG_INT => Ok(FieldValue::Int(cursor.read_i64()?)),
        TAG_FLOAT => Ok(FieldValue::Float(cursor.read_f64()?)),
        TAG_STR => Ok(FieldValue::Str(cursor.read_string()?)),
        tag => Err(QuiverDbError::corrupt_format(format!(
            "unknown field value tag: {tag}"
        ))),
    }
}

/// Bounds-checked reader over the body section. Short reads surface as
/// `CorruptFormat` rather than panics.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.pos + n > self.data.len() {
            return Err(QuiverDbError::corrupt_format("unexpected end of file"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u64()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| QuiverDbError::corrupt_format("invalid UTF-8 in string payload"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;
    use tempfile::tempdir;

    fn sample_store() -> DataStore {
        let mut store = DataStore::new();
        let mut record = Record::new();
        record.insert("name".into(), FieldValue::Str("Jack".into()));
        record.insert("age".into(), FieldValue::Int(32));
        record.insert("score".into(), FieldValue::Float(7.25));
        store.set(10, record);

        let mut record = Record::new();
        record.insert("name".into(), FieldValue::Str("Karen".into()));
        record.insert("age".into(), FieldValue::Int(29));
        store.set(11, record);

        store
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.data");

        let store = sample_store();
        store.serialize(&path).unwrap();

        let loaded = DataStore::deserialize(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(10).unwrap(), store.get(10).unwrap());
        assert_eq!(loaded.get(11).unwrap(), store.get(11).unwrap());

        // The rebuilt field index answers the same queries
        let f = parse_filter("age >= 30").unwrap();
        assert_eq!(loaded.filter(&f), store.filter(&f));
        let f = parse_filter("name = \"Karen\"").unwrap();
        assert_eq!(loaded.filter(&f), store.filter(&f));
    }

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.data");
        let second = dir.path().join("b.data");

        let store = sample_store();
        store.serialize(&first).unwrap();

        let loaded = DataStore::deserialize(&first).unwrap();
        loaded.serialize(&second).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_corrupt_tag_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.data");

        let mut body = Vec::new();
        write_u64(&mut body, 1);
        body.extend_from_slice(&7i32.to_le_bytes()); // id
        write_u64(&mut body, 1); // one field
        write_u64(&mut body, 1);
        body.extend_from_slice(b"x");
        body.extend_from_slice(&9i32.to_le_bytes()); // bogus tag
        body.extend_from_slice(&0i64.to_le_bytes());

        let header = FileHeader::new(Section::Metadata, crc32fast::hash(&body));
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&body);
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            DataStore::deserialize(&path),
            Err(QuiverDbError::CorruptFormat(_))
        ));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.data");

        let store = sample_store();
        store.serialize(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 4);
        fs::write(&path, &bytes).unwrap();

        // Truncation breaks the checksum before it breaks the cursor
        assert!(DataStore::deserialize(&path).is_err());
    }

    #[test]
    fn test_flipped_bit_fails_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.data");

        sample_store().serialize(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            DataStore::deserialize(&path),
            Err(QuiverDbError::ChecksumMismatch)
        ));
    }
}
