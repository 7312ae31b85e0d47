//! Binary checkpoint codec for owner-held parameters.
//!
//! A checkpoint file is a record set of (name, version, payload) triples,
//! one per owned parameter, written under `{folder}/step{step}-worker{id}`.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

/// One persisted parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRecord {
    pub name: String,
    pub version: i64,
    pub values: Vec<f32>,
}

/// Deterministic checkpoint file path for a (step, worker) pair.
pub fn checkpoint_path(folder: &Path, step: i64, worker_id: i32) -> PathBuf {
    folder.join(format!("step{step}-worker{worker_id}"))
}

/// Writes a record set to `path`, creating parent directories as needed.
pub fn write(path: &Path, records: &[ParamRecord]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&(records.len() as u32).to_be_bytes())?;

    for rec in records {
        out.write_all(&(rec.name.len() as u32).to_be_bytes())?;
        out.write_all(rec.name.as_bytes())?;
        out.write_all(&rec.version.to_be_bytes())?;
        out.write_all(&(rec.values.len() as u32).to_be_bytes())?;
        out.write_all(bytemuck::cast_slice(&rec.values))?;
    }

    out.flush()
}

/// Reads a record set back from `path`.
///
/// # Errors
/// `io::ErrorKind::InvalidData` on a corrupt record, `UnexpectedEof` on a
/// truncated file.
pub fn read(path: &Path) -> io::Result<Vec<ParamRecord>> {
    let mut input = BufReader::new(File::open(path)?);

    let count = read_u32(&mut input)? as usize;
    let mut records = Vec::with_capacity(count);

    for _ in 0..count {
        let name_len = read_u32(&mut input)? as usize;
        let mut name = vec![0; name_len];
        input.read_exact(&mut name)?;
        let name = String::from_utf8(name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut version = [0; 8];
        input.read_exact(&mut version)?;
        let version = i64::from_be_bytes(version);

        let value_count = read_u32(&mut input)? as usize;
        let mut values = vec![0.0f32; value_count];
        input.read_exact(bytemuck::cast_slice_mut(&mut values))?;

        records.push(ParamRecord {
            name,
            version,
            values,
        });
    }

    Ok(records)
}

fn read_u32<R: Read>(input: &mut R) -> io::Result<u32> {
    let mut buf = [0; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ckpt-codec-{}-{tag}", std::process::id()))
    }

    #[test]
    fn round_trip_preserves_records_by_name() {
        let path = temp_file("roundtrip");
        let mut records = vec![
            ParamRecord {
                name: "w1".into(),
                version: 12,
                values: vec![0.25, -1.0, 3.5],
            },
            ParamRecord {
                name: "b1".into(),
                version: 12,
                values: vec![0.0],
            },
        ];

        write(&path, &records).unwrap();
        let mut reloaded = read(&path).unwrap();

        // Order-independent comparison.
        records.sort_by(|a, b| a.name.cmp(&b.name));
        reloaded.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(reloaded, records);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_record_set_round_trips() {
        let path = temp_file("empty");
        write(&path, &[]).unwrap();
        assert!(read(&path).unwrap().is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn truncated_file_reports_unexpected_eof() {
        let path = temp_file("truncated");
        write(
            &path,
            &[ParamRecord {
                name: "w1".into(),
                version: 0,
                values: vec![1.0, 2.0],
            }],
        )
        .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let err = read(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn path_is_keyed_by_step_and_worker() {
        let p = checkpoint_path(Path::new("/tmp/ckpt"), 40, 2);
        assert_eq!(p, Path::new("/tmp/ckpt/step40-worker2"));
    }
}
