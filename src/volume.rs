//! Boundary to volumetric image data.
//!
//! The job compiler never reads voxels; it only needs dimension counts to
//! enumerate frames. [`NiftiHeaderSource`] parses just the dimension array
//! of a NIfTI-1 header (plain, gzipped, or `.hdr`/`.img` pairs).

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::error::{SpmError, SpmResult};

/// Access to a volume's shape, slowest-varying dimension last.
pub trait VolumeSource {
    fn shape(&self, path: &Path) -> SpmResult<Vec<u64>>;
}

/// Shape reader backed by NIfTI-1 headers on disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct NiftiHeaderSource;

const HEADER_LEN: usize = 348;
const SIZEOF_HDR: i32 = 348;
const DIM_OFFSET: usize = 40;

impl VolumeSource for NiftiHeaderSource {
    fn shape(&self, path: &Path) -> SpmResult<Vec<u64>> {
        let header_path = header_path(path);
        let header = read_header(&header_path)
            .map_err(|e| SpmError::data_access(format!("'{}': {e:#}", header_path.display())))?;
        parse_dims(&header, &header_path)
    }
}

/// `.img` data files carry their header in the companion `.hdr`.
fn header_path(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some("img") => path.with_extension("hdr"),
        _ => path.to_path_buf(),
    }
}

fn read_header(path: &Path) -> anyhow::Result<[u8; HEADER_LEN]> {
    let file = File::open(path).with_context(|| "failed to open volume")?;
    let mut header = [0u8; HEADER_LEN];
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        flate2::read::GzDecoder::new(file)
            .read_exact(&mut header)
            .with_context(|| "failed to read gzipped header")?;
    } else {
        let mut file = file;
        file.read_exact(&mut header)
            .with_context(|| "failed to read header")?;
    }
    Ok(header)
}

fn parse_dims(header: &[u8; HEADER_LEN], path: &Path) -> SpmResult<Vec<u64>> {
    let sizeof_hdr = i32::from_le_bytes(header[0..4].try_into().unwrap_or([0; 4]));
    let swapped = if sizeof_hdr == SIZEOF_HDR {
        false
    } else if sizeof_hdr.swap_bytes() == SIZEOF_HDR {
        true
    } else {
        return Err(SpmError::data_access(format!(
            "'{}' is not a NIfTI-1 volume",
            path.display()
        )));
    };

    let dim_at = |i: usize| -> i16 {
        let off = DIM_OFFSET + 2 * i;
        let raw = i16::from_le_bytes([header[off], header[off + 1]]);
        if swapped { raw.swap_bytes() } else { raw }
    };

    let rank = dim_at(0);
    if !(1..=7).contains(&rank) {
        return Err(SpmError::data_access(format!(
            "'{}' has invalid dimension count {rank}",
            path.display()
        )));
    }

    let mut dims = Vec::with_capacity(rank as usize);
    for i in 1..=rank as usize {
        let d = dim_at(i);
        if d < 1 {
            return Err(SpmError::data_access(format!(
                "'{}' has non-positive extent {d} in dimension {i}",
                path.display()
            )));
        }
        dims.push(d as u64);
    }
    Ok(dims)
}
