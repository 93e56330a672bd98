//! Binary encoding of the dense vector block (`vectors.bin`).
//!
//! ```text
//! offset  size  field
//! 0       4     magic "PMVS"
//! 4       2     format version (u16 LE)
//! 6       2     reserved, zero
//! 8       4     dim (u32 LE)
//! 12      4     reserved, zero
//! 16      8     count (u64 LE)
//! 24      ..    count * dim f32 LE, row-major
//! ```

use crate::IndexError;

pub const MAGIC: [u8; 4] = *b"PMVS";

/// Bump whenever the layout above changes.
pub const FORMAT_VERSION: u16 = 1;

pub const HEADER_LEN: usize = 24;

/// Decoded header of a vector block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorHeader {
    pub dim: usize,
    pub count: usize,
}

pub fn encode_vectors(dim: usize, data: &[f32]) -> Result<Vec<u8>, IndexError> {
    let count = if dim == 0 { 0 } else { data.len() / dim };
    if count * dim != data.len() {
        return Err(IndexError::corrupt(format!(
            "{} values do not divide into rows of {dim}",
            data.len()
        )));
    }
    let dim_u32 = u32::try_from(dim)
        .map_err(|_| IndexError::corrupt(format!("dimension {dim} exceeds u32")))?;

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() * 4);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&dim_u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(count as u64).to_le_bytes());
    extend_le_f32(&mut out, data);
    Ok(out)
}

pub fn decode_vectors(bytes: &[u8]) -> Result<(VectorHeader, Vec<f32>), IndexError> {
    if bytes.len() < HEADER_LEN {
        return Err(IndexError::corrupt(format!(
            "vector block is {} bytes, shorter than its header",
            bytes.len()
        )));
    }
    if bytes[0..4] != MAGIC {
        return Err(IndexError::corrupt("bad magic in vector block"));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(IndexError::corrupt(format!(
            "unsupported vector format version {version}"
        )));
    }
    let dim = u32::from_le_bytes(le_array(&bytes[8..12])) as usize;
    let count = u64::from_le_bytes(le_array(&bytes[16..24]));
    let count = usize::try_from(count)
        .map_err(|_| IndexError::corrupt(format!("row count {count} exceeds usize")))?;
    if dim == 0 && count != 0 {
        return Err(IndexError::corrupt("zero-dimensional rows in a non-empty store"));
    }

    let payload = &bytes[HEADER_LEN..];
    let expected = count
        .checked_mul(dim)
        .and_then(|values| values.checked_mul(4))
        .ok_or_else(|| IndexError::corrupt("vector block size overflows"))?;
    if payload.len() != expected {
        return Err(IndexError::corrupt(format!(
            "vector payload is {} bytes, header declares {count} x {dim} f32 ({expected} bytes)",
            payload.len()
        )));
    }

    let data = read_le_f32(payload);
    if let Some(position) = data.iter().position(|v| !v.is_finite()) {
        return Err(IndexError::corrupt(format!(
            "non-finite value in row {}",
            position / dim.max(1)
        )));
    }
    Ok((VectorHeader { dim, count }, data))
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

#[cfg(target_endian = "little")]
fn extend_le_f32(out: &mut Vec<u8>, data: &[f32]) {
    out.extend_from_slice(bytemuck::cast_slice(data));
}

#[cfg(target_endian = "big")]
fn extend_le_f32(out: &mut Vec<u8>, data: &[f32]) {
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn read_le_f32(payload: &[u8]) -> Vec<f32> {
    // copies, so the payload does not need f32 alignment
    let mut data: Vec<f32> = bytemuck::pod_collect_to_vec(payload);
    if cfg!(target_endian = "big") {
        for value in &mut data {
            *value = f32::from_bits(u32::from_le(value.to_bits()));
        }
    }
    data
}
