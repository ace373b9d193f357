//! Chunked on-disk arrays.
//!
//! Each array is a directory holding a `.zarray` JSON header and one file per chunk,
//! named by the chunk's grid indices joined with `.`. Chunks hold zlib-compressed
//! little-endian values in C order; chunks on the trailing edge are padded to the
//! full chunk shape with the fill value.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::array::{ArrayData, DType, MAX_EXACT_INTEGER};

/// Name of the array header file
pub const ARRAY_META_KEY: &str = ".zarray";

/// Base chunk size in bytes (2 MiB) for a 1 MiB array
pub const CHUNK_BASE: f64 = 2.0 * 1024.0 * 1024.0;
/// Smallest target chunk size in bytes
pub const CHUNK_MIN: f64 = 256.0 * 1024.0;
/// Largest target chunk size in bytes
pub const CHUNK_MAX: f64 = 64.0 * 1024.0 * 1024.0;

/// Compressor entry of the array header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorMeta {
    /// Codec identifier, always `zlib`
    pub id: String,
    /// Compression level
    pub level: u32,
}

/// Contents of a `.zarray` header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayMeta {
    /// Array shape
    pub shape: Vec<usize>,
    /// Chunk shape
    pub chunks: Vec<usize>,
    /// Type code such as `<f8`
    pub dtype: String,
    /// Compressor, `None` for raw chunks
    pub compressor: Option<CompressorMeta>,
    /// Value of missing or padded elements
    pub fill_value: serde_json::Value,
    /// Element order, always `C`
    pub order: String,
    /// Filter pipeline (unused)
    pub filters: Option<Vec<serde_json::Value>>,
    /// Format version, always 2
    pub zarr_format: u8,
}

impl ArrayMeta {
    fn new(dtype: DType, shape: Vec<usize>, chunks: Vec<usize>, level: u32) -> Self {
        let fill_value = if dtype.is_integer() {
            serde_json::json!(0)
        } else {
            serde_json::json!(0.0)
        };
        Self {
            shape,
            chunks,
            dtype: dtype.code().to_string(),
            compressor: Some(CompressorMeta {
                id: "zlib".to_string(),
                level,
            }),
            fill_value,
            order: "C".to_string(),
            filters: None,
            zarr_format: 2,
        }
    }

    /// Parsed storage type
    pub fn dtype(&self) -> Result<DType, StoreError> {
        Ok(DType::from_code(&self.dtype)?)
    }

    fn fill(&self) -> f64 {
        self.fill_value.as_f64().unwrap_or(0.0)
    }

    /// Number of chunks along each dimension
    fn grid(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.chunks)
            .map(|(&s, &c)| s.div_ceil(c.max(1)))
            .collect()
    }
}

/// Guess a chunk shape that keeps each chunk around a size appropriate
/// for the total size of the array.
///
/// The target grows with the logarithm of the array size and is clamped between
/// [`CHUNK_MIN`] and [`CHUNK_MAX`]; axes are halved in turn until a chunk is below
/// the target (or within 50% of it).
pub fn guess_chunks(shape: &[usize], type_size: usize) -> Vec<usize> {
    let ndims = shape.len();
    if ndims == 0 {
        return Vec::new();
    }
    let mut chunks: Vec<f64> = shape.iter().map(|&s| s.max(1) as f64).collect();
    let type_size = type_size as f64;

    let dataset_size: f64 = chunks.iter().product::<f64>() * type_size;
    let target = (CHUNK_BASE * 2f64.powf((dataset_size / (1024.0 * 1024.0)).log10()))
        .clamp(CHUNK_MIN, CHUNK_MAX);

    let mut idx = 0;
    loop {
        let elements: f64 = chunks.iter().product();
        let chunk_bytes = elements * type_size;
        let close_enough = (chunk_bytes - target).abs() / target < 0.5;
        if (chunk_bytes < target || close_enough) && chunk_bytes < CHUNK_MAX {
            break;
        }
        if elements <= 1.0 {
            break;
        }
        let axis = idx % ndims;
        chunks[axis] = (chunks[axis] / 2.0).ceil();
        idx += 1;
    }
    chunks.into_iter().map(|c| c as usize).collect()
}

/// Advance a C-order multi-index within `bounds`; returns `false` once exhausted
fn advance(index: &mut [usize], bounds: &[usize]) -> bool {
    for axis in (0..index.len()).rev() {
        index[axis] += 1;
        if index[axis] < bounds[axis] {
            return true;
        }
        index[axis] = 0;
    }
    false
}

fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

fn chunk_key(index: &[usize]) -> String {
    if index.is_empty() {
        return "0".to_string();
    }
    index
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn encode(values: &[f64], dtype: DType) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::with_capacity(values.len() * dtype.item_size());
    for &value in values {
        match dtype {
            DType::Int32 => buf.write_i32::<LittleEndian>(value.round() as i32)?,
            DType::Int64 => buf.write_i64::<LittleEndian>(value.round() as i64)?,
            DType::Float32 => buf.write_f32::<LittleEndian>(value as f32)?,
            DType::Float64 => buf.write_f64::<LittleEndian>(value)?,
        }
    }
    Ok(buf)
}

fn decode(bytes: &[u8], dtype: DType, len: usize, path: &Path) -> Result<Vec<f64>, StoreError> {
    let expected = len * dtype.item_size();
    if bytes.len() != expected {
        return Err(StoreError::CorruptChunk {
            path: path.display().to_string(),
            expected,
            actual: bytes.len(),
        });
    }
    let mut cursor = Cursor::new(bytes);
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        let value = match dtype {
            DType::Int32 => f64::from(cursor.read_i32::<LittleEndian>()?),
            DType::Int64 => cursor.read_i64::<LittleEndian>()? as f64,
            DType::Float32 => f64::from(cursor.read_f32::<LittleEndian>()?),
            DType::Float64 => cursor.read_f64::<LittleEndian>()?,
        };
        values.push(value);
    }
    if dtype == DType::Int64 && values.iter().any(|v| v.abs() > MAX_EXACT_INTEGER) {
        warn!(
            "Chunk {} holds 64-bit integers beyond {MAX_EXACT_INTEGER}; they were rounded",
            path.display()
        );
    }
    Ok(values)
}

/// Whether `dir` holds an array
pub fn is_array(dir: &Path) -> bool {
    dir.join(ARRAY_META_KEY).is_file()
}

/// Read the header of the array stored in `dir`
pub fn read_meta(dir: &Path) -> Result<ArrayMeta, StoreError> {
    let path = dir.join(ARRAY_META_KEY);
    if !path.is_file() {
        return Err(StoreError::NotFound(dir.display().to_string()));
    }
    let text = fs::read_to_string(path)?;
    let meta: ArrayMeta = serde_json::from_str(&text)?;
    if meta.chunks.len() != meta.shape.len() {
        return Err(StoreError::InvalidArrayMeta {
            path: dir.display().to_string(),
            reason: format!(
                "{} chunk sizes for {} dimensions",
                meta.chunks.len(),
                meta.shape.len()
            ),
        });
    }
    if meta.chunks.contains(&0) {
        return Err(StoreError::InvalidArrayMeta {
            path: dir.display().to_string(),
            reason: format!("zero chunk size in {:?}", meta.chunks),
        });
    }
    Ok(meta)
}

/// Write `data` to `dir`, replacing any array already stored there
pub fn write_array(
    dir: &Path,
    data: &ArrayData,
    compression_level: u32,
    chunked: bool,
) -> Result<ArrayMeta, StoreError> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;

    let shape = data.shape().to_vec();
    let chunks = if chunked {
        guess_chunks(&shape, data.dtype().item_size())
    } else {
        shape.iter().map(|&s| s.max(1)).collect()
    };
    debug!("Writing array {} with shape {:?} in chunks {:?}", dir.display(), shape, chunks);

    let meta = ArrayMeta::new(data.dtype(), shape.clone(), chunks.clone(), compression_level);
    fs::write(dir.join(ARRAY_META_KEY), serde_json::to_string_pretty(&meta)?)?;

    let grid = meta.grid();
    if grid.iter().any(|&n| n == 0) {
        return Ok(meta);
    }

    let data_strides = strides(&shape);
    let chunk_len: usize = chunks.iter().product();
    let mut chunk_index = vec![0usize; shape.len()];
    loop {
        let mut buffer = vec![meta.fill(); chunk_len];

        let origin: Vec<usize> = chunk_index.iter().zip(&chunks).map(|(i, c)| i * c).collect();
        let extent: Vec<usize> = origin
            .iter()
            .zip(&chunks)
            .zip(&shape)
            .map(|((&o, &c), &s)| c.min(s - o))
            .collect();
        let chunk_strides = strides(&chunks);

        let mut local = vec![0usize; shape.len()];
        loop {
            let src: usize = local
                .iter()
                .zip(&origin)
                .zip(&data_strides)
                .map(|((l, o), s)| (l + o) * s)
                .sum();
            let dst: usize = local.iter().zip(&chunk_strides).map(|(l, s)| l * s).sum();
            buffer[dst] = data.values()[src];
            if !advance(&mut local, &extent) {
                break;
            }
        }

        let raw = encode(&buffer, data.dtype())?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(compression_level));
        encoder.write_all(&raw)?;
        fs::write(dir.join(chunk_key(&chunk_index)), encoder.finish()?)?;

        if !advance(&mut chunk_index, &grid) {
            break;
        }
    }
    Ok(meta)
}

fn read_chunk(
    dir: &Path,
    meta: &ArrayMeta,
    dtype: DType,
    index: &[usize],
) -> Result<Option<Vec<f64>>, StoreError> {
    let path = dir.join(chunk_key(index));
    if !path.is_file() {
        return Ok(None);
    }
    let compressed = fs::read(&path)?;
    let raw = match &meta.compressor {
        Some(_) => {
            let mut raw = Vec::new();
            ZlibDecoder::new(&compressed[..]).read_to_end(&mut raw)?;
            raw
        }
        None => compressed,
    };
    let len: usize = meta.chunks.iter().product();
    decode(&raw, dtype, len, &path).map(Some)
}

/// Read the whole array stored in `dir`
pub fn read_array(dir: &Path) -> Result<ArrayData, StoreError> {
    let meta = read_meta(dir)?;
    let region: Vec<Range<usize>> = meta.shape.iter().map(|&s| 0..s).collect();
    read_region_with(dir, &meta, &region)
}

/// Read the hyper-rectangle `region` of the array stored in `dir`.
///
/// Only chunks intersecting the region are read.
pub fn read_region(dir: &Path, region: &[Range<usize>]) -> Result<ArrayData, StoreError> {
    let meta = read_meta(dir)?;
    read_region_with(dir, &meta, region)
}

fn read_region_with(
    dir: &Path,
    meta: &ArrayMeta,
    region: &[Range<usize>],
) -> Result<ArrayData, StoreError> {
    let dtype = meta.dtype()?;
    if region.len() != meta.shape.len()
        || region
            .iter()
            .zip(&meta.shape)
            .any(|(r, &s)| r.start > r.end || r.end > s)
    {
        return Err(StoreError::InvalidPath(format!(
            "region {:?} outside array of shape {:?}",
            region, meta.shape
        )));
    }

    let out_shape: Vec<usize> = region.iter().map(|r| r.end - r.start).collect();
    let out_len: usize = out_shape.iter().product();
    let mut values = vec![meta.fill(); out_len];

    if meta.shape.is_empty() {
        if let Some(chunk) = read_chunk(dir, meta, dtype, &[])? {
            values[0] = chunk[0];
        }
        return Ok(ArrayData::new(dtype, out_shape, values)?);
    }
    if out_len == 0 {
        return Ok(ArrayData::new(dtype, out_shape, values)?);
    }

    let chunks = &meta.chunks;
    let first: Vec<usize> = region.iter().zip(chunks).map(|(r, c)| r.start / c).collect();
    let last: Vec<usize> = region.iter().zip(chunks).map(|(r, c)| (r.end - 1) / c).collect();
    let span: Vec<usize> = first.iter().zip(&last).map(|(f, l)| l - f + 1).collect();
    let out_strides = strides(&out_shape);
    let chunk_strides = strides(chunks);

    let mut offset = vec![0usize; span.len()];
    loop {
        let index: Vec<usize> = first.iter().zip(&offset).map(|(f, o)| f + o).collect();
        if let Some(chunk) = read_chunk(dir, meta, dtype, &index)? {
            let origin: Vec<usize> = index.iter().zip(chunks).map(|(i, c)| i * c).collect();
            let lo: Vec<usize> = origin
                .iter()
                .zip(region)
                .map(|(&o, r)| o.max(r.start))
                .collect();
            let hi: Vec<usize> = origin
                .iter()
                .zip(chunks)
                .zip(region)
                .map(|((&o, &c), r)| (o + c).min(r.end))
                .collect();
            let extent: Vec<usize> = lo.iter().zip(&hi).map(|(l, h)| h - l).collect();

            let mut local = vec![0usize; extent.len()];
            loop {
                let mut src = 0;
                let mut dst = 0;
                for axis in 0..local.len() {
                    let element = lo[axis] + local[axis];
                    src += (element - origin[axis]) * chunk_strides[axis];
                    dst += (element - region[axis].start) * out_strides[axis];
                }
                values[dst] = chunk[src];
                if !advance(&mut local, &extent) {
                    break;
                }
            }
        }
        if !advance(&mut offset, &span) {
            break;
        }
    }
    Ok(ArrayData::new(dtype, out_shape, values)?)
}
