//! Signed distance fields sampled on a regular grid.
//!
//! Each grid cell references eight nodes (its corners, x varying fastest)
//! and the field is trilinear inside a cell. Cells are looked up through a
//! cell map so several grid cells may share node storage.
//!
//! Binary layout (little endian): a fixed header followed by the node
//! array (`u32` count, `f64` values), the cell array (`u32` count,
//! `[u32; 8]` node indices) and the cell map (`u32` count, `u32` cell
//! indices, one per grid cell).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use tracing::{info, warn};

use crate::collision::Aabb;
use crate::error::SdfError;

const MAGIC: [u8; 4] = *b"RSDF";
const VERSION: u32 = 1;
/// Upper bound on any array length accepted from a file.
const MAX_ELEMENTS: usize = 1 << 28;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SdfHeader {
    magic: [u8; 4],
    version: u32,
    domain_min: [f32; 3],
    domain_max: [f32; 3],
    resolution: [u32; 3],
    cell_size: [f32; 3],
}

impl SdfHeader {
    /// Swap between file and host byte order.
    fn le(self) -> Self {
        let f = |v: [f32; 3]| v.map(LeWord::le);
        Self {
            magic: self.magic,
            version: u32::from_le(self.version),
            domain_min: f(self.domain_min),
            domain_max: f(self.domain_max),
            resolution: self.resolution.map(u32::from_le),
            cell_size: f(self.cell_size),
        }
    }
}

/// Scalars stored little endian on disk. The swap is its own inverse.
trait LeWord: Pod {
    fn le(self) -> Self;
}

impl LeWord for u32 {
    fn le(self) -> Self {
        u32::from_le(self)
    }
}

impl LeWord for f32 {
    fn le(self) -> Self {
        f32::from_bits(u32::from_le(self.to_bits()))
    }
}

impl LeWord for f64 {
    fn le(self) -> Self {
        f64::from_bits(u64::from_le(self.to_bits()))
    }
}

impl LeWord for [u32; 8] {
    fn le(self) -> Self {
        self.map(u32::from_le)
    }
}

/// A discretized signed distance function.
#[derive(Debug, Clone)]
pub struct Sdf {
    domain: Aabb,
    resolution: [u32; 3],
    cell_size: Vec3,
    inv_cell_size: Vec3,
    nodes: Vec<f64>,
    cells: Vec<[u32; 8]>,
    cell_map: Vec<u32>,
}

impl Sdf {
    /// Sample `f` at the grid nodes of `domain`.
    ///
    /// # Panics
    ///
    /// Panics if a resolution component is zero or the domain is empty.
    pub fn from_fn<F: Fn(Vec3) -> f64>(domain: Aabb, resolution: [u32; 3], f: F) -> Self {
        assert!(resolution.iter().all(|&r| r > 0), "SDF resolution must be positive");
        let size = domain.max - domain.min;
        assert!(size.min_element() > 0.0, "SDF domain must not be empty");

        let [rx, ry, rz] = resolution;
        let cell_size = size / Vec3::new(rx as f32, ry as f32, rz as f32);

        let (nx, ny) = (rx + 1, ry + 1);
        let node_id = |i: u32, j: u32, k: u32| i + nx * (j + ny * k);

        let mut nodes = Vec::with_capacity((nx * ny * (rz + 1)) as usize);
        for k in 0..=rz {
            for j in 0..=ry {
                for i in 0..=rx {
                    let p = domain.min + Vec3::new(i as f32, j as f32, k as f32) * cell_size;
                    nodes.push(f(p));
                }
            }
        }

        let mut cells = Vec::with_capacity((rx * ry * rz) as usize);
        for k in 0..rz {
            for j in 0..ry {
                for i in 0..rx {
                    cells.push([
                        node_id(i, j, k),
                        node_id(i + 1, j, k),
                        node_id(i, j + 1, k),
                        node_id(i + 1, j + 1, k),
                        node_id(i, j, k + 1),
                        node_id(i + 1, j, k + 1),
                        node_id(i, j + 1, k + 1),
                        node_id(i + 1, j + 1, k + 1),
                    ]);
                }
            }
        }
        let cell_map = (0..cells.len() as u32).collect();

        Self {
            domain,
            resolution,
            cell_size,
            inv_cell_size: cell_size.recip(),
            nodes,
            cells,
            cell_map,
        }
    }

    pub fn domain(&self) -> &Aabb {
        &self.domain
    }

    pub fn resolution(&self) -> [u32; 3] {
        self.resolution
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Distance and unit gradient at `point`, or `None` outside the domain.
    pub fn evaluate(&self, point: Vec3) -> Option<(f64, Vec3)> {
        if !self.domain.contains_point(point) {
            return None;
        }

        let [rx, ry, rz] = self.resolution;
        let local = (point - self.domain.min) * self.inv_cell_size;
        let i = (local.x as u32).min(rx - 1);
        let j = (local.y as u32).min(ry - 1);
        let k = (local.z as u32).min(rz - 1);

        let l = (i + rx * (j + ry * k)) as usize;
        let cell = &self.cells[self.cell_map[l] as usize];
        let n = cell.map(|id| self.nodes[id as usize]);

        let x = (local.x - i as f32) as f64;
        let y = (local.y - j as f32) as f64;
        let z = (local.z - k as f32) as f64;

        let c00 = n[0] * (1.0 - x) + n[1] * x;
        let c10 = n[2] * (1.0 - x) + n[3] * x;
        let c01 = n[4] * (1.0 - x) + n[5] * x;
        let c11 = n[6] * (1.0 - x) + n[7] * x;
        let c0 = c00 * (1.0 - y) + c10 * y;
        let c1 = c01 * (1.0 - y) + c11 * y;
        let distance = c0 * (1.0 - z) + c1 * z;

        let dx = (n[1] - n[0]) * (1.0 - y) * (1.0 - z)
            + (n[3] - n[2]) * y * (1.0 - z)
            + (n[5] - n[4]) * (1.0 - y) * z
            + (n[7] - n[6]) * y * z;
        let dy = (c10 - c00) * (1.0 - z) + (c11 - c01) * z;
        let dz = c1 - c0;
        let gradient = Vec3::new(
            dx as f32 * self.inv_cell_size.x,
            dy as f32 * self.inv_cell_size.y,
            dz as f32 * self.inv_cell_size.z,
        );

        Some((distance, gradient.normalize_or_zero()))
    }

    /// Read a field from its binary form.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, SdfError> {
        let mut bytes = [0u8; std::mem::size_of::<SdfHeader>()];
        reader.read_exact(&mut bytes)?;
        let header = bytemuck::pod_read_unaligned::<SdfHeader>(&bytes).le();

        if header.magic != MAGIC {
            return Err(SdfError::BadMagic(header.magic));
        }
        if header.version != VERSION {
            return Err(SdfError::UnsupportedVersion(header.version));
        }

        let domain = Aabb::new(header.domain_min.into(), header.domain_max.into());
        let size = domain.max - domain.min;
        if !domain.min.is_finite() || !domain.max.is_finite() || size.min_element() <= 0.0 {
            return Err(SdfError::InvalidDomain);
        }

        let resolution = header.resolution;
        if resolution.contains(&0) {
            return Err(SdfError::InvalidGrid(format!("resolution {resolution:?}")));
        }
        let cell_size = Vec3::from(header.cell_size);
        let expected = size / Vec3::new(resolution[0] as f32, resolution[1] as f32, resolution[2] as f32);
        if ((cell_size - expected).abs() / expected).max_element() > 1.0e-4 {
            return Err(SdfError::InvalidGrid(format!(
                "cell size {cell_size} does not match domain / resolution {expected}"
            )));
        }

        let nodes: Vec<f64> = read_array(reader)?;
        let cells: Vec<[u32; 8]> = read_array(reader)?;
        let cell_map: Vec<u32> = read_array(reader)?;

        if let Some(&bad) = cells.iter().flatten().find(|&&id| id as usize >= nodes.len()) {
            return Err(SdfError::Inconsistent {
                what: "cell node index",
                expected: nodes.len(),
                found: bad as usize,
            });
        }

        let grid_cells = resolution.iter().map(|&r| r as usize).product::<usize>();
        if cell_map.len() != grid_cells {
            return Err(SdfError::Inconsistent {
                what: "cell map length",
                expected: grid_cells,
                found: cell_map.len(),
            });
        }
        if let Some(&bad) = cell_map.iter().find(|&&c| c as usize >= cells.len()) {
            return Err(SdfError::Inconsistent {
                what: "cell map entry",
                expected: cells.len(),
                found: bad as usize,
            });
        }

        Ok(Self {
            domain,
            resolution,
            cell_size,
            inv_cell_size: cell_size.recip(),
            nodes,
            cells,
            cell_map,
        })
    }

    /// Write the binary form read by [`Sdf::read`].
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), SdfError> {
        let header = SdfHeader {
            magic: MAGIC,
            version: VERSION,
            domain_min: self.domain.min.to_array(),
            domain_max: self.domain.max.to_array(),
            resolution: self.resolution,
            cell_size: self.cell_size.to_array(),
        }
        .le();
        writer.write_all(bytemuck::bytes_of(&header))?;
        write_array(writer, &self.nodes)?;
        write_array(writer, &self.cells)?;
        write_array(writer, &self.cell_map)?;
        Ok(())
    }

    /// Load a field from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("Loading SDF from {:?}", path);

        let file = File::open(path).with_context(|| format!("Failed to open SDF {:?}", path))?;
        let mut reader = BufReader::new(file);
        match Self::read(&mut reader) {
            Ok(sdf) => {
                info!(
                    nodes = sdf.node_count(),
                    cells = sdf.cell_count(),
                    "Loaded SDF {:?}",
                    path
                );
                Ok(sdf)
            }
            Err(err) => {
                warn!("Rejected SDF {:?}: {}", path, err);
                Err(err).with_context(|| format!("Failed to load SDF from {:?}", path))
            }
        }
    }

    /// Save the field to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("Failed to create SDF {:?}", path))?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)
            .with_context(|| format!("Failed to write SDF to {:?}", path))?;
        writer.flush()?;
        Ok(())
    }
}

fn read_array<T: LeWord, R: Read>(reader: &mut R) -> Result<Vec<T>, SdfError> {
    let mut count = [0u8; 4];
    reader.read_exact(&mut count)?;
    let count = u32::from_le_bytes(count) as usize;
    if count > MAX_ELEMENTS {
        return Err(SdfError::Inconsistent {
            what: "array length",
            expected: MAX_ELEMENTS,
            found: count,
        });
    }

    // Grow with the data actually present instead of trusting the count.
    let len = count * std::mem::size_of::<T>();
    let mut bytes = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("array of {count} elements truncated after {} bytes", bytes.len()),
        )
        .into());
    }

    let mut values: Vec<T> = bytemuck::pod_collect_to_vec(&bytes);
    for value in &mut values {
        *value = LeWord::le(*value);
    }
    Ok(values)
}

fn write_array<T: LeWord, W: Write>(writer: &mut W, values: &[T]) -> Result<(), SdfError> {
    writer.write_all(&(values.len() as u32).to_le_bytes())?;
    let swapped: Vec<T> = values.iter().map(|&v| LeWord::le(v)).collect();
    writer.write_all(bytemuck::cast_slice(&swapped))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sphere_sdf() -> Sdf {
        let domain = Aabb::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        Sdf::from_fn(domain, [16, 16, 16], |p| (p.length() - 1.0) as f64)
    }

    #[test]
    fn test_evaluate_sphere() {
        let sdf = sphere_sdf();
        let (d, n) = sdf.evaluate(Vec3::new(1.5, 0.0, 0.0)).unwrap();
        assert!((d - 0.5).abs() < 0.05, "distance {d}");
        assert!(n.x > 0.98, "gradient {n}");

        let (d, _) = sdf.evaluate(Vec3::new(0.0, 0.25, 0.0)).unwrap();
        assert!(d < 0.0);
    }

    #[test]
    fn test_evaluate_exact_on_nodes() {
        let sdf = sphere_sdf();
        // (1.0, 0, 0) is a grid node.
        let (d, _) = sdf.evaluate(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_outside_domain() {
        let sdf = sphere_sdf();
        assert!(sdf.evaluate(Vec3::new(2.5, 0.0, 0.0)).is_none());
        assert!(sdf.evaluate(Vec3::splat(2.0)).is_some());
    }

    #[test]
    fn test_binary_round_trip() {
        let sdf = sphere_sdf();
        let mut buffer = Vec::new();
        sdf.write(&mut buffer).unwrap();

        let read = Sdf::read(&mut Cursor::new(&buffer)).unwrap();
        assert_eq!(read.resolution(), sdf.resolution());
        assert_eq!(read.node_count(), sdf.node_count());
        let p = Vec3::new(0.3, -0.7, 1.1);
        assert_eq!(read.evaluate(p), sdf.evaluate(p));
    }

    #[test]
    fn test_bad_magic() {
        let mut buffer = Vec::new();
        sphere_sdf().write(&mut buffer).unwrap();
        buffer[0] = b'X';
        let err = Sdf::read(&mut Cursor::new(&buffer)).unwrap_err();
        assert!(matches!(err, SdfError::BadMagic(_)));
    }

    #[test]
    fn test_truncated_file() {
        let mut buffer = Vec::new();
        sphere_sdf().write(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 3);
        let err = Sdf::read(&mut Cursor::new(&buffer)).unwrap_err();
        assert!(matches!(err, SdfError::Io(_)));
    }

    #[test]
    fn test_truncated_huge_count_is_rejected() {
        let mut buffer = Vec::new();
        sphere_sdf().write(&mut buffer).unwrap();
        let at = std::mem::size_of::<SdfHeader>();
        buffer[at..at + 4].copy_from_slice(&(MAX_ELEMENTS as u32).to_le_bytes());
        buffer.truncate(at + 64);
        let err = Sdf::read(&mut Cursor::new(&buffer)).unwrap_err();
        assert!(matches!(err, SdfError::Io(_)));
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buffer = Vec::new();
        let sdf = sphere_sdf();
        sdf.write(&mut buffer).unwrap();
        assert_eq!(&buffer[0..4], b"RSDF");
        assert_eq!(buffer[4..8], VERSION.to_le_bytes());
        // resolution follows magic, version, domain min and max
        assert_eq!(buffer[32..36], 16u32.to_le_bytes());
        let at = std::mem::size_of::<SdfHeader>();
        assert_eq!(buffer[at..at + 4], (sdf.node_count() as u32).to_le_bytes());
        assert_eq!(buffer[at + 4..at + 12], sdf.nodes[0].to_le_bytes());
    }

    #[test]
    fn test_inconsistent_cell_map() {
        let mut sdf = sphere_sdf();
        sdf.cell_map.pop();
        let mut buffer = Vec::new();
        sdf.write(&mut buffer).unwrap();
        let err = Sdf::read(&mut Cursor::new(&buffer)).unwrap_err();
        assert!(matches!(
            err,
            SdfError::Inconsistent {
                what: "cell map length",
                ..
            }
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("rein-collision-{}.sdf", std::process::id()));
        let sdf = sphere_sdf();
        sdf.save(&path).unwrap();
        let loaded = Sdf::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.cell_count(), sdf.cell_count());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Sdf::load("/definitely/not/here.sdf").unwrap_err();
        assert!(err.to_string().contains("Failed to open SDF"));
    }
}
