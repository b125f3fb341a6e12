//! Binary STL serialization
//!
//! # File Format
//!
//! ```text
//! [Header: 80 bytes]      free-form, zero padded
//! [Count: 4 bytes]        triangle count, u32 little-endian
//! [Triangles: 50 bytes each]
//!   Normal: 3 × f32       always zero, slicers recompute it
//!   Vertices: 9 × f32     three corners in emission order
//!   Attribute: u16        always zero
//! ```

use crate::mesh::{LayerAssignment, Mesh};
use crate::types::{BookmarkError, Result};
use std::collections::BTreeMap;
use tracing::info;

pub const HEADER_SIZE: usize = 80;
pub const TRIANGLE_RECORD_SIZE: usize = 50;

const HEADER_TAG: &[u8] = b"bookmark binary STL";

/// Serialize a mesh to binary STL
///
/// # Example
///
/// ```
/// use bookmark::mesh::{DedupMeshBuilder, MeshBuilder};
/// use bookmark::io::stl::serialize_stl;
///
/// let mut builder = DedupMeshBuilder::new();
/// builder.add_box([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
/// let bytes = serialize_stl(&builder.finish());
/// assert_eq!(bytes.len(), 84 + 12 * 50);
/// ```
pub fn serialize_stl(mesh: &Mesh) -> Vec<u8> {
    let count = mesh.triangle_count();
    let mut buffer = Vec::with_capacity(HEADER_SIZE + 4 + count * TRIANGLE_RECORD_SIZE);

    buffer.extend_from_slice(HEADER_TAG);
    buffer.resize(HEADER_SIZE, 0);
    buffer.extend_from_slice(&(count as u32).to_le_bytes());

    for triangle in mesh.triangle_vertices() {
        for _ in 0..3 {
            buffer.extend_from_slice(&0f32.to_le_bytes());
        }
        for vertex in triangle {
            for coord in vertex {
                buffer.extend_from_slice(&coord.to_le_bytes());
            }
        }
        buffer.extend_from_slice(&0u16.to_le_bytes());
    }

    buffer
}

/// Parse binary STL back into triangle corner positions
///
/// Normals and attributes are ignored.
pub fn parse_stl(data: &[u8]) -> Result<Vec<[[f32; 3]; 3]>> {
    if data.len() < HEADER_SIZE + 4 {
        return Err(BookmarkError::TruncatedStl {
            expected_bytes: HEADER_SIZE + 4,
            available_bytes: data.len(),
        });
    }

    let count = read_u32(data, HEADER_SIZE) as usize;
    let expected = HEADER_SIZE + 4 + count * TRIANGLE_RECORD_SIZE;
    if data.len() < expected {
        return Err(BookmarkError::TruncatedStl {
            expected_bytes: expected,
            available_bytes: data.len(),
        });
    }

    let records = &data[HEADER_SIZE + 4..expected];
    let triangles = records
        .chunks_exact(TRIANGLE_RECORD_SIZE)
        .map(|record| {
            // Skip the 12-byte normal
            std::array::from_fn(|v| {
                std::array::from_fn(|c| read_f32(record, 12 + v * 12 + c * 4))
            })
        })
        .collect();

    Ok(triangles)
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(data, offset))
}

/// One STL file per populated layer, keyed by `<layer name>.stl`
///
/// Layers without triangles are skipped.
pub fn export_stl_set(layers: &[LayerAssignment]) -> BTreeMap<String, Vec<u8>> {
    let files: BTreeMap<String, Vec<u8>> = layers
        .iter()
        .filter(|layer| !layer.mesh.is_empty())
        .map(|layer| (format!("{}.stl", layer.name), serialize_stl(&layer.mesh)))
        .collect();

    info!(
        "Exported {} STL files ({} bytes total)",
        files.len(),
        files.values().map(Vec::len).sum::<usize>()
    );

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{DedupMeshBuilder, MeshBuilder};

    fn cube_mesh() -> Mesh {
        let mut builder = DedupMeshBuilder::new();
        builder.add_box([0.5, 1.25, 0.0], [2.0, 3.0, 0.2]);
        builder.finish()
    }

    #[test]
    fn test_layout() {
        let mesh = cube_mesh();
        let bytes = serialize_stl(&mesh);

        assert_eq!(bytes.len(), HEADER_SIZE + 4 + 12 * TRIANGLE_RECORD_SIZE);
        assert!(bytes.starts_with(HEADER_TAG));
        assert!(bytes[HEADER_TAG.len()..HEADER_SIZE].iter().all(|&b| b == 0));
        assert_eq!(read_u32(&bytes, HEADER_SIZE), 12);

        // First record: zero normal, zero attribute
        let record = &bytes[HEADER_SIZE + 4..HEADER_SIZE + 4 + TRIANGLE_RECORD_SIZE];
        assert!(record[..12].iter().all(|&b| b == 0));
        assert_eq!(&record[48..50], &[0, 0]);
    }

    #[test]
    fn test_parse_recovers_vertices() {
        let mesh = cube_mesh();
        let parsed = parse_stl(&serialize_stl(&mesh)).unwrap();
        let original: Vec<[[f32; 3]; 3]> = mesh.triangle_vertices().collect();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_empty_mesh() {
        let bytes = serialize_stl(&Mesh::default());
        assert_eq!(bytes.len(), HEADER_SIZE + 4);
        assert!(parse_stl(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = serialize_stl(&cube_mesh());
        match parse_stl(&bytes[..bytes.len() - 1]) {
            Err(BookmarkError::TruncatedStl {
                expected_bytes,
                available_bytes,
            }) => {
                assert_eq!(expected_bytes, bytes.len());
                assert_eq!(available_bytes, bytes.len() - 1);
            }
            other => panic!("Expected TruncatedStl error, got {:?}", other),
        }

        assert!(matches!(
            parse_stl(&bytes[..40]),
            Err(BookmarkError::TruncatedStl {
                expected_bytes: 84,
                ..
            })
        ));
    }

    #[test]
    fn test_export_names_and_skips_empty() {
        let layers = vec![
            LayerAssignment {
                slot: 0,
                name: "Base".to_string(),
                mesh: cube_mesh(),
            },
            LayerAssignment {
                slot: 2,
                name: "Color_3".to_string(),
                mesh: Mesh::default(),
            },
            LayerAssignment {
                slot: 3,
                name: "Color_4".to_string(),
                mesh: cube_mesh(),
            },
        ];
        let files = export_stl_set(&layers);
        let names: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Base.stl", "Color_4.stl"]);
    }
}
