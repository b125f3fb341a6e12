//! Layer mesh generation: row-run box extrusion with vertex deduplication
//!
//! Each palette slot becomes one solid made of axis-aligned boxes. Every
//! maximal horizontal run of matching pixels in a row is one box; runs are
//! never merged across rows. All layers sit directly on the base plate, so
//! every layer object shares the same Z origin. Slot 0 additionally carries a
//! full-footprint base plate.
//!
//! Coordinates are millimeters with Z as the build axis. Image row 0 is the
//! top of the picture and maps to the largest Y.

use crate::settings::BookmarkSettings;
use crate::types::{IndexMap, PALETTE_SIZE};
use std::collections::HashMap;
use tracing::debug;

/// Box faces, Z up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Bottom, // -Z
    Top,    // +Z
    Front,  // -Y
    Back,   // +Y
    Left,   // -X
    Right,  // +X
}

impl Face {
    const ALL: [Face; 6] = [
        Face::Bottom,
        Face::Top,
        Face::Front,
        Face::Back,
        Face::Left,
        Face::Right,
    ];

    /// Corner indices, counter-clockwise seen from outside
    ///
    /// Corner `i` takes max X if bit 0 is set, max Y for bit 1, max Z for bit 2.
    fn corners(self) -> [usize; 4] {
        match self {
            Face::Bottom => [0, 2, 3, 1],
            Face::Top => [4, 5, 7, 6],
            Face::Front => [0, 1, 5, 4],
            Face::Back => [2, 6, 7, 3],
            Face::Left => [0, 4, 6, 2],
            Face::Right => [1, 3, 7, 5],
        }
    }
}

fn box_corners(min: [f32; 3], max: [f32; 3]) -> [[f32; 3]; 8] {
    std::array::from_fn(|i| {
        [
            if i & 1 == 0 { min[0] } else { max[0] },
            if i & 2 == 0 { min[1] } else { max[1] },
            if i & 4 == 0 { min[2] } else { max[2] },
        ]
    })
}

/// Builder interface for constructing box meshes
pub trait MeshBuilder {
    /// Add a quad as two triangles `(0, 1, 2)` and `(0, 2, 3)`
    fn add_face(&mut self, vertices: [[f32; 3]; 4]);

    /// Add a closed axis-aligned box: 6 faces, 12 triangles
    fn add_box(&mut self, min: [f32; 3], max: [f32; 3]) {
        emit_box(self, min, max);
    }
}

fn emit_box<B: MeshBuilder + ?Sized>(builder: &mut B, min: [f32; 3], max: [f32; 3]) {
    let corners = box_corners(min, max);
    for face in Face::ALL {
        builder.add_face(face.corners().map(|i| corners[i]));
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
    /// Number of boxes the mesh was built from
    pub box_count: usize,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Triangle corner positions in emission order
    pub fn triangle_vertices(&self) -> impl Iterator<Item = [[f32; 3]; 3]> + '_ {
        self.triangles
            .iter()
            .map(|t| t.map(|i| self.vertices[i as usize]))
    }
}

/// Mesh builder that merges vertices equal to three decimal places
#[derive(Debug, Default)]
pub struct DedupMeshBuilder {
    mesh: Mesh,
    lookup: HashMap<[i64; 3], u32>,
}

impl DedupMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn vertex_index(&mut self, v: [f32; 3]) -> u32 {
        let key = v.map(|c| (c as f64 * 1000.0).round() as i64);
        let vertices = &mut self.mesh.vertices;
        *self.lookup.entry(key).or_insert_with(|| {
            vertices.push(v);
            (vertices.len() - 1) as u32
        })
    }

    pub fn finish(self) -> Mesh {
        self.mesh
    }
}

impl MeshBuilder for DedupMeshBuilder {
    fn add_face(&mut self, vertices: [[f32; 3]; 4]) {
        let [a, b, c, d] = vertices.map(|v| self.vertex_index(v));
        self.mesh.triangles.push([a, b, c]);
        self.mesh.triangles.push([a, c, d]);
    }

    fn add_box(&mut self, min: [f32; 3], max: [f32; 3]) {
        emit_box(self, min, max);
        self.mesh.box_count += 1;
    }
}

/// Physical extents used to extrude one layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub base_thickness_mm: f32,
    pub layer_height_mm: f32,
}

impl LayerGeometry {
    /// Geometry for `slot`, honoring flat mode
    pub fn for_slot(settings: &BookmarkSettings, slot: usize) -> Self {
        Self {
            width_mm: settings.width_mm,
            height_mm: settings.height_mm,
            base_thickness_mm: settings.base_thickness_mm,
            layer_height_mm: settings.effective_layer_heights()[slot],
        }
    }
}

/// Maximal runs of `slot` in a row as inclusive `(start, end)` columns
pub fn row_runs(row: &[u8], slot: u8) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (x, &value) in row.iter().enumerate() {
        match (value == slot, start) {
            (true, None) => start = Some(x),
            (false, Some(s)) => {
                runs.push((s, x - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, row.len() - 1));
    }
    runs
}

/// Build the solid for one palette slot
pub fn build_layer(map: &IndexMap, slot: usize, geometry: &LayerGeometry) -> Mesh {
    let mut builder = DedupMeshBuilder::new();
    generate_layer(map, slot, geometry, &mut builder);
    builder.finish()
}

/// Emit the boxes for one palette slot into any [`MeshBuilder`]
pub fn generate_layer<B: MeshBuilder>(
    map: &IndexMap,
    slot: usize,
    geometry: &LayerGeometry,
    builder: &mut B,
) {
    let base = geometry.base_thickness_mm;

    if slot == 0 {
        builder.add_box(
            [0.0, 0.0, 0.0],
            [geometry.width_mm, geometry.height_mm, base],
        );
    }

    let scale_x = geometry.width_mm / map.width() as f32;
    let scale_y = geometry.height_mm / map.height() as f32;
    let top = base + geometry.layer_height_mm;

    for row in 0..map.height() {
        let y0 = (map.height() - 1 - row) as f32 * scale_y;
        let y1 = y0 + scale_y;
        for (start, end) in row_runs(map.row(row), slot as u8) {
            builder.add_box(
                [start as f32 * scale_x, y0, base],
                [(end + 1) as f32 * scale_x, y1, top],
            );
        }
    }
}

/// A mesh bound to its palette slot and output name
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAssignment {
    pub slot: usize,
    pub name: String,
    pub mesh: Mesh,
}

/// Build every populated layer; slots without triangles are omitted
pub fn build_layers(map: &IndexMap, settings: &BookmarkSettings) -> Vec<LayerAssignment> {
    (0..PALETTE_SIZE)
        .filter_map(|slot| {
            let mesh = build_layer(map, slot, &LayerGeometry::for_slot(settings, slot));
            debug!(
                "Layer {} ({}): {} boxes, {} vertices, {} triangles",
                slot,
                settings.layer_name(slot),
                mesh.box_count,
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            (!mesh.is_empty()).then(|| LayerAssignment {
                slot,
                name: settings.layer_name(slot),
                mesh,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> LayerGeometry {
        LayerGeometry {
            width_mm: 10.0,
            height_mm: 4.0,
            base_thickness_mm: 1.0,
            layer_height_mm: 0.5,
        }
    }

    /// Signed volume through the divergence theorem; positive for outward winding
    fn signed_volume(mesh: &Mesh) -> f64 {
        mesh.triangle_vertices()
            .map(|[a, b, c]| {
                let [a, b, c] = [a, b, c].map(|v| v.map(|x| x as f64));
                (a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
                    + a[2] * (b[0] * c[1] - b[1] * c[0]))
                    / 6.0
            })
            .sum()
    }

    #[test]
    fn test_row_runs() {
        assert_eq!(row_runs(&[1, 1, 0, 1, 2, 1], 1), vec![(0, 1), (3, 3), (5, 5)]);
        assert!(row_runs(&[0, 0, 0], 1).is_empty());
        assert_eq!(row_runs(&[2, 2, 2, 2], 2), vec![(0, 3)]);
    }

    #[test]
    fn test_single_box_shell() {
        let mut builder = DedupMeshBuilder::new();
        builder.add_box([0.0, 0.0, 0.0], [2.0, 3.0, 4.0]);
        let mesh = builder.finish();

        assert_eq!(mesh.box_count, 1);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!((signed_volume(&mesh) - 24.0).abs() < 1e-6);
    }

    #[test]
    fn test_touching_boxes_share_vertices() {
        let mut builder = DedupMeshBuilder::new();
        builder.add_box([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        builder.add_box([1.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        let mesh = builder.finish();

        assert_eq!(mesh.triangle_count(), 24);
        assert_eq!(mesh.vertex_count(), 12);
    }

    #[test]
    fn test_dedup_within_three_decimals() {
        let mut builder = DedupMeshBuilder::new();
        builder.add_box([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        builder.add_box([1.0001, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert_eq!(builder.finish().vertex_count(), 12);
    }

    #[test]
    fn test_full_row_is_one_box() {
        for width in [1usize, 7, 64] {
            let map = IndexMap::new(width, 1, vec![2; width]).unwrap();
            let mesh = build_layer(&map, 2, &geometry());
            assert_eq!(mesh.box_count, 1, "width {}", width);
            assert_eq!(mesh.triangle_count(), 12);
        }
    }

    #[test]
    fn test_vertical_stripe_is_one_box_per_row() {
        let map = IndexMap::from_rows(&[&[0, 1, 0], &[0, 1, 0], &[0, 1, 0], &[0, 1, 0]]).unwrap();
        let mesh = build_layer(&map, 1, &geometry());
        assert_eq!(mesh.box_count, 4);
        assert_eq!(mesh.triangle_count(), 48);
        assert!(mesh.vertex_count() <= 8 * mesh.box_count);
    }

    #[test]
    fn test_slot_zero_has_base_plate() {
        let map = IndexMap::from_rows(&[&[1, 1], &[1, 1]]).unwrap();
        let mesh = build_layer(&map, 0, &geometry());
        assert_eq!(mesh.box_count, 1);

        let max = mesh
            .vertices
            .iter()
            .fold([f32::MIN; 3], |m, v| [m[0].max(v[0]), m[1].max(v[1]), m[2].max(v[2])]);
        assert_eq!(max, [10.0, 4.0, 1.0]);
    }

    #[test]
    fn test_run_placement_and_y_flip() {
        // Two rows, slot 1 only in the top row's second half
        let map = IndexMap::from_rows(&[&[0, 0, 1, 1], &[0, 0, 0, 0]]).unwrap();
        let mesh = build_layer(&map, 1, &geometry());
        assert_eq!(mesh.box_count, 1);

        let min = mesh
            .vertices
            .iter()
            .fold([f32::MAX; 3], |m, v| [m[0].min(v[0]), m[1].min(v[1]), m[2].min(v[2])]);
        let max = mesh
            .vertices
            .iter()
            .fold([f32::MIN; 3], |m, v| [m[0].max(v[0]), m[1].max(v[1]), m[2].max(v[2])]);
        assert_eq!(min, [5.0, 2.0, 1.0]);
        assert_eq!(max, [10.0, 4.0, 1.5]);
        assert!(signed_volume(&mesh) > 0.0);
    }

    #[test]
    fn test_build_layers_omits_empty_slots() {
        let map = IndexMap::from_rows(&[&[0, 2], &[2, 0]]).unwrap();
        let layers = build_layers(&map, &BookmarkSettings::default());
        let slots: Vec<usize> = layers.iter().map(|l| l.slot).collect();
        assert_eq!(slots, vec![0, 2]);
        assert_eq!(layers[0].name, "Base");
        assert_eq!(layers[1].name, "Color_3");
    }

    #[test]
    fn test_layers_share_base_height() {
        let map = IndexMap::from_rows(&[&[1, 2, 3]]).unwrap();
        let settings = BookmarkSettings {
            layer_heights_mm: [0.4, 0.8, 1.2, 1.6],
            ..Default::default()
        };
        for layer in build_layers(&map, &settings).iter().filter(|l| l.slot > 0) {
            let min_z = layer.mesh.vertices.iter().map(|v| v[2]).fold(f32::MAX, f32::min);
            let max_z = layer.mesh.vertices.iter().map(|v| v[2]).fold(f32::MIN, f32::max);
            assert_eq!(min_z, settings.base_thickness_mm);
            assert_eq!(max_z, settings.base_thickness_mm + settings.layer_heights_mm[layer.slot]);
        }
    }
}
