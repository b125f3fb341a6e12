//! Output formats: binary STL and 3MF packages

pub mod stl;
pub mod threemf;

// Re-export main types and functions
pub use stl::{export_stl_set, parse_stl, serialize_stl};
pub use threemf::{
    decode_thumbnail, serialize_3mf, ASSEMBLY_OBJECT_ID, BASE_MATERIALS_ID, THUMBNAIL_PATH,
};
