//! 3MF packaging: per-layer objects, a shared material table and a thumbnail
//!
//! # Package Layout
//!
//! ```text
//! [Content_Types].xml      rels / model / png content types
//! _rels/.rels              3D model and thumbnail relationships
//! 3D/3dmodel.model         materials, layer objects, assembly, build item
//! Metadata/thumbnail.png   thumbnail bytes, stored as supplied
//! ```
//!
//! Resource ids come from disjoint ranges: layer objects are numbered from 1,
//! the material table is [`BASE_MATERIALS_ID`] and the assembly object is
//! [`ASSEMBLY_OBJECT_ID`].

use crate::mesh::LayerAssignment;
use crate::types::{Palette, Result, PALETTE_SIZE};
use base64::Engine;
use std::io::{Cursor, Seek, Write};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Resource id of the `<basematerials>` table
pub const BASE_MATERIALS_ID: u32 = 50;

/// Object id of the assembly referencing every layer object
pub const ASSEMBLY_OBJECT_ID: u32 = 100;

pub const MODEL_PATH: &str = "3D/3dmodel.model";
pub const THUMBNAIL_PATH: &str = "Metadata/thumbnail.png";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
  <Default Extension="png" ContentType="image/png"/>
</Types>
"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
  <Relationship Target="/Metadata/thumbnail.png" Id="rel1" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail"/>
</Relationships>
"#;

/// Object id of the `index`-th populated layer
pub fn layer_object_id(index: usize) -> u32 {
    index as u32 + 1
}

/// Decode a base64 PNG, with or without a `data:...;base64,` prefix
///
/// The image content is not inspected.
pub fn decode_thumbnail(data: &str) -> Result<Vec<u8>> {
    let data = data.trim();
    let payload = match data.strip_prefix("data:") {
        Some(uri) => uri.split_once(',').map_or(uri, |(_, payload)| payload),
        None => data,
    };
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

/// Build the `3D/3dmodel.model` document
pub fn model_xml(layers: &[LayerAssignment], palette: &Palette) -> String {
    let layers: Vec<&LayerAssignment> = layers.iter().filter(|l| !l.mesh.is_empty()).collect();
    let triangle_total: usize = layers.iter().map(|l| l.mesh.triangle_count()).sum();
    let vertex_total: usize = layers.iter().map(|l| l.mesh.vertex_count()).sum();
    let mut xml = String::with_capacity(1024 + vertex_total * 60 + triangle_total * 70);

    xml.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <metadata name="Title">Bookmark</metadata>
  <metadata name="Application">bookmark</metadata>
"#,
    );
    xml.push_str(&format!(
        "  <metadata name=\"Thumbnail\">/{}</metadata>\n  <resources>\n",
        THUMBNAIL_PATH
    ));

    xml.push_str(&format!(
        "    <basematerials id=\"{}\">\n",
        BASE_MATERIALS_ID
    ));
    for slot in 0..PALETTE_SIZE {
        xml.push_str(&format!(
            "      <base name=\"Color {}\" displaycolor=\"{}FF\"/>\n",
            slot + 1,
            palette.color(slot)
        ));
    }
    xml.push_str("    </basematerials>\n");

    for (index, layer) in layers.iter().enumerate() {
        xml.push_str(&format!(
            "    <object id=\"{}\" name=\"{}\" type=\"model\" pid=\"{}\" pindex=\"{}\">\n      <mesh>\n        <vertices>\n",
            layer_object_id(index),
            escape_xml(&layer.name),
            BASE_MATERIALS_ID,
            layer.slot
        ));
        for [x, y, z] in &layer.mesh.vertices {
            xml.push_str(&format!(
                "          <vertex x=\"{}\" y=\"{}\" z=\"{}\"/>\n",
                x, y, z
            ));
        }
        xml.push_str("        </vertices>\n        <triangles>\n");
        for [v1, v2, v3] in &layer.mesh.triangles {
            xml.push_str(&format!(
                "          <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\" pid=\"{}\" p1=\"{}\"/>\n",
                v1, v2, v3, BASE_MATERIALS_ID, layer.slot
            ));
        }
        xml.push_str("        </triangles>\n      </mesh>\n    </object>\n");
    }

    xml.push_str(&format!(
        "    <object id=\"{}\" name=\"Bookmark\" type=\"model\">\n      <components>\n",
        ASSEMBLY_OBJECT_ID
    ));
    for index in 0..layers.len() {
        xml.push_str(&format!(
            "        <component objectid=\"{}\"/>\n",
            layer_object_id(index)
        ));
    }
    xml.push_str("      </components>\n    </object>\n  </resources>\n");

    xml.push_str(&format!(
        "  <build>\n    <item objectid=\"{}\"/>\n  </build>\n</model>\n",
        ASSEMBLY_OBJECT_ID
    ));

    xml
}

/// Package every populated layer, the palette and the thumbnail into a 3MF
///
/// The thumbnail is decoded before anything is written, so a bad thumbnail
/// fails without producing output.
pub fn serialize_3mf(
    layers: &[LayerAssignment],
    palette: &Palette,
    thumbnail_base64: &str,
) -> Result<Vec<u8>> {
    let thumbnail = decode_thumbnail(thumbnail_base64)?;
    let model = model_xml(layers, palette);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    add_entry(&mut zip, "[Content_Types].xml", CONTENT_TYPES_XML.as_bytes(), options)?;
    add_entry(&mut zip, "_rels/.rels", RELS_XML.as_bytes(), options)?;
    add_entry(&mut zip, MODEL_PATH, model.as_bytes(), options)?;
    // PNG data is already compressed
    add_entry(
        &mut zip,
        THUMBNAIL_PATH,
        &thumbnail,
        options.compression_method(CompressionMethod::Stored),
    )?;

    let bytes = zip.finish()?.into_inner();

    info!(
        "Packaged {} layer objects into 3MF ({} bytes, thumbnail {} bytes)",
        layers.iter().filter(|l| !l.mesh.is_empty()).count(),
        bytes.len(),
        thumbnail.len()
    );

    Ok(bytes)
}

fn add_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    content: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)?;
    zip.write_all(content)?;
    Ok(())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
