//! glTF/GLB decoder behind the loader boundary.
//!
//! Converts the parsed document into the crate's own [`SceneGraph`]: node
//! hierarchy with local transforms, triangle-list primitives, and PBR
//! metallic-roughness base parameters. Texture images are ignored; this
//! inspector shades from factors only.

use glam::{Mat4, Vec2, Vec3};

use super::{AssetSource, LoadError};
use crate::scene::{MaterialData, MeshData, SceneGraph, SceneNode};

pub fn decode(source: &AssetSource) -> Result<SceneGraph, LoadError> {
    let (document, buffers, _images) =
        gltf::import_slice(&source.bytes).map_err(|e| LoadError::Decode(e.to_string()))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::Decode("asset contains no scene".to_string()))?;

    let mut root = SceneNode::new("root");
    for node in scene.nodes() {
        root.children.push(convert_node(&node, &buffers)?);
    }

    let graph = SceneGraph::new(source.name.clone(), root);
    if graph.mesh_count() == 0 {
        return Err(LoadError::Decode("asset contains no mesh geometry".to_string()));
    }
    Ok(graph)
}

fn convert_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
) -> Result<SceneNode, LoadError> {
    let mut out = SceneNode::new(node.name().unwrap_or("node"));
    out.transform = Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "skipping non-triangle primitive in mesh {:?}",
                    mesh.name().unwrap_or("unnamed")
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

            let positions: Vec<Vec3> = match reader.read_positions() {
                Some(iter) => iter.map(Vec3::from).collect(),
                None => continue,
            };
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());
            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_else(|| averaged_normals(&positions, &indices));
            let uvs: Vec<Vec2> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().map(Vec2::from).collect())
                .unwrap_or_else(|| vec![Vec2::ZERO; positions.len()]);

            out.meshes.push(MeshData {
                positions,
                normals,
                uvs,
                indices,
                material: convert_material(&primitive.material()),
            });
        }
    }

    for child in node.children() {
        out.children.push(convert_node(&child, buffers)?);
    }
    Ok(out)
}

fn convert_material(material: &gltf::Material) -> MaterialData {
    let pbr = material.pbr_metallic_roughness();
    MaterialData {
        name: material.name().unwrap_or("material").to_string(),
        base_color: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        wireframe: false,
    }
}

/// Area-weighted vertex normals for primitives that ship without them.
fn averaged_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
        if *n == Vec3::ZERO {
            *n = Vec3::Y;
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    // One triangle, positions only, buffer embedded as a data URI.
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }]
    }"#;

    #[test]
    fn test_decodes_minimal_triangle() {
        let source = AssetSource::new("triangle.gltf", TRIANGLE_GLTF.as_bytes().to_vec());
        let graph = decode(&source).expect("valid asset");
        assert_eq!(graph.label, "triangle.gltf");
        assert_eq!(graph.mesh_count(), 1);

        let mut positions = 0;
        graph.visit_meshes(|mesh, _| {
            positions = mesh.positions.len();
            assert_eq!(mesh.indices, vec![0, 1, 2]);
            assert_eq!(mesh.normals.len(), 3);
            // Counter-clockwise triangle in the XY plane faces +Z.
            for n in &mesh.normals {
                assert!((*n - Vec3::Z).length() < 1e-5);
            }
        });
        assert_eq!(positions, 3);
    }

    #[test]
    fn test_garbage_bytes_fail_with_decode_error() {
        let source = AssetSource::new("broken.glb", vec![0xba, 0xad, 0xf0, 0x0d]);
        let err = decode(&source).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn test_averaged_normals_face_outward() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = averaged_normals(&positions, &[0, 1, 2]);
        for n in normals {
            assert!((n - Vec3::Z).length() < 1e-6);
        }
    }
}
