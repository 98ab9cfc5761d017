//! Scene graph data model shared by every viewport.
//!
//! A [`SceneGraph`] is the immutable result of decoding one asset: a tree of
//! nodes carrying local transforms and triangle meshes. The pristine decode
//! result is shared behind an `Arc` and never mutated in place; viewports
//! that need display overrides clone the graph first (see `materials`).

use glam::{Mat4, Vec2, Vec3};

/// PBR material parameters attached to a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    /// Render edges instead of shaded surfaces.
    pub wireframe: bool,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            wireframe: false,
        }
    }
}

/// Triangle mesh geometry in node-local space.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub material: MaterialData,
}

impl MeshData {
    /// Unit cube centered at the origin. Used by tests and as a decoder
    /// placeholder shape.
    pub fn unit_cube() -> Self {
        let half = 0.5;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face, (normal, right, up)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((*normal + *right * u + *up * v) * half);
                normals.push(*normal);
                uvs.push(Vec2::new(u * 0.5 + 0.5, v * 0.5 + 0.5));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            positions,
            normals,
            uvs,
            indices,
            material: MaterialData::default(),
        }
    }
}

/// One node in the scene tree: a local transform, any number of meshes,
/// and child nodes.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Mat4,
    pub meshes: Vec<MeshData>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Decoded asset: a label plus the root of the node tree.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    pub label: String,
    pub root: SceneNode,
}

impl SceneGraph {
    pub fn new(label: impl Into<String>, root: SceneNode) -> Self {
        Self {
            label: label.into(),
            root,
        }
    }

    /// Visit every mesh in the tree together with its accumulated
    /// world transform.
    pub fn visit_meshes<F: FnMut(&MeshData, Mat4)>(&self, mut f: F) {
        fn walk<F: FnMut(&MeshData, Mat4)>(node: &SceneNode, parent: Mat4, f: &mut F) {
            let world = parent * node.transform;
            for mesh in &node.meshes {
                f(mesh, world);
            }
            for child in &node.children {
                walk(child, world, f);
            }
        }
        walk(&self.root, Mat4::IDENTITY, &mut f);
    }

    /// Visit every material mutably. Used by the normalizer after cloning.
    pub fn visit_materials_mut<F: FnMut(&mut MaterialData)>(&mut self, mut f: F) {
        fn walk<F: FnMut(&mut MaterialData)>(node: &mut SceneNode, f: &mut F) {
            for mesh in &mut node.meshes {
                f(&mut mesh.material);
            }
            for child in &mut node.children {
                walk(child, f);
            }
        }
        walk(&mut self.root, &mut f);
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.visit_meshes(|_, _| count += 1);
        count
    }

    /// Unit cube scene. Test fixture mirroring the simplest possible asset.
    pub fn unit_cube(label: &str) -> Self {
        let mut root = SceneNode::new("root");
        root.meshes.push(MeshData::unit_cube());
        Self::new(label, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_meshes_accumulates_transforms() {
        let mut child = SceneNode::new("child");
        child.transform = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        child.meshes.push(MeshData::unit_cube());

        let mut root = SceneNode::new("root");
        root.transform = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        root.children.push(child);

        let graph = SceneGraph::new("nested", root);
        let mut worlds = Vec::new();
        graph.visit_meshes(|_, world| worlds.push(world));

        assert_eq!(worlds.len(), 1);
        let origin = worlds[0].transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_unit_cube_geometry() {
        let cube = MeshData::unit_cube();
        assert_eq!(cube.positions.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for p in &cube.positions {
            assert!(p.abs().max_element() <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn test_visit_materials_mut_reaches_every_mesh() {
        let mut root = SceneNode::new("root");
        root.meshes.push(MeshData::unit_cube());
        let mut child = SceneNode::new("child");
        child.meshes.push(MeshData::unit_cube());
        root.children.push(child);

        let mut graph = SceneGraph::new("two", root);
        let mut touched = 0;
        graph.visit_materials_mut(|m| {
            m.wireframe = true;
            touched += 1;
        });
        assert_eq!(touched, 2);
    }
}
