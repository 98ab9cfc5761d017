//! wgpu rendering for the seven viewports.
//!
//! One shared renderer serves every viewport: pipelines and layouts are
//! created once, per-viewport uniform buffers are written during prepare,
//! and per-instance mesh buffers are uploaded on first draw of a staged
//! scene. Uploads are keyed by instance id and stamped with the
//! orchestrator epoch; when a rebuild bumps the epoch, superseded uploads
//! are released explicitly instead of lingering until shutdown.

use std::collections::HashMap;
use std::mem;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, Buffer, BufferUsages, CompareFunction, DepthBiasState,
    DepthStencilState, Device, Face, FrontFace, PolygonMode, PrimitiveTopology, Queue,
    RenderPass, RenderPipeline, ShaderStages, TextureFormat, VertexAttribute,
    VertexBufferLayout, VertexFormat, VertexStepMode,
};

use crate::viewport::{DrawRequest, RenderMesh, ViewportId};

/// Depth format requested from eframe (`NativeOptions::depth_buffer = 32`).
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3D {
    const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: VertexFormat::Float32x3,
        },
        VertexAttribute {
            offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: VertexFormat::Float32x3,
        },
        VertexAttribute {
            offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
            shader_location: 2,
            format: VertexFormat::Float32x2,
        },
    ];

    pub fn desc<'a>() -> VertexBufferLayout<'a> {
        VertexBufferLayout {
            array_stride: mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl LineVertex {
    const ATTRIBUTES: [VertexAttribute; 2] = [
        VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: VertexFormat::Float32x3,
        },
        VertexAttribute {
            offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: VertexFormat::Float32x3,
        },
    ];

    pub fn desc<'a>() -> VertexBufferLayout<'a> {
        VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Uniforms3D {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 3],
    ambient: f32,
    light_dir: [f32; 3],
    light_intensity: f32,
    point_pos: [f32; 3],
    point_intensity: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct MaterialUniform {
    base_color: [f32; 4],
    metallic: f32,
    roughness: f32,
    _pad: [f32; 2],
}

/// GPU buffers for one shaded mesh.
struct GpuMesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    material_bind_group: BindGroup,
}

/// GPU buffer for a line batch (wireframe edges or overlays).
struct GpuLines {
    vertex_buffer: Buffer,
    vertex_count: u32,
}

/// Uploaded form of one staged scene instance.
struct GpuScene {
    epoch: u64,
    meshes: Vec<GpuMesh>,
    wire_lines: Option<GpuLines>,
    grid_lines: GpuLines,
    axes_lines: GpuLines,
}

/// Shared renderer behind the egui paint callback.
pub struct ViewportRenderer {
    mesh_pipeline: Option<RenderPipeline>,
    line_pipeline: Option<RenderPipeline>,
    uniform_layout: Option<BindGroupLayout>,
    material_layout: Option<BindGroupLayout>,
    viewport_uniforms: HashMap<ViewportId, (Buffer, BindGroup)>,
    scenes: HashMap<u64, GpuScene>,
}

impl Default for ViewportRenderer {
    fn default() -> Self {
        Self {
            mesh_pipeline: None,
            line_pipeline: None,
            uniform_layout: None,
            material_layout: None,
            viewport_uniforms: HashMap::new(),
            scenes: HashMap::new(),
        }
    }
}

impl ViewportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.mesh_pipeline.is_some() && self.line_pipeline.is_some()
    }

    /// Create pipelines and layouts once, from the egui callback's device.
    pub fn initialize(&mut self, device: &Device) {
        if self.is_initialized() {
            return;
        }
        log::info!("initializing viewport renderer");

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Viewport Uniform Layout"),
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("Material Layout"),
        });

        self.create_pipelines(device, &uniform_layout, &material_layout);
        self.uniform_layout = Some(uniform_layout);
        self.material_layout = Some(material_layout);
    }

    fn create_pipelines(
        &mut self,
        device: &Device,
        uniform_layout: &BindGroupLayout,
        material_layout: &BindGroupLayout,
    ) {
        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh3d.wgsl").into()),
        });
        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/line3d.wgsl").into()),
        });

        let depth_stencil = Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[uniform_layout, material_layout],
            push_constant_ranges: &[],
        });

        self.mesh_pipeline = Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&mesh_layout),
            cache: None,
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: "vs_main",
                buffers: &[Vertex3D::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: TextureFormat::Bgra8Unorm,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: Some(Face::Back),
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: depth_stencil.clone(),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        }));

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });

        self.line_pipeline = Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Pipeline"),
            layout: Some(&line_layout),
            cache: None,
            vertex: wgpu::VertexState {
                module: &line_shader,
                entry_point: "vs_main",
                buffers: &[LineVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &line_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: TextureFormat::Bgra8Unorm,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        }));
    }

    /// Upload the request's staged scene if unseen, release uploads
    /// superseded by the epoch, and write this viewport's uniforms.
    pub fn prepare(&mut self, device: &Device, queue: &Queue, request: &DrawRequest) {
        if !self.is_initialized() {
            return;
        }

        let before = self.scenes.len();
        self.scenes.retain(|_, scene| scene.epoch >= request.epoch);
        if self.scenes.len() != before {
            log::debug!(
                "released {} superseded scene uploads",
                before - self.scenes.len()
            );
        }

        if !self.scenes.contains_key(&request.scene.instance_id) {
            let scene = self.upload_scene(device, request);
            self.scenes.insert(request.scene.instance_id, scene);
        }

        self.write_viewport_uniforms(device, queue, request);
    }

    fn write_viewport_uniforms(&mut self, device: &Device, queue: &Queue, request: &DrawRequest) {
        let uniforms = Uniforms3D {
            view_proj: request.view_projection.to_cols_array_2d(),
            camera_pos: request.camera_position.to_array(),
            ambient: request.lights.ambient,
            light_dir: request.lights.directional_direction.to_array(),
            light_intensity: request.lights.directional_intensity,
            point_pos: request.lights.point_position.to_array(),
            point_intensity: request.lights.point_intensity,
        };

        let Some(layout) = self.uniform_layout.as_ref() else {
            return;
        };
        let (buffer, _) = self
            .viewport_uniforms
            .entry(request.viewport)
            .or_insert_with(|| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Viewport Uniforms"),
                    size: mem::size_of::<Uniforms3D>() as u64,
                    usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                    label: Some("Viewport Uniform Bind Group"),
                });
                (buffer, bind_group)
            });
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn upload_scene(&self, device: &Device, request: &DrawRequest) -> GpuScene {
        let material_layout = self.material_layout.as_ref().expect("initialized");

        let mut meshes = Vec::new();
        let mut wire_vertices: Vec<LineVertex> = Vec::new();

        for mesh in request.scene.meshes.iter() {
            if mesh.wireframe {
                append_edge_lines(&mut wire_vertices, mesh);
                continue;
            }

            let vertices: Vec<Vertex3D> = mesh
                .positions
                .iter()
                .zip(&mesh.normals)
                .zip(&mesh.uvs)
                .map(|((p, n), uv)| Vertex3D {
                    position: p.to_array(),
                    normal: n.to_array(),
                    uv: uv.to_array(),
                })
                .collect();

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: BufferUsages::INDEX,
            });

            let material = MaterialUniform {
                base_color: mesh.base_color,
                metallic: mesh.metallic,
                roughness: mesh.roughness,
                _pad: [0.0; 2],
            };
            let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Uniform"),
                contents: bytemuck::bytes_of(&material),
                usage: BufferUsages::UNIFORM,
            });
            let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: material_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: material_buffer.as_entire_binding(),
                }],
                label: Some("Material Bind Group"),
            });

            meshes.push(GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                material_bind_group,
            });
        }

        let wire_lines = if wire_vertices.is_empty() {
            None
        } else {
            Some(upload_lines(device, "Wireframe Lines", &wire_vertices))
        };

        GpuScene {
            epoch: request.epoch,
            meshes,
            wire_lines,
            grid_lines: upload_lines(device, "Grid Lines", &grid_vertices(request.overlay_extent)),
            axes_lines: upload_lines(device, "Axes Lines", &axes_vertices(request.overlay_extent)),
        }
    }

    /// Issue one viewport's draw into the egui render pass.
    pub fn paint(&self, render_pass: &mut RenderPass<'static>, request: &DrawRequest) {
        let (Some(mesh_pipeline), Some(line_pipeline)) =
            (&self.mesh_pipeline, &self.line_pipeline)
        else {
            return;
        };
        let Some((_, uniform_bind_group)) = self.viewport_uniforms.get(&request.viewport) else {
            return;
        };
        let Some(scene) = self.scenes.get(&request.scene.instance_id) else {
            return;
        };

        render_pass.set_pipeline(mesh_pipeline);
        render_pass.set_bind_group(0, uniform_bind_group, &[]);
        for mesh in &scene.meshes {
            render_pass.set_bind_group(1, &mesh.material_bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        render_pass.set_pipeline(line_pipeline);
        render_pass.set_bind_group(0, uniform_bind_group, &[]);
        if let Some(lines) = &scene.wire_lines {
            render_pass.set_vertex_buffer(0, lines.vertex_buffer.slice(..));
            render_pass.draw(0..lines.vertex_count, 0..1);
        }
        if request.show_grid {
            render_pass.set_vertex_buffer(0, scene.grid_lines.vertex_buffer.slice(..));
            render_pass.draw(0..scene.grid_lines.vertex_count, 0..1);
        }
        if request.show_axes {
            render_pass.set_vertex_buffer(0, scene.axes_lines.vertex_buffer.slice(..));
            render_pass.draw(0..scene.axes_lines.vertex_count, 0..1);
        }
    }
}

fn upload_lines(device: &Device, label: &str, vertices: &[LineVertex]) -> GpuLines {
    GpuLines {
        vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: BufferUsages::VERTEX,
        }),
        vertex_count: vertices.len() as u32,
    }
}

/// Unique triangle edges of a wireframe mesh as line segments tinted with
/// the material color.
fn append_edge_lines(out: &mut Vec<LineVertex>, mesh: &RenderMesh) {
    let color = [mesh.base_color[0], mesh.base_color[1], mesh.base_color[2]];
    let mut seen = std::collections::HashSet::new();
    for tri in mesh.indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (a.min(b), a.max(b));
            if !seen.insert(key) {
                continue;
            }
            let (pa, pb) = (
                mesh.positions.get(a as usize),
                mesh.positions.get(b as usize),
            );
            if let (Some(pa), Some(pb)) = (pa, pb) {
                out.push(LineVertex {
                    position: pa.to_array(),
                    color,
                });
                out.push(LineVertex {
                    position: pb.to_array(),
                    color,
                });
            }
        }
    }
}

/// Ground grid in the XZ plane, sized to the model.
pub fn grid_vertices(half_extent: f32) -> Vec<LineVertex> {
    const DIVISIONS: i32 = 10;
    let cell = [0.16, 0.18, 0.22];
    let section = [0.28, 0.32, 0.40];

    let mut vertices = Vec::new();
    let step = half_extent / DIVISIONS as f32;
    for i in -DIVISIONS..=DIVISIONS {
        let offset = i as f32 * step;
        let color = if i == 0 { section } else { cell };
        for (a, b) in [
            (
                Vec3::new(offset, 0.0, -half_extent),
                Vec3::new(offset, 0.0, half_extent),
            ),
            (
                Vec3::new(-half_extent, 0.0, offset),
                Vec3::new(half_extent, 0.0, offset),
            ),
        ] {
            vertices.push(LineVertex {
                position: a.to_array(),
                color,
            });
            vertices.push(LineVertex {
                position: b.to_array(),
                color,
            });
        }
    }
    vertices
}

/// Orientation-axes marker for the fixed views: X red, Y green, Z blue.
pub fn axes_vertices(half_extent: f32) -> Vec<LineVertex> {
    let length = half_extent * 0.5;
    let axes = [
        (Vec3::X, [0.9, 0.2, 0.2]),
        (Vec3::Y, [0.2, 0.9, 0.2]),
        (Vec3::Z, [0.2, 0.4, 0.9]),
    ];
    axes.iter()
        .flat_map(|(axis, color)| {
            [
                LineVertex {
                    position: [0.0; 3],
                    color: *color,
                },
                LineVertex {
                    position: (*axis * length).to_array(),
                    color: *color,
                },
            ]
        })
        .collect()
}
