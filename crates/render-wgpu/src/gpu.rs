use crate::reflect;
use marchview_render::{
    ProgramError, QUAD_VERTICES, QuadPipeline, RenderBackend, RenderError, RenderTarget,
    ShaderSources, UniformBlock,
};
use naga::ShaderStage;
use wgpu::util::DeviceExt;

/// Color format of the intermediate target in the post-process variant.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no GPU adapter can present to this window")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("post-processing enabled but no post shader was loaded")]
    MissingPostShader,
    #[error("{label} shader rejected by the device: {message}")]
    ShaderModule { label: &'static str, message: String },
    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// Intermediate color target plus the program that samples it.
struct Offscreen {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

impl Offscreen {
    fn new(
        device: &wgpu::Device,
        pipeline: wgpu::RenderPipeline,
        layout: wgpu::BindGroupLayout,
        width: u32,
        height: u32,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("offscreen_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let (view, bind_group) = Self::target(device, &layout, &sampler, width, height);
        Self {
            pipeline,
            layout,
            sampler,
            view,
            bind_group,
        }
    }

    fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (view, bind_group) = Self::target(device, &self.layout, &self.sampler, width, height);
        self.view = view;
        self.bind_group = bind_group;
    }

    fn target(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
    ) -> (wgpu::TextureView, wgpu::BindGroup) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("offscreen_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        (view, bind_group)
    }
}

/// Everything recorded between `begin_frame` and `present`.
struct Frame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    target: RenderTarget,
}

/// wgpu render backend: one window surface, one full-screen quad, the
/// raymarch program and, optionally, an offscreen target with a post pass.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    program: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    scene_pipeline: wgpu::RenderPipeline,
    quad_buffer: wgpu::Buffer,
    offscreen: Option<Offscreen>,
    frame: Option<Frame>,
}

impl WgpuBackend {
    /// Create the surface and device, compile the program and reflect its
    /// uniform block. Blocks on the adapter and device futures.
    pub fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        sources: &ShaderSources,
        post_process: bool,
    ) -> Result<Self, GpuError> {
        let layout = reflect::reflect_uniforms(&sources.fragment)?;
        let post_source = match (post_process, sources.post.as_deref()) {
            (false, _) => None,
            (true, Some(src)) => Some(src),
            (true, None) => return Err(GpuError::MissingPostShader),
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("marchview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let vertex = glsl_module(&device, "vertex", &sources.vertex, ShaderStage::Vertex)?;
        let fragment = glsl_module(&device, "fragment", &sources.fragment, ShaderStage::Fragment)?;

        let program = UniformBlock::new(layout);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size: program.bytes().len() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let scene_format = if post_process { OFFSCREEN_FORMAT } else { format };
        let scene_pipeline = quad_pipeline(
            &device,
            "scene_pipeline",
            &uniform_layout,
            &vertex,
            &fragment,
            scene_format,
        );

        let offscreen = match post_source {
            Some(src) => {
                let post = glsl_module(&device, "post", src, ShaderStage::Fragment)?;
                let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("offscreen_bind_group_layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });
                let pipeline =
                    quad_pipeline(&device, "post_pipeline", &layout, &vertex, &post, format);
                Some(Offscreen::new(
                    &device,
                    pipeline,
                    layout,
                    config.width,
                    config.height,
                ))
            }
            None => None,
        };

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_vertex_buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            ?format,
            uniform_bytes = program.bytes().len(),
            post_process,
            "GPU initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            program,
            uniform_buffer,
            uniform_bind_group,
            scene_pipeline,
            quad_buffer,
            offscreen,
            frame: None,
        })
    }

    /// Record one render pass into the current target.
    fn record_pass(
        &mut self,
        load: wgpu::LoadOp<wgpu::Color>,
        draw: Option<QuadPipeline>,
    ) -> Result<(), RenderError> {
        let frame = self.frame.as_mut().ok_or(RenderError::NoFrame)?;
        let view = match frame.target {
            RenderTarget::Screen => &frame.view,
            RenderTarget::Offscreen => {
                &self
                    .offscreen
                    .as_ref()
                    .ok_or(RenderError::NoOffscreen)?
                    .view
            }
        };
        let draw = match draw {
            None => None,
            Some(QuadPipeline::Scene) => Some((&self.scene_pipeline, &self.uniform_bind_group)),
            Some(QuadPipeline::Post) => {
                let offscreen = self.offscreen.as_ref().ok_or(RenderError::NoOffscreen)?;
                if frame.target == RenderTarget::Offscreen {
                    return Err(RenderError::FeedbackLoop);
                }
                Some((&offscreen.pipeline, &offscreen.bind_group))
            }
        };

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quad_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        if let Some((pipeline, bind_group)) = draw {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    type Program = UniformBlock;

    fn program_mut(&mut self) -> &mut UniformBlock {
        &mut self.program
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        if let Some(offscreen) = &mut self.offscreen {
            offscreen.resize(&self.device, self.config.width, self.config.height);
        }
    }

    fn has_offscreen(&self) -> bool {
        self.offscreen.is_some()
    }

    fn begin_frame(&mut self) -> Result<bool, RenderError> {
        if self.program.take_dirty() {
            self.queue
                .write_buffer(&self.uniform_buffer, 0, self.program.bytes());
        }

        let texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                tracing::debug!("surface lost or outdated, reconfigured");
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("timed out acquiring surface texture");
                return Ok(false);
            }
            Err(e) => return Err(RenderError::Surface(e.to_string())),
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        self.frame = Some(Frame {
            texture,
            view,
            encoder,
            target: RenderTarget::Screen,
        });
        Ok(true)
    }

    fn bind_target(&mut self, target: RenderTarget) -> Result<(), RenderError> {
        if target == RenderTarget::Offscreen && self.offscreen.is_none() {
            return Err(RenderError::NoOffscreen);
        }
        let frame = self.frame.as_mut().ok_or(RenderError::NoFrame)?;
        frame.target = target;
        Ok(())
    }

    fn clear(&mut self, color: [f64; 4]) -> Result<(), RenderError> {
        self.record_pass(wgpu::LoadOp::Clear(clear_color(color)), None)
    }

    fn draw_quad(&mut self, pipeline: QuadPipeline) -> Result<(), RenderError> {
        self.record_pass(wgpu::LoadOp::Load, Some(pipeline))
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = self.frame.take().ok_or(RenderError::NoFrame)?;
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.texture.present();
        Ok(())
    }
}

fn clear_color([r, g, b, a]: [f64; 4]) -> wgpu::Color {
    wgpu::Color { r, g, b, a }
}

/// Hand GLSL to wgpu, surfacing validation failures as errors instead of the
/// device's uncaptured-error panic.
fn glsl_module(
    device: &wgpu::Device,
    label: &'static str,
    source: &str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: source.into(),
            stage,
            defines: Default::default(),
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(GpuError::ShaderModule {
            label,
            message: err.to_string(),
        });
    }
    Ok(module)
}

fn quad_pipeline(
    device: &wgpu::Device,
    label: &'static str,
    bind_group_layout: &wgpu::BindGroupLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2],
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}
