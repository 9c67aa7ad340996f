// Dream Runner: an endless runner over a streamed, procedurally populated plane.
// The world module simulates at a fixed tick rate; this file is the front end:
// window, input, ECS mirror of the live obstacles, and INSTANCED box rendering
// (every obstacle plus the runner in a single draw call).

mod engine;
mod world;

use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::{Event as WinitEvent, WindowEvent, ElementState, KeyEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};
use glam::{Mat4, Vec3};
use bevy_ecs::prelude::*;
use wgpu::util::DeviceExt;
use engine::{Color as EntityColor, Extent, Transform, LAYER_COLORS};
use engine::camera::ChaseCamera;
use engine::debug_overlay::{DebugOverlay, DebugStats};
use engine::input::InputState;
use engine::mesh::{GpuVertex, unit_cube};
use engine::systems::{apply_chunk_events, recolor_obstacles};
use world::{MotionState, StreamingConfig, StreamingLoop, CHUNK_SIZE, LAYER_COUNT};
use world::streaming::TickReport;

/// Simulation ticks per second. World constants are per tick.
const TICK_RATE: f32 = 60.0;
/// Cap on catch-up ticks after a long frame (window drag, breakpoint).
const MAX_TICKS_PER_FRAME: u32 = 5;
const MAX_INSTANCES: usize = 16_384;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// INSTANCE DATA (per-entity)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    center: [f32; 3],
    size: [f32; 3],
    color: [f32; 4],
}

impl InstanceData {
    fn new(center: Vec3, size: Vec3, color: [f32; 4]) -> Self {
        Self {
            center: center.to_array(),
            size: size.to_array(),
            color,
        }
    }

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,  // One per instance, not per vertex
            attributes: &[
                // Center (location 2)
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Size (location 3)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color (location 4)
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            light_dir: [0.4, 1.0, 0.3, 0.0],
        }
    }
}

// ============================================================================
// FRAME TIMING
// ============================================================================

#[derive(Default)]
struct FrameTimer {
    frames: u32,
    ticks: u32,
    frame_time_sum_ms: f32,
    frame_time_max_ms: f32,
    // Values published once per second
    fps: u32,
    tps: u32,
    avg_ms: f32,
    max_ms: f32,
}

impl FrameTimer {
    fn record(&mut self, frame_ms: f32, ticks: u32) {
        self.frames += 1;
        self.ticks += ticks;
        self.frame_time_sum_ms += frame_ms;
        self.frame_time_max_ms = self.frame_time_max_ms.max(frame_ms);
    }

    fn publish(&mut self) {
        self.fps = self.frames;
        self.tps = self.ticks;
        self.avg_ms = if self.frames > 0 { self.frame_time_sum_ms / self.frames as f32 } else { 0.0 };
        self.max_ms = self.frame_time_max_ms;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum_ms = 0.0;
        self.frame_time_max_ms = 0.0;
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    overlay: DebugOverlay,

    // Simulation and its render mirror
    streaming: StreamingLoop,
    world: World,
    last_report: Option<TickReport>,
    accumulator: f32,
    last_update: Instant,

    input: InputState,
    camera: ChaseCamera,
    timer: FrameTimer,
}

impl State {
    async fn new(window: Arc<Window>, config: StreamingConfig) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .expect("failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("no compatible GPU adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .expect("failed to open GPU device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_instanced.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc(), InstanceData::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let cube = unit_cube();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&cube.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&cube.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (MAX_INSTANCES * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let depth_view = create_depth_view(&device, &surface_config);
        let overlay = DebugOverlay::new(&window, &device, surface_format);

        let streaming = StreamingLoop::new(config);
        let mut camera = ChaseCamera::new();
        camera.snap(streaming.agent().position, streaming.agent().forward());

        Self {
            window,
            surface,
            device,
            queue,
            config: surface_config,
            size,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            num_indices: cube.indices.len() as u32,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            overlay,
            streaming,
            world: World::new(),
            last_report: None,
            accumulator: 0.0,
            last_update: Instant::now(),
            input: InputState::new(),
            camera,
            timer: FrameTimer::default(),
        }
    }

    /// Return the runner to the world origin. Chunks around it stream in on
    /// the next tick; the old region is evicted the same way.
    fn respawn(&mut self) {
        self.streaming.place_agent(Vec3::ZERO);
        let agent = self.streaming.agent();
        self.camera.snap(agent.position, agent.forward());
        log::info!("respawned at origin");
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    /// Run every whole tick that fits in the elapsed time. Returns ticks run.
    fn update(&mut self) -> u32 {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;

        let step = 1.0 / TICK_RATE;
        self.accumulator += dt;

        let mut ticks = 0;
        while self.accumulator >= step && ticks < MAX_TICKS_PER_FRAME {
            let intent = self.input.movement_intent();
            let report = self.streaming.tick(&intent);
            if let Some(layer) = report.layer_changed {
                recolor_obstacles(&mut self.world, layer);
            }
            let events = self.streaming.drain_events();
            if !events.is_empty() {
                let (spawned, despawned) = apply_chunk_events(&mut self.world, events);
                log::debug!("render mirror: +{} -{} obstacles", spawned, despawned);
            }
            self.last_report = Some(report);
            self.accumulator -= step;
            ticks += 1;
        }
        if ticks == MAX_TICKS_PER_FRAME {
            // Drop the backlog instead of spiralling.
            self.accumulator = self.accumulator.min(step);
        }

        let agent = self.streaming.agent();
        self.camera.update(agent.position, agent.forward());
        ticks
    }

    /// Runner body and legs as boxes, posed from the stride animation.
    fn runner_instances(&self) -> [InstanceData; 3] {
        let agent = self.streaming.agent();
        let stride = self.streaming.stride();
        let body_size = self.streaming.controller().tuning().body_size;
        let forward = agent.forward();
        let right = Vec3::new(-forward.z, 0.0, forward.x);
        let white = [1.0, 1.0, 1.0, 1.0];
        let grey = [0.75, 0.75, 0.8, 1.0];

        let leg_height = body_size.y * 0.45;
        let leg_size = Vec3::new(0.3, leg_height, 0.3);
        let body_size = Vec3::new(body_size.x, body_size.y - leg_height, body_size.z);
        let body_center = agent.position
            + Vec3::Y * (leg_height + body_size.y * 0.5)
            + forward * (stride.lean * 0.5);

        let leg = |side: f32, swing: f32| {
            let center = agent.position
                + Vec3::Y * (leg_height * 0.5)
                + right * (side * 0.25)
                + forward * (swing.sin() * leg_height);
            InstanceData::new(center, leg_size, grey)
        };

        [
            InstanceData::new(body_center, body_size, white),
            leg(-1.0, stride.left_swing),
            leg(1.0, stride.right_swing),
        ]
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Collect instance data from ECS BEFORE creating render pass
        let agent_position = self.streaming.agent().position;
        let layer = self.streaming.layer();
        let ground_color = LAYER_COLORS[layer % LAYER_COUNT].scaled(0.35);
        let ground_span = CHUNK_SIZE * (2 * self.streaming.config().load_radius + 1) as f32;

        let mut instance_data = Vec::with_capacity(self.streaming.store().obstacle_count() + 4);
        instance_data.push(InstanceData::new(
            Vec3::new(agent_position.x, -0.05, agent_position.z),
            Vec3::new(ground_span, 0.1, ground_span),
            ground_color.to_array(1.0),
        ));
        instance_data.extend(self.runner_instances());

        let mut query = self.world.query::<(&Transform, &Extent, &EntityColor)>();
        for (transform, extent, color) in query.iter(&self.world) {
            instance_data.push(InstanceData::new(transform.position, extent.size, color.to_array(1.0)));
        }

        if instance_data.len() > MAX_INSTANCES {
            log::warn!("{} instances exceed buffer capacity {}", instance_data.len(), MAX_INSTANCES);
        }
        let instance_count = instance_data.len().min(MAX_INSTANCES);

        self.queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&instance_data[..instance_count]),
        );

        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        let uniforms = Uniforms {
            view_proj: self.camera.view_projection(aspect).to_cols_array_2d(),
            ..Uniforms::new()
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let sky = LAYER_COLORS[layer % LAYER_COUNT].scaled(0.12);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: sky.r as f64,
                            g: sky.g as f64,
                            b: sky.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            // ONE DRAW CALL for ground, runner and every obstacle
            render_pass.draw_indexed(0..self.num_indices, 0, 0..instance_count as u32);
        }

        let stats = self.overlay.visible.then(|| self.debug_stats(instance_count));
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            stats.as_ref(),
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn debug_stats(&self, draw_instances: usize) -> DebugStats {
        let agent = self.streaming.agent();
        let store = self.streaming.store();
        let stats = self.streaming.stats();
        let chunk = world::grid::chunk_key_at(agent.position);

        DebugStats {
            fps: self.timer.fps,
            frame_time_avg_ms: self.timer.avg_ms,
            frame_time_max_ms: self.timer.max_ms,
            ticks_per_second: self.timer.tps,
            resolution: (self.size.width, self.size.height),
            draw_instances,
            chunks_live: store.len(),
            chunk: (chunk.cx, chunk.cz),
            obstacles_live: store.obstacle_count(),
            obstacles_scanned: self.last_report.map_or(0, |r| r.nearby_obstacles),
            position: (agent.position.x, agent.position.y, agent.position.z),
            heading_deg: agent.heading.to_degrees(),
            vertical_velocity: agent.vertical_velocity,
            state: match agent.state {
                MotionState::Grounded => "grounded",
                MotionState::Airborne => "airborne",
            },
            layer: self.streaming.layer(),
            distance: stats.distance,
            chunks_loaded_total: stats.chunks_loaded,
            chunks_evicted_total: stats.chunks_evicted,
        }
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    env_logger::init();

    let config = StreamingConfig::from_env().unwrap_or_else(|e| {
        log::error!("{e}; falling back to default streaming config");
        StreamingConfig::default()
    });

    let event_loop = EventLoop::new().expect("failed to create event loop");

    let window_attributes = Window::default_attributes()
        .with_title("Dream Runner")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(
        event_loop
            .create_window(window_attributes)
            .expect("failed to create window"),
    );

    let mut state = pollster::block_on(State::new(window.clone(), config));
    let mut last_fps_update = Instant::now();
    let mut last_frame = Instant::now();
    log::info!("streaming world ready; arrows/WASD to run, Space to ascend, R to respawn, F3 for stats");

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.overlay.handle_window_event(&window, event);
                state.input.process_event(event, response.consumed);

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        if state.input.was_pressed(KeyCode::F3) {
                            state.overlay.toggle();
                        }
                        if state.input.was_pressed(KeyCode::KeyR) {
                            state.respawn();
                        }

                        let ticks = state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("surface out of memory");
                                control_flow.exit();
                            }
                            Err(e) => log::warn!("surface error: {:?}", e),
                        }
                        state.input.end_frame();

                        let now = Instant::now();
                        state.timer.record((now - last_frame).as_secs_f32() * 1000.0, ticks);
                        last_frame = now;
                        if (now - last_fps_update).as_secs_f32() >= 1.0 {
                            state.timer.publish();
                            let agent = state.streaming.agent();
                            log::info!(
                                "FPS: {} | Ticks: {} | Chunks: {} | Obstacles: {} | Runner: ({:.1}, {:.1}, {:.1})",
                                state.timer.fps,
                                state.timer.tps,
                                state.streaming.store().len(),
                                state.streaming.store().obstacle_count(),
                                agent.position.x,
                                agent.position.y,
                                agent.position.z,
                            );
                            last_fps_update = now;
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    }).expect("event loop terminated with an error");
}
