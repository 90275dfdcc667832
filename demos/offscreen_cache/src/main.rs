//! Render a dot field once into the offscreen cache, then replay it into
//! both eye buffers every frame. Press R to re-fill the cache with a new
//! field.
//!
//! The point of the cache is exactly this pattern: pay for the scene once,
//! then serve identical pixels to both eyes for as long as the stimulus is
//! on screen.

use binoc_buffers::OffscreenCache;
use binoc_core::StereoConfig;
use binoc_glow::{create_texture, PixelFormat, TexQuad};
use binoc_host_winit::WinitHost;
use binoc_modes::{Eye, StereoSettings, WindowGeometry};
use binoc_router::{StereoError, StereoRouter};

use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

const DOT_COUNT: u32 = 120;
const DOT_TEX_SIZE: i32 = 32;

fn main() {
    if let Err(e) = run() {
        eprintln!("[offscreen_cache] error: {e}");
        std::process::exit(1);
    }
}

/// Soft circular dot, white on transparent.
fn dot_pixels(size: i32) -> Vec<u8> {
    let mut px = Vec::with_capacity((size * size * 4) as usize);
    let r = size as f32 / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - r;
            let dy = y as f32 + 0.5 - r;
            let d = (dx * dx + dy * dy).sqrt() / r;
            let a = ((1.0 - d) * 4.0).clamp(0.0, 1.0);
            px.extend_from_slice(&[255, 255, 255, (a * 255.0) as u8]);
        }
    }
    px
}

/// Tiny deterministic LCG so refills are varied but reproducible per seed.
fn lcg(state: &mut u32) -> f32 {
    *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    (*state >> 8) as f32 / (1u32 << 24) as f32
}

unsafe fn fill_cache(
    gl: &glow::Context,
    cache: &mut OffscreenCache,
    quad: &TexQuad,
    dot_tex: glow::NativeTexture,
    seed: u32,
) -> Result<(), StereoError> {
    use glow::HasContext;

    let scope = cache.scope(gl)?;

    // Bound and viewport-set by the scope; wipe the previous field.
    gl.clear_color(0.05, 0.05, 0.1, 1.0);
    gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);

    gl.enable(glow::BLEND);
    gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

    let mut state = seed;
    for _ in 0..DOT_COUNT {
        let cx = lcg(&mut state) * 2.0 - 1.0;
        let cy = lcg(&mut state) * 2.0 - 1.0;
        let s = 0.01 + lcg(&mut state) * 0.04;
        quad.draw(gl, dot_tex, None, Some([cx - s, cy - s, cx + s, cy + s]));
    }

    gl.disable(glow::BLEND);
    scope.finish()
}

fn run() -> Result<(), StereoError> {
    let event_loop = EventLoop::new();
    let (mut host, gl) = WinitHost::new(&event_loop, "binoc: offscreen cache", 960.0, 540.0)?;

    let cfg = StereoConfig::default(); // left-right-split
    let settings = StereoSettings::from_config(&cfg)?;
    let (w, h) = host.drawable_size();
    let geometry = WindowGeometry::new(w, h).with_config(&cfg);

    let mut router = unsafe { StereoRouter::new(&gl, settings, geometry)? };
    let quad = unsafe { TexQuad::new(&gl)? };
    let dot_tex = unsafe {
        create_texture(
            &gl,
            DOT_TEX_SIZE,
            DOT_TEX_SIZE,
            PixelFormat::Rgba8,
            &dot_pixels(DOT_TEX_SIZE),
        )?
    };

    let mut cache = unsafe { OffscreenCache::new(&gl, w, h)? };
    let mut seed = 7u32;
    unsafe {
        fill_cache(&gl, &mut cache, &quad, dot_tex, seed)?;
    }

    eprintln!("[offscreen_cache] r = refill, esc = quit");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

                WindowEvent::Resized(physical_size) => {
                    let w = physical_size.width.max(1);
                    let h = physical_size.height.max(1);
                    host.resize_surface(w, h);
                    unsafe {
                        router.resize(&gl, w as i32, h as i32);
                        // Resizing discards the cached pixels; fill again
                        // before the next replay.
                        cache.resize(&gl, w as i32, h as i32);
                        if let Err(e) = fill_cache(&gl, &mut cache, &quad, dot_tex, seed) {
                            eprintln!("[offscreen_cache] refill after resize: {e}");
                        }
                    }
                    host.window.request_redraw();
                }

                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(key),
                            ..
                        },
                    ..
                } => match key {
                    VirtualKeyCode::Escape => *control_flow = ControlFlow::Exit,
                    VirtualKeyCode::R => {
                        seed = seed.wrapping_add(1);
                        if let Err(e) = unsafe { fill_cache(&gl, &mut cache, &quad, dot_tex, seed) }
                        {
                            eprintln!("[offscreen_cache] refill: {e}");
                        }
                    }
                    _ => {}
                },

                _ => {}
            },

            Event::MainEventsCleared => host.window.request_redraw(),

            Event::RedrawRequested(_) => {
                unsafe {
                    for eye in [Eye::Left, Eye::Right] {
                        router.set_buffer(&gl, eye, true);
                        if let Err(e) = cache.draw(&gl, &quad, None, None) {
                            eprintln!("[offscreen_cache] draw: {e}");
                        }
                    }
                }
                if let Err(e) = unsafe { router.flip(&gl, &mut host) } {
                    eprintln!("[offscreen_cache] flip: {e}");
                }
            }

            _ => {}
        }
    });
}
