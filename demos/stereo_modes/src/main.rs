//! Cycle through all stereo presentation modes with the space bar.
//!
//! The stimulus is a checkerboard with a central square carrying horizontal
//! disparity between the eyes, so every mode's geometry (and the anaglyph /
//! anticross composites) is easy to eyeball.

use binoc_core::StereoConfig;
use binoc_glow::{create_texture, PixelFormat, TexQuad};
use binoc_host_winit::WinitHost;
use binoc_modes::{Eye, StereoMode, StereoSettings, WindowGeometry};
use binoc_router::{StereoError, StereoRouter};

use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

const TEX_SIZE: i32 = 256;
const DISPARITY_PX: i32 = 6;

fn main() {
    if let Err(e) = run() {
        eprintln!("[stereo_modes] error: {e}");
        std::process::exit(1);
    }
}

/// Checkerboard with a brighter central square shifted by `shift` pixels.
/// The shift differs in sign between the eyes, giving the square crossed
/// disparity (it should float in front of the board when fused).
fn stimulus_pixels(size: i32, shift: i32) -> Vec<u8> {
    let mut px = Vec::with_capacity((size * size * 3) as usize);
    let third = size / 3;
    for y in 0..size {
        for x in 0..size {
            let checker = ((x / 32) + (y / 32)) % 2 == 0;
            let base: u8 = if checker { 40 } else { 90 };
            let in_square = (x - shift) >= third
                && (x - shift) < 2 * third
                && y >= third
                && y < 2 * third;
            let v = if in_square { 230 } else { base };
            px.extend_from_slice(&[v, v, v]);
        }
    }
    px
}

fn run() -> Result<(), StereoError> {
    let event_loop = EventLoop::new();
    let (mut host, gl) = WinitHost::new(&event_loop, "binoc: stereo modes", 960.0, 540.0)?;

    let cfg = StereoConfig {
        stereo_mode: "left-right-split".to_string(),
        cross_talk: [0.07, 0.07],
        ..StereoConfig::default()
    };
    let settings = StereoSettings::from_config(&cfg)?;
    let (w, h) = host.drawable_size();
    let geometry = WindowGeometry::new(w, h).with_config(&cfg);

    let mut router = unsafe { StereoRouter::new(&gl, settings, geometry)? };
    router.set_background([0.25, 0.25, 0.25]);
    router.set_flip_callback(Box::new(|eye| {
        // Shutter-goggle hook; a real rig toggles hardware here.
        let _ = eye;
    }));

    let quad = unsafe { TexQuad::new(&gl)? };
    let left_tex = unsafe {
        create_texture(
            &gl,
            TEX_SIZE,
            TEX_SIZE,
            PixelFormat::Rgb8,
            &stimulus_pixels(TEX_SIZE, DISPARITY_PX),
        )?
    };
    let right_tex = unsafe {
        create_texture(
            &gl,
            TEX_SIZE,
            TEX_SIZE,
            PixelFormat::Rgb8,
            &stimulus_pixels(TEX_SIZE, -DISPARITY_PX),
        )?
    };

    let mut mode_index = 0usize;
    eprintln!("[stereo_modes] mode: {}", StereoMode::ALL[mode_index].name());
    eprintln!("[stereo_modes] space = next mode, esc = quit");

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
                    VirtualKeyCode::Space => {
                        mode_index = (mode_index + 1) % StereoMode::ALL.len();
                        let mode = StereoMode::ALL[mode_index];
                        match unsafe { router.set_mode(&gl, mode) } {
                            Ok(()) => eprintln!("[stereo_modes] mode: {}", mode.name()),
                            Err(e) => eprintln!("[stereo_modes] set_mode failed: {e}"),
                        }
                    }
                    _ => {}
                },

                _ => {}
            },

            Event::MainEventsCleared => host.window.request_redraw(),

            Event::RedrawRequested(_) => {
                unsafe {
                    for (eye, tex) in [(Eye::Left, left_tex), (Eye::Right, right_tex)] {
                        router.set_buffer(&gl, eye, true);
                        quad.draw(&gl, tex, None, Some([-0.75, -0.75, 0.75, 0.75]));
                    }
                }

                // Dual-head reports a missing secondary output on this
                // single-window host after the primary present; keep
                // cycling anyway.
                if let Err(e) = unsafe { router.flip(&gl, &mut host) } {
                    eprintln!("[stereo_modes] flip: {e}");
                }
            }

            _ => {}
        }
    });
}
