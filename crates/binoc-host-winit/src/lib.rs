//! Host glue (policy layer): winit window + glutin GL context construction
//! and the [`PresentHost`] implementation.
//!
//! Kept separate from the router so the rendering crates stay embed-friendly
//! for callers that bring their own window.

use std::num::NonZeroU32;
use std::time::Instant;

use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use raw_window_handle::HasRawWindowHandle;
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use binoc_router::{EyeFrame, PresentHost, StereoError};

/// Everything a demo needs to start drawing: the window, its current GL
/// context/surface, and a loaded glow context.
pub struct WinitHost {
    pub window: winit::window::Window,
    gl_surface: glutin::surface::Surface<glutin::surface::WindowSurface>,
    gl_context: glutin::context::PossiblyCurrentContext,
    start: Instant,
}

impl std::fmt::Debug for WinitHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinitHost").finish_non_exhaustive()
    }
}

impl WinitHost {
    /// Build a window plus a current core-profile GL context on it, and
    /// load the GL function pointers.
    pub fn new(
        event_loop: &EventLoop<()>,
        title: &str,
        width: f64,
        height: f64,
    ) -> Result<(Self, glow::Context), StereoError> {
        let window_builder = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let template = glutin::config::ConfigTemplateBuilder::new().with_alpha_size(8);

        let display_builder =
            glutin_winit::DisplayBuilder::new().with_window_builder(Some(window_builder));

        let (window, gl_config) = display_builder
            .build(event_loop, template, |mut configs| {
                configs.next().expect("at least one GL config")
            })
            .map_err(|e| StereoError::GlCreate(format!("DisplayBuilder.build: {e}")))?;

        let window = window
            .ok_or_else(|| StereoError::GlCreate("DisplayBuilder did not create a window".into()))?;
        let gl_display = gl_config.display();

        let raw_window_handle = window.raw_window_handle();

        let context_attributes = glutin::context::ContextAttributesBuilder::new()
            .with_profile(glutin::context::GlProfile::Core)
            .build(Some(raw_window_handle));

        let not_current_gl_context = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .map_err(|e| StereoError::GlCreate(format!("create_context: {e}")))?
        };

        let size = window.inner_size();
        let attrs =
            glutin::surface::SurfaceAttributesBuilder::<glutin::surface::WindowSurface>::new()
                .build(
                    raw_window_handle,
                    NonZeroU32::new(size.width.max(1)).expect("nonzero width"),
                    NonZeroU32::new(size.height.max(1)).expect("nonzero height"),
                );

        let gl_surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .map_err(|e| StereoError::GlCreate(format!("create_window_surface: {e}")))?
        };

        let gl_context = not_current_gl_context
            .make_current(&gl_surface)
            .map_err(|e| StereoError::GlCreate(format!("make_current: {e}")))?;

        let gl = unsafe {
            glow::Context::from_loader_function(|s| {
                gl_display.get_proc_address(
                    std::ffi::CString::new(s).expect("proc name").as_c_str(),
                ) as *const _
            })
        };

        Ok((
            Self {
                window,
                gl_surface,
                gl_context,
                start: Instant::now(),
            },
            gl,
        ))
    }

    /// Drawable size in physical pixels, never zero.
    pub fn drawable_size(&self) -> (i32, i32) {
        let s = self.window.inner_size();
        (s.width.max(1) as i32, s.height.max(1) as i32)
    }

    /// Resize the GL surface with the window.
    pub fn resize_surface(&self, width: u32, height: u32) {
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.gl_surface.resize(&self.gl_context, w, h);
        }
    }

    /// Seconds elapsed on the host's monotonic clock.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl PresentHost for WinitHost {
    fn present(&mut self) -> Result<f64, StereoError> {
        self.gl_surface
            .swap_buffers(&self.gl_context)
            .map_err(|e| StereoError::other(format!("swap_buffers: {e}")))?;
        Ok(self.elapsed())
    }

    fn present_secondary(&mut self, frame: &EyeFrame) -> Result<(), StereoError> {
        // Single-output host. Dual-head rigs wrap a second window/surface
        // and blit the frame there.
        let _ = frame;
        Err(StereoError::other(
            "dual-head needs a host with a secondary output",
        ))
    }
}
