use std::fmt;
use std::path::PathBuf;

/// Engine-level errors used across binoc crates.
///
/// Contract rule: this type lives in `binoc-core` and can be re-exported by
/// backend crates.
#[derive(Debug)]
pub enum StereoError {
    // ---- Configuration / routing surface ----
    /// Unrecognized stereo mode name. Never coerced to a default mode:
    /// a silently substituted mode would corrupt the experiment's calibration.
    InvalidMode(String),

    /// Unrecognized eye selector name.
    InvalidEye(String),

    /// Unrecognized color channel name for the anaglyph mode.
    InvalidChannel(String),

    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A range check failed. `path` is set when the config came from a
    /// file; in-memory configs carry `None`.
    InvalidConfig {
        path: Option<PathBuf>,
        msg: String,
    },

    // ---- Offscreen cache state machine ----
    /// `bind()` while already bound (the cache is not reentrant).
    AlreadyBound,
    /// `unbind()` without a matching `bind()`.
    NotBound,
    /// `draw()` before any completed bind/unbind cycle.
    NotReady,

    // ---- Backend (GL) ----
    /// Pixel data does not match the declared texture format.
    UnsupportedFormat(String),
    VertexCompile(String),
    FragmentCompile(String),
    Link(String),
    /// GL object creation failed. Fatal: allocation failure indicates
    /// resource exhaustion or driver failure and is not retried.
    GlCreate(String),

    // ---- Fallback ----
    Other(String),
}

impl StereoError {
    pub fn other<T: Into<String>>(s: T) -> Self {
        StereoError::Other(s.into())
    }
}

impl fmt::Display for StereoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StereoError::InvalidMode(name) => write!(f, "unknown stereo mode '{name}'"),
            StereoError::InvalidEye(name) => write!(f, "unknown eye buffer '{name}'"),
            StereoError::InvalidChannel(name) => write!(f, "unknown color channel '{name}'"),
            StereoError::Io { path, source } => {
                write!(f, "io error at {}: {}", path.display(), source)
            }
            StereoError::Json { path, source } => {
                write!(f, "json parse error at {}: {}", path.display(), source)
            }
            StereoError::InvalidConfig { path: Some(path), msg } => {
                write!(f, "invalid config at {}: {}", path.display(), msg)
            }
            StereoError::InvalidConfig { path: None, msg } => {
                write!(f, "invalid config: {msg}")
            }

            StereoError::AlreadyBound => write!(f, "offscreen cache is already bound"),
            StereoError::NotBound => write!(f, "offscreen cache is not bound"),
            StereoError::NotReady => {
                write!(f, "offscreen cache drawn before a completed bind/unbind cycle")
            }

            StereoError::UnsupportedFormat(msg) => write!(f, "unsupported pixel format: {msg}"),
            StereoError::VertexCompile(msg) => write!(f, "vertex shader compile error: {msg}"),
            StereoError::FragmentCompile(msg) => write!(f, "fragment shader compile error: {msg}"),
            StereoError::Link(msg) => write!(f, "program link error: {msg}"),
            StereoError::GlCreate(msg) => write!(f, "backend object creation failed: {msg}"),

            StereoError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for StereoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StereoError::Io { source, .. } => Some(source),
            StereoError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
