//! Driver diagnostics routed into `tracing`.

use std::ffi::{c_void, CStr};

use anyhow::{bail, Result};
use gl::types::{GLchar, GLenum, GLsizei, GLuint};
use tracing::{debug, error, info, warn};

fn source_name(source: GLenum) -> &'static str {
    match source {
        gl::DEBUG_SOURCE_API => "api",
        gl::DEBUG_SOURCE_WINDOW_SYSTEM => "window-system",
        gl::DEBUG_SOURCE_SHADER_COMPILER => "shader-compiler",
        gl::DEBUG_SOURCE_THIRD_PARTY => "third-party",
        gl::DEBUG_SOURCE_APPLICATION => "application",
        _ => "other",
    }
}

fn type_name(kind: GLenum) -> &'static str {
    match kind {
        gl::DEBUG_TYPE_ERROR => "error",
        gl::DEBUG_TYPE_DEPRECATED_BEHAVIOR => "deprecated",
        gl::DEBUG_TYPE_UNDEFINED_BEHAVIOR => "undefined-behaviour",
        gl::DEBUG_TYPE_PORTABILITY => "portability",
        gl::DEBUG_TYPE_PERFORMANCE => "performance",
        gl::DEBUG_TYPE_MARKER => "marker",
        _ => "other",
    }
}

fn error_name(code: GLenum) -> &'static str {
    match code {
        gl::INVALID_ENUM => "GL_INVALID_ENUM",
        gl::INVALID_VALUE => "GL_INVALID_VALUE",
        gl::INVALID_OPERATION => "GL_INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        _ => "unknown GL error",
    }
}

extern "system" fn on_debug_message(
    source: GLenum,
    kind: GLenum,
    id: GLuint,
    severity: GLenum,
    length: GLsizei,
    message: *const GLchar,
    _user: *mut c_void,
) {
    if message.is_null() {
        return;
    }
    let text = if length >= 0 {
        // SAFETY: the driver passes `length` valid bytes.
        let bytes = unsafe { std::slice::from_raw_parts(message as *const u8, length as usize) };
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
    };

    let source = source_name(source);
    let kind = type_name(kind);
    match severity {
        gl::DEBUG_SEVERITY_HIGH => error!(target: "gl", source, kind, id, "{text}"),
        gl::DEBUG_SEVERITY_MEDIUM => warn!(target: "gl", source, kind, id, "{text}"),
        gl::DEBUG_SEVERITY_LOW => info!(target: "gl", source, kind, id, "{text}"),
        _ => debug!(target: "gl", source, kind, id, "{text}"),
    }
}

/// Install the debug message callback when the context supports it.
/// Returns whether it was installed.
pub fn install_debug_output() -> bool {
    if !gl::DebugMessageCallback::is_loaded() {
        debug!("debug output unavailable");
        return false;
    }
    unsafe {
        gl::Enable(gl::DEBUG_OUTPUT);
        gl::Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS);
        gl::DebugMessageCallback(Some(on_debug_message), std::ptr::null());
    }
    debug!("debug output installed");
    true
}

/// Drain the GL error queue, logging each entry. Returns how many were
/// pending.
pub fn drain_errors(during: &str) -> usize {
    let mut count = 0;
    loop {
        let code = unsafe { gl::GetError() };
        if code == gl::NO_ERROR {
            break count;
        }
        warn!(during, "{}", error_name(code));
        count += 1;
    }
}

/// Fail if GL reported any error.
pub fn check_errors(during: &str) -> Result<()> {
    let code = unsafe { gl::GetError() };
    if code == gl::NO_ERROR {
        return Ok(());
    }
    let extra = drain_errors(during);
    bail!("{} during {during} ({extra} more pending)", error_name(code));
}
