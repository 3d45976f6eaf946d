//! Shader compilation, program linking and cached uniform access.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::CString;

use anyhow::{bail, Context, Result};
use gl::types::{GLchar, GLenum, GLint, GLuint};
use glam::{Mat4, Vec2};
use tracing::{debug, warn};

/// A value that can be written to a uniform location of the bound program.
pub trait Uniform {
    /// # Safety
    ///
    /// The program owning `location` must be current.
    unsafe fn apply(&self, location: GLint);
}

impl Uniform for f32 {
    unsafe fn apply(&self, location: GLint) {
        gl::Uniform1f(location, *self);
    }
}

impl Uniform for i32 {
    unsafe fn apply(&self, location: GLint) {
        gl::Uniform1i(location, *self);
    }
}

impl Uniform for u32 {
    unsafe fn apply(&self, location: GLint) {
        gl::Uniform1ui(location, *self);
    }
}

impl Uniform for Vec2 {
    unsafe fn apply(&self, location: GLint) {
        gl::Uniform2f(location, self.x, self.y);
    }
}

impl Uniform for Mat4 {
    unsafe fn apply(&self, location: GLint) {
        gl::UniformMatrix4fv(location, 1, gl::FALSE, self.as_ref().as_ptr());
    }
}

fn info_log(object: GLuint, is_program: bool) -> String {
    let mut len: GLint = 0;
    unsafe {
        if is_program {
            gl::GetProgramiv(object, gl::INFO_LOG_LENGTH, &mut len);
        } else {
            gl::GetShaderiv(object, gl::INFO_LOG_LENGTH, &mut len);
        }
    }
    if len <= 0 {
        return String::new();
    }

    let mut buf = vec![0u8; len as usize];
    let mut written: GLint = 0;
    unsafe {
        if is_program {
            gl::GetProgramInfoLog(object, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
        } else {
            gl::GetShaderInfoLog(object, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
        }
    }
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).trim_end().to_owned()
}

fn stage_name(kind: GLenum) -> &'static str {
    match kind {
        gl::VERTEX_SHADER => "vertex",
        gl::FRAGMENT_SHADER => "fragment",
        gl::COMPUTE_SHADER => "compute",
        _ => "unknown",
    }
}

/// Compile one shader stage.
pub fn compile(kind: GLenum, source: &str) -> Result<GLuint> {
    let source = CString::new(source).context("shader source contains a NUL byte")?;

    unsafe {
        let shader = gl::CreateShader(kind);
        if shader == 0 {
            bail!("glCreateShader failed for the {} stage", stage_name(kind));
        }
        gl::ShaderSource(shader, 1, &source.as_ptr(), std::ptr::null());
        gl::CompileShader(shader);

        let mut status: GLint = 0;
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
        let log = info_log(shader, false);

        if status == 0 {
            gl::DeleteShader(shader);
            bail!("{} shader failed to compile:\n{log}", stage_name(kind));
        }
        if !log.is_empty() {
            warn!(stage = stage_name(kind), "shader compiler: {log}");
        }
        Ok(shader)
    }
}

/// Link compiled stages into a program. The stages are deleted either way.
pub fn link(shaders: &[GLuint]) -> Result<GLuint> {
    unsafe {
        let program = gl::CreateProgram();
        for &shader in shaders {
            gl::AttachShader(program, shader);
        }
        gl::LinkProgram(program);
        for &shader in shaders {
            gl::DetachShader(program, shader);
            gl::DeleteShader(shader);
        }

        let mut status: GLint = 0;
        gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
        if status == 0 {
            let log = info_log(program, true);
            gl::DeleteProgram(program);
            bail!("program failed to link:\n{log}");
        }
        Ok(program)
    }
}

/// A linked program with a per-name uniform location cache.
#[derive(Debug)]
pub struct Program {
    id: GLuint,
    locations: RefCell<HashMap<String, GLint>>,
}

impl Program {
    fn from_stages(stages: &[(GLenum, &str)]) -> Result<Self> {
        let mut shaders = Vec::with_capacity(stages.len());
        for &(kind, source) in stages {
            match compile(kind, source) {
                Ok(shader) => shaders.push(shader),
                Err(err) => {
                    for shader in shaders {
                        unsafe { gl::DeleteShader(shader) };
                    }
                    return Err(err);
                }
            }
        }
        let id = link(&shaders)?;
        debug!(id, "program linked");
        Ok(Self {
            id,
            locations: RefCell::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> GLuint {
        self.id
    }

    pub fn bind(&self) {
        unsafe { gl::UseProgram(self.id) };
    }

    /// Location of the active uniform `name`. Unknown names are an error.
    pub fn uniform_location(&self, name: &str) -> Result<GLint> {
        if let Some(&location) = self.locations.borrow().get(name) {
            return Ok(location);
        }

        let c_name = CString::new(name).with_context(|| format!("uniform name {name:?} contains a NUL byte"))?;
        let location = active_location(self.id, name, unsafe { gl::GetUniformLocation(self.id, c_name.as_ptr()) })?;
        self.locations.borrow_mut().insert(name.to_owned(), location);
        Ok(location)
    }

    /// Set a uniform on this program. The program must be bound.
    pub fn set<U: Uniform>(&self, name: &str, value: U) -> Result<()> {
        let location = self.uniform_location(name)?;
        unsafe { value.apply(location) };
        Ok(())
    }
}

/// `GetUniformLocation` answers -1 for names the linked program lacks.
fn active_location(program: GLuint, name: &str, location: GLint) -> Result<GLint> {
    if location < 0 {
        bail!("uniform {name:?} not found in program {program}");
    }
    Ok(location)
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe { gl::DeleteProgram(self.id) };
    }
}

/// Vertex + fragment program.
#[derive(Debug)]
pub struct ShaderProgram(Program);

impl ShaderProgram {
    pub fn new(vertex: &str, fragment: &str) -> Result<Self> {
        Program::from_stages(&[(gl::VERTEX_SHADER, vertex), (gl::FRAGMENT_SHADER, fragment)])
            .map(Self)
            .context("building the particle render program")
    }
}

impl std::ops::Deref for ShaderProgram {
    type Target = Program;

    fn deref(&self) -> &Program {
        &self.0
    }
}

/// Single-stage compute program.
#[derive(Debug)]
pub struct ComputeProgram(Program);

impl ComputeProgram {
    pub fn new(source: &str) -> Result<Self> {
        Program::from_stages(&[(gl::COMPUTE_SHADER, source)])
            .map(Self)
            .context("building the particle compute program")
    }

    /// Dispatch `groups` work groups along x. The program must be bound.
    pub fn dispatch(&self, groups: u32) {
        if groups > 0 {
            unsafe { gl::DispatchCompute(groups, 1, 1) };
        }
    }
}

impl std::ops::Deref for ComputeProgram {
    type Target = Program;

    fn deref(&self) -> &Program {
        &self.0
    }
}
