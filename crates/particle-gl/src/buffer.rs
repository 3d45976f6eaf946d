//! OpenGL buffer objects.

use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use anyhow::{bail, ensure, Result};
use gl::types::{GLbitfield, GLenum, GLintptr, GLsizeiptr, GLuint};
use particle_core::layout::{slice_as_bytes, AsBytes};
use tracing::{trace, warn};

/// An owned buffer object.
///
/// `target` is where the buffer is bound for uploads and mapping; it can
/// still be bound anywhere else with [`bind_as`](Self::bind_as) or
/// [`bind_base`](Self::bind_base).
#[derive(Debug)]
pub struct GpuBuffer {
    name: GLuint,
    target: GLenum,
    size: usize,
}

impl GpuBuffer {
    /// Allocate `size` bytes, optionally initialised from `data`.
    pub fn new(target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum) -> Result<Self> {
        ensure!(size > 0, "buffer size must be non-zero");
        if let Some(data) = data {
            ensure!(
                data.len() == size,
                "initial data is {} bytes, buffer is {size}",
                data.len()
            );
        }

        let mut name = 0;
        unsafe {
            gl::GenBuffers(1, &mut name);
            gl::BindBuffer(target, name);
            gl::BufferData(
                target,
                size as GLsizeiptr,
                data.map_or(std::ptr::null(), |d| d.as_ptr().cast()),
                usage,
            );
            gl::BindBuffer(target, 0);
        }
        if name == 0 {
            bail!("glGenBuffers returned no name");
        }

        trace!(name, target, size, "buffer created");
        Ok(Self { name, target, size })
    }

    /// A buffer holding exactly `values`.
    pub fn with_data<T: AsBytes>(target: GLenum, values: &[T], usage: GLenum) -> Result<Self> {
        let bytes = slice_as_bytes(values);
        Self::new(target, bytes.len(), Some(bytes), usage)
    }

    pub fn name(&self) -> GLuint {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bind(&self) {
        self.bind_as(self.target);
    }

    pub fn bind_as(&self, target: GLenum) {
        unsafe { gl::BindBuffer(target, self.name) };
    }

    /// Attach to indexed binding point `index` of `target`
    /// (`SHADER_STORAGE_BUFFER`, `UNIFORM_BUFFER`, ...).
    pub fn bind_base(&self, target: GLenum, index: u32) {
        unsafe { gl::BindBufferBase(target, index, self.name) };
    }

    /// Overwrite bytes starting at `offset`.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        check_range(offset, bytes.len(), self.size)?;
        unsafe {
            gl::BindBuffer(self.target, self.name);
            gl::BufferSubData(
                self.target,
                offset as GLintptr,
                bytes.len() as GLsizeiptr,
                bytes.as_ptr().cast(),
            );
            gl::BindBuffer(self.target, 0);
        }
        Ok(())
    }

    /// Read back one `u32` stored at `offset`. Blocks until the GPU has
    /// finished writing it.
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let mut value = [0u8; 4];
        check_range(offset, value.len(), self.size)?;
        unsafe {
            gl::BindBuffer(self.target, self.name);
            gl::GetBufferSubData(
                self.target,
                offset as GLintptr,
                value.len() as GLsizeiptr,
                value.as_mut_ptr().cast(),
            );
            gl::BindBuffer(self.target, 0);
        }
        Ok(u32::from_ne_bytes(value))
    }

    /// Copy the first `len` bytes of `source` over the start of `self`.
    pub fn copy_from(&self, source: &GpuBuffer, len: usize) -> Result<()> {
        check_range(0, len, source.size)?;
        check_range(0, len, self.size)?;
        unsafe {
            gl::BindBuffer(gl::COPY_READ_BUFFER, source.name);
            gl::BindBuffer(gl::COPY_WRITE_BUFFER, self.name);
            gl::CopyBufferSubData(gl::COPY_READ_BUFFER, gl::COPY_WRITE_BUFFER, 0, 0, len as GLsizeiptr);
            gl::BindBuffer(gl::COPY_READ_BUFFER, 0);
            gl::BindBuffer(gl::COPY_WRITE_BUFFER, 0);
        }
        Ok(())
    }

    /// Map the first `count` elements for writing. The previous contents of
    /// the range are discarded; the range is unmapped when the guard drops.
    pub fn map_write<T: AsBytes>(&self, count: usize) -> Result<MappedSlice<'_, T>> {
        let len = count * std::mem::size_of::<T>();
        check_range(0, len, self.size)?;
        ensure!(count > 0, "cannot map an empty range");

        let access: GLbitfield = gl::MAP_WRITE_BIT | gl::MAP_INVALIDATE_RANGE_BIT;
        let ptr = unsafe {
            gl::BindBuffer(self.target, self.name);
            gl::MapBufferRange(self.target, 0, len as GLsizeiptr, access)
        };
        if ptr.is_null() {
            unsafe { gl::BindBuffer(self.target, 0) };
            bail!("glMapBufferRange failed for buffer {} ({len} bytes)", self.name);
        }

        Ok(MappedSlice {
            buffer: self,
            ptr: ptr.cast(),
            count,
            _marker: PhantomData,
        })
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe { gl::DeleteBuffers(1, &self.name) };
        trace!(name = self.name, "buffer deleted");
    }
}

fn check_range(offset: usize, len: usize, size: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => bail!("range {offset}..{} exceeds buffer size {size}", offset.saturating_add(len)),
    }
}

/// A write-mapped buffer range viewed as `[T]`.
pub struct MappedSlice<'a, T> {
    buffer: &'a GpuBuffer,
    ptr: *mut T,
    count: usize,
    _marker: PhantomData<&'a mut [T]>,
}

impl<T> Deref for MappedSlice<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: the mapping covers `count` elements until unmapped in drop.
        unsafe { std::slice::from_raw_parts(self.ptr, self.count) }
    }
}

impl<T> DerefMut for MappedSlice<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.count) }
    }
}

impl<T> Drop for MappedSlice<'_, T> {
    fn drop(&mut self) {
        let target = self.buffer.target;
        let intact = unsafe {
            // Another buffer may have been bound to the target meanwhile.
            gl::BindBuffer(target, self.buffer.name);
            let intact = gl::UnmapBuffer(target);
            gl::BindBuffer(target, 0);
            intact
        };
        if intact == gl::FALSE {
            warn!(name = self.buffer.name, "buffer contents lost while mapped");
        }
    }
}
