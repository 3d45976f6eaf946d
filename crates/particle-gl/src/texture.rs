//! 2D sprite textures.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use gl::types::{GLint, GLuint};
use image::RgbaImage;
use tracing::debug;

#[derive(Debug)]
pub struct Texture {
    name: GLuint,
    width: u32,
    height: u32,
}

impl Texture {
    /// Decode an image file. Rows are flipped so UV (0, 0) is the
    /// bottom-left texel.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("loading texture {}", path.display()))?
            .flipv()
            .into_rgba8();
        debug!(path = %path.display(), width = image.width(), height = image.height(), "texture decoded");
        Self::from_image(&image)
    }

    pub fn from_image(image: &RgbaImage) -> Result<Self> {
        Self::from_rgba8(image.width(), image.height(), image.as_raw())
    }

    /// Upload tightly packed RGBA8 pixels and build mipmaps.
    pub fn from_rgba8(width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        ensure!(width > 0 && height > 0, "texture must not be empty");
        ensure!(
            pixels.len() == width as usize * height as usize * 4,
            "expected {} bytes of RGBA8 for {width}x{height}, got {}",
            width as usize * height as usize * 4,
            pixels.len()
        );

        let mut name = 0;
        unsafe {
            gl::GenTextures(1, &mut name);
            gl::BindTexture(gl::TEXTURE_2D, name);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::REPEAT as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::REPEAT as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR_MIPMAP_LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
            gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as GLint,
                width as GLint,
                height as GLint,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                pixels.as_ptr().cast(),
            );
            gl::GenerateMipmap(gl::TEXTURE_2D);
            gl::BindTexture(gl::TEXTURE_2D, 0);
        }

        Ok(Self { name, width, height })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bind to texture unit `unit`.
    pub fn bind(&self, unit: u32) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
            gl::BindTexture(gl::TEXTURE_2D, self.name);
        }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe { gl::DeleteTextures(1, &self.name) };
    }
}
