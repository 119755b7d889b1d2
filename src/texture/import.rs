use crate::um_error::UmError;
use image::io::Reader;
use log::info;
use std::path::Path;

/// Pixel formats a backend must accept for uploaded textures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Colour data such as diffuse maps and glyph atlases
    Rgba8Srgb,
    /// Non colour data such as normal maps
    Rgba8Unorm,
    Rgba32Float,
}

impl TextureFormat {
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8Srgb | Self::Rgba8Unorm => 4,
            Self::Rgba32Float => 16,
        }
    }
}

/// Decoded pixels ready for upload. Rows are tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// A 1x1 texture of one colour
    #[must_use]
    pub fn solid(rgba: [u8; 4], format: TextureFormat) -> Self {
        Self {
            width: 1,
            height: 1,
            format,
            pixels: rgba.to_vec(),
        }
    }

    /// # Errors
    /// May return `UmError`
    pub fn from_f32(
        width: u32,
        height: u32,
        texels: &[[f32; 4]],
    ) -> Result<Self, UmError> {
        if texels.len() != (width * height) as usize {
            return Err(UmError::invalid_parameter(
                format!(
                    "{} texels for a {width}x{height} texture",
                    texels.len()
                ),
                "TextureData::from_f32",
            ));
        }
        Ok(Self {
            width,
            height,
            format: TextureFormat::Rgba32Float,
            pixels: bytemuck::cast_slice(texels).to_vec(),
        })
    }

    /// Checks the pixel buffer matches the dimensions and format
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.pixels.len()
            == self.width as usize
                * self.height as usize
                * self.format.bytes_per_pixel()
    }
}

/// Decodes an image file to RGBA8
///
/// # Errors
/// May return `UmError`
pub fn load(
    path: &Path,
    format: TextureFormat,
) -> Result<TextureData, UmError> {
    if !path.exists() {
        return Err(UmError::file_not_found(
            format!("texture '{}' not found", path.display()),
            "texture::load",
        ));
    }
    let image = Reader::open(path)?.decode()?.into_rgba8();
    let (width, height) = image.dimensions();
    info!("{} texture loaded w: {width}, h: {height}", path.display());
    Ok(TextureData {
        width,
        height,
        format,
        pixels: image.into_raw(),
    })
}

/// Decodes an image held in memory to RGBA8
///
/// # Errors
/// May return `UmError`
pub fn from_bytes(
    bytes: &[u8],
    format: TextureFormat,
) -> Result<TextureData, UmError> {
    let image = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = image.dimensions();
    Ok(TextureData {
        width,
        height,
        format,
        pixels: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::um_error::ErrorKind;

    #[test]
    fn missing_file_is_file_not_found() {
        let path = Path::new("no/such/texture.png");
        let e = load(path, TextureFormat::Rgba8Srgb).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn float_texels_must_fill_the_texture() {
        let texels = [[0.0_f32; 4]; 16];
        let data = TextureData::from_f32(4, 4, &texels).unwrap();
        assert!(data.is_consistent());
        assert_eq!(data.pixels.len(), 256);
        let e = TextureData::from_f32(4, 3, &texels).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn garbage_bytes_are_a_resource_error() {
        let e = from_bytes(b"not an image", TextureFormat::Rgba8Srgb)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::ResourceError);
    }
}
