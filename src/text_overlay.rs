//! Screen space text and GUI elements for the overlay pass
//!
//! Coordinates are window pixels with the origin at the bottom left. Glyph
//! metrics come from a YAML file rendered offline next to a PNG atlas, both
//! named after the configured font.
use crate::{
    renderer::{RenderBackend, Renderer, TextureRef},
    shader::{uniforms, ProgramId},
    texture::{self, TextureFormat},
    types::TextureId,
    um_error::UmError,
    vertex::OverlayVertex,
};
use ahash::AHashMap;
use log::info;
use nalgebra_glm as glm;
use serde::Deserialize;
use std::path::Path;

/// Directory holding `<font>.yaml` and `<font>.png`
pub const FONT_DIR: &str = "resources/fonts/";

/// Metrics for one glyph in pixels at the atlas size. `advance` is in
/// 1/64 pixel units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Glyph {
    pub size: [i32; 2],
    pub bearing: [i32; 2],
    pub advance: u32,
    /// Atlas rectangle as `[u0, v0, u1, v1]` with `v0` at the glyph top
    pub uv: [f32; 4],
}

#[derive(Deserialize)]
struct Metrics {
    glyphs: Vec<GlyphEntry>,
}

#[derive(Deserialize)]
struct GlyphEntry {
    #[serde(rename = "char")]
    c: char,
    #[serde(flatten)]
    glyph: Glyph,
}

/// Glyph metrics plus the uploaded atlas texture
#[derive(Clone, Debug)]
pub struct GlyphAtlas {
    glyphs: AHashMap<char, Glyph>,
    texture: TextureId,
}

impl GlyphAtlas {
    /// Loads `<dir>/<font>.yaml` and uploads `<dir>/<font>.png`
    ///
    /// # Errors
    /// May return `UmError`
    pub fn load<B: RenderBackend>(
        dir: &Path,
        font: &str,
        renderer: &mut Renderer<B>,
    ) -> Result<Self, UmError> {
        let metrics_path = dir.join(format!("{font}.yaml"));
        if !metrics_path.exists() {
            return Err(UmError::file_not_found(
                format!("font '{}' not found", metrics_path.display()),
                "GlyphAtlas::load",
            ));
        }
        let metrics = std::fs::read_to_string(&metrics_path)?;
        let png = dir.join(format!("{font}.png"));
        let data = texture::load(&png, TextureFormat::Rgba8Unorm)?;
        let id = renderer.insert_texture(&format!("<font {font}>"), &data)?;
        let atlas = Self::from_metrics(&metrics, id)?;
        info!("Font '{}' loaded with {} glyphs", font, atlas.glyphs.len());
        Ok(atlas)
    }

    /// # Errors
    /// May return `UmError`
    pub fn from_metrics(
        yaml: &str,
        texture: TextureId,
    ) -> Result<Self, UmError> {
        let metrics: Metrics = serde_yaml::from_str(yaml)?;
        let glyphs = metrics.glyphs.into_iter().map(|e| (e.c, e.glyph));
        Ok(Self {
            glyphs: glyphs.collect(),
            texture,
        })
    }

    /// Metrics for a character. Characters missing from the atlas have
    /// zero size and advance.
    #[must_use]
    pub fn glyph(&self, c: char) -> Glyph {
        self.glyphs.get(&c).copied().unwrap_or_default()
    }

    #[must_use]
    pub const fn texture(&self) -> TextureId {
        self.texture
    }
}

/// Two triangles covering `[x0, x1] x [y0, y1]`
#[must_use]
pub fn quad(
    min: [f32; 2],
    max: [f32; 2],
    uv: [f32; 4],
    colour: [f32; 4],
) -> [OverlayVertex; 6] {
    let v = |x, y, u, w| OverlayVertex {
        position: [x, y],
        tex_coord: [u, w],
        colour,
    };
    let [u0, v0, u1, v1] = uv;
    let top_left = v(min[0], max[1], u0, v0);
    let bottom_right = v(max[0], min[1], u1, v1);
    [
        top_left,
        v(min[0], min[1], u0, v1),
        bottom_right,
        top_left,
        bottom_right,
        v(max[0], max[1], u1, v0),
    ]
}

/// Orthographic projection for window pixels with the origin at the
/// bottom left
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn overlay_projection(dimensions: [u32; 2]) -> glm::Mat4 {
    let (w, h) = (dimensions[0] as f32, dimensions[1] as f32);
    // Vulkan puts NDC -1 at the top, so bottom and top swap
    glm::ortho_rh_zo(0.0, w, h, 0.0, -1.0, 1.0)
}

/// A line of text at a baseline position
#[derive(Clone, Debug, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub colour: glm::Vec3,
    pub scale: f32,
}

impl TextOverlay {
    #[must_use]
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            colour: glm::vec3(1.0, 1.0, 1.0),
            scale: 1.0,
        }
    }

    #[must_use]
    pub const fn with_colour(mut self, colour: glm::Vec3) -> Self {
        self.colour = colour;
        self
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Quads for every glyph, six vertices each
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn quads(&self, atlas: &GlyphAtlas) -> Vec<OverlayVertex> {
        let s = self.scale;
        let mut x = self.x;
        let mut out = Vec::with_capacity(self.text.len() * 6);
        for c in self.text.chars() {
            let g = atlas.glyph(c);
            let xpos = (g.bearing[0] as f32).mul_add(s, x);
            let ypos = self.y - (g.size[1] - g.bearing[1]) as f32 * s;
            let w = g.size[0] as f32 * s;
            let h = g.size[1] as f32 * s;
            if w > 0.0 && h > 0.0 {
                out.extend(quad(
                    [xpos, ypos],
                    [xpos + w, ypos + h],
                    g.uv,
                    [1.0; 4],
                ));
            }
            x += (g.advance >> 6) as f32 * s;
        }
        out
    }

    /// Width of the text and the height of its last glyph
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn size_hint(&self, atlas: &GlyphAtlas) -> glm::Vec2 {
        let mut size = glm::Vec2::zeros();
        for c in self.text.chars() {
            let g = atlas.glyph(c);
            size.y = (g.size[1] as f32 * self.scale).max(0.0);
            size.x += (g.advance >> 6) as f32 * self.scale;
        }
        size
    }

    /// # Errors
    /// May return `UmError`
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
    ) -> Result<(), UmError> {
        let Some(atlas) = renderer.glyphs() else {
            return Err(UmError::invalid_state(
                "text drawn before a font was loaded",
                "TextOverlay::draw",
            ));
        };
        let vertices = self.quads(atlas);
        let texture = atlas.texture();
        if vertices.is_empty() {
            return Ok(());
        }
        renderer.use_program(ProgramId::TextOverlay);
        renderer.uniform(uniforms::U_TEXT_COLOR, self.colour);
        renderer
            .bind_texture(uniforms::U_GLYPHS, TextureRef::Texture(texture));
        renderer.draw_overlay_quads(vertices)
    }
}

/// A rectangle in window pixels, optionally textured, optionally with a
/// centred caption
#[derive(Clone, Debug, PartialEq)]
pub struct GuiElement {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub colour: [f32; 4],
    /// Texture file name, or `None` for a flat colour
    pub background: Option<String>,
    pub caption: Option<TextOverlay>,
}

impl GuiElement {
    #[must_use]
    pub const fn panel(
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        colour: [f32; 4],
    ) -> Self {
        Self {
            left,
            top,
            width,
            height,
            colour,
            background: None,
            caption: None,
        }
    }

    /// A transparent element showing only its caption
    #[must_use]
    pub fn label(
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            caption: Some(TextOverlay::new(caption, 0.0, 0.0)),
            ..Self::panel(left, top, width, height, [0.0; 4])
        }
    }

    #[must_use]
    pub fn with_background(mut self, texture: impl Into<String>) -> Self {
        self.background = Some(texture.into());
        self.colour = [1.0; 4];
        self
    }

    /// Caption moved to the centre of the element
    #[must_use]
    pub fn placed_caption(&self, atlas: &GlyphAtlas) -> Option<TextOverlay> {
        self.caption.as_ref().map(|text| {
            let size = text.size_hint(atlas);
            TextOverlay {
                x: (self.width - size.x) / 2.0 + self.left,
                y: self.top - (self.height - size.y) / 2.0 - size.y,
                ..text.clone()
            }
        })
    }

    /// # Errors
    /// May return `UmError`
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
    ) -> Result<(), UmError> {
        if self.colour[3] > 0.0 {
            let texture = match &self.background {
                Some(name) => {
                    renderer.load_texture(name, TextureFormat::Rgba8Srgb)?
                }
                None => renderer.white_texture(),
            };
            renderer.use_program(ProgramId::Gui);
            renderer.bind_texture(
                uniforms::U_TEXTURE,
                TextureRef::Texture(texture),
            );
            let rect = quad(
                [self.left, self.top - self.height],
                [self.left + self.width, self.top],
                [0.0, 0.0, 1.0, 1.0],
                self.colour,
            );
            renderer.draw_overlay_quads(rect.to_vec())?;
        }
        let caption = renderer.glyphs().and_then(|a| self.placed_caption(a));
        match caption {
            Some(text) => text.draw(renderer),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    const METRICS: &str = "
glyphs:
  - { char: 'A', size: [10, 12], bearing: [1, 12], advance: 768,
      uv: [0.0, 0.0, 0.5, 0.5] }
  - { char: 'g', size: [8, 12], bearing: [0, 8], advance: 640,
      uv: [0.5, 0.0, 1.0, 0.5] }
  - { char: ' ', size: [0, 0], bearing: [0, 0], advance: 384,
      uv: [0.0, 0.0, 0.0, 0.0] }
";

    fn atlas() -> GlyphAtlas {
        GlyphAtlas::from_metrics(METRICS, TextureId(0)).unwrap()
    }

    #[test]
    fn layout_uses_bearing_and_advance() {
        let text = TextOverlay::new("Ag", 100.0, 50.0).with_scale(2.0);
        let v = text.quads(&atlas());
        assert_eq!(v.len(), 12);
        // 'A': xpos = 100 + 1*2, ypos = 50 - (12 - 12)*2
        assert!((v[1].position[0] - 102.0).abs() < EPSILON);
        assert!((v[1].position[1] - 50.0).abs() < EPSILON);
        // 'g' starts 12 pixels on and hangs 4*2 below the baseline
        assert!((v[7].position[0] - 124.0).abs() < EPSILON);
        assert!((v[7].position[1] - 42.0).abs() < EPSILON);
        assert_eq!(v[6].tex_coord, [0.5, 0.0]);
    }

    #[test]
    fn size_hint_is_advance_and_last_height() {
        let size = TextOverlay::new("A A", 0.0, 0.0).size_hint(&atlas());
        assert!((size.x - 30.0).abs() < EPSILON);
        assert!((size.y - 12.0).abs() < EPSILON);
        let size = TextOverlay::new("A ", 0.0, 0.0).size_hint(&atlas());
        assert!(size.y.abs() < EPSILON);
        let size = TextOverlay::new("gA", 0.0, 0.0).size_hint(&atlas());
        assert!((size.y - 12.0).abs() < EPSILON);
    }

    #[test]
    fn unknown_characters_take_no_space() {
        let v = TextOverlay::new("A?A", 0.0, 0.0).quads(&atlas());
        assert_eq!(v.len(), 12);
        assert!((v[7].position[0] - 13.0).abs() < EPSILON);
    }

    #[test]
    fn caption_is_centred() {
        let label = GuiElement::label(10.0, 100.0, 50.0, 20.0, "A");
        let text = label.placed_caption(&atlas()).unwrap();
        assert!((text.x - 29.0).abs() < EPSILON);
        assert!((text.y - 84.0).abs() < EPSILON);
    }

    #[test]
    fn projection_maps_corners() {
        let p = overlay_projection([800, 600]);
        let bottom_left = p * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert!((bottom_left.x + 1.0).abs() < EPSILON);
        assert!((bottom_left.y - 1.0).abs() < EPSILON);
        let top_right = p * glm::vec4(800.0, 600.0, 0.0, 1.0);
        assert!((top_right.y + 1.0).abs() < EPSILON);
    }
}
