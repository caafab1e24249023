//! Fixed-function material values.

/// RGBA color, each channel in `0.0..=1.0`.
pub type Color = [f32; 4];

/// Surface description referenced by name from mesh groups.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub emission: Color,
    pub shininess: f32,
    /// Identifier of the diffuse texture, resolved by the texture loader.
    pub diffuse_texture: Option<String>,
}

impl Default for Material {
    /// Classic fixed-function defaults: grey ambient/diffuse, no specular or emission.
    fn default() -> Self {
        Self {
            ambient: [0.2, 0.2, 0.2, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            emission: [0.0, 0.0, 0.0, 1.0],
            shininess: 0.0,
            diffuse_texture: None,
        }
    }
}

impl Material {
    pub fn with_diffuse(mut self, diffuse: Color) -> Self {
        self.diffuse = diffuse;
        self
    }

    pub fn with_specular(mut self, specular: Color, shininess: f32) -> Self {
        self.specular = specular;
        self.shininess = shininess;
        self
    }

    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.diffuse_texture = Some(texture.into());
        self
    }
}

/// Material stored under a name in a scene model.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedMaterial {
    pub name: String,
    pub material: Material,
}

impl NamedMaterial {
    pub fn new(name: impl Into<String>, material: Material) -> Self {
        Self {
            name: name.into(),
            material,
        }
    }
}

/// Quantize a color channel to `round(c × 255)`, clamping to the valid range.
#[inline]
pub fn quantize_channel(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
pub fn dequantize_channel(byte: u8) -> f32 {
    byte as f32 / 255.0
}
