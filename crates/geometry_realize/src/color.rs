//! Color types stored in attributes.
//!
//! `ColorGeometry4f` holds linear float channels. `ColorGeometry4b` holds
//! sRGB encoded bytes with a linear alpha byte.

/// Linear RGBA color with float channels.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorGeometry4f {
  pub r: f32,
  pub g: f32,
  pub b: f32,
  pub a: f32,
}

impl Default for ColorGeometry4f {
  fn default() -> Self {
    Self::new(0.0, 0.0, 0.0, 0.0)
  }
}

impl ColorGeometry4f {
  #[inline]
  pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
    Self { r, g, b, a }
  }

  /// Gray color with opaque alpha.
  #[inline]
  pub const fn gray(value: f32) -> Self {
    Self::new(value, value, value, 1.0)
  }

  /// Luma weighted gray value of the RGB channels.
  #[inline]
  pub fn grayscale(&self) -> f32 {
    0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
  }

  /// Encode to sRGB bytes. Alpha is stored linearly.
  pub fn encode(&self) -> ColorGeometry4b {
    ColorGeometry4b {
      r: unit_float_to_byte(linear_to_srgb(self.r)),
      g: unit_float_to_byte(linear_to_srgb(self.g)),
      b: unit_float_to_byte(linear_to_srgb(self.b)),
      a: unit_float_to_byte(self.a),
    }
  }
}

/// sRGB encoded RGBA color with byte channels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorGeometry4b {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl ColorGeometry4b {
  #[inline]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// Decode to linear float channels.
  pub fn decode(&self) -> ColorGeometry4f {
    ColorGeometry4f {
      r: srgb_to_linear(self.r as f32 / 255.0),
      g: srgb_to_linear(self.g as f32 / 255.0),
      b: srgb_to_linear(self.b as f32 / 255.0),
      a: self.a as f32 / 255.0,
    }
  }
}

/// Linear to sRGB transfer function for one channel.
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
  if c < 0.003_130_8 {
    if c < 0.0 {
      0.0
    } else {
      c * 12.92
    }
  } else {
    1.055 * c.powf(1.0 / 2.4) - 0.055
  }
}

/// sRGB to linear transfer function for one channel.
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
  if c < 0.040_45 {
    if c < 0.0 {
      0.0
    } else {
      c * (1.0 / 12.92)
    }
  } else {
    ((c + 0.055) * (1.0 / 1.055)).powf(2.4)
  }
}

#[inline]
fn unit_float_to_byte(value: f32) -> u8 {
  if value <= 0.0 {
    0
  } else if value > 1.0 - 0.5 / 255.0 {
    255
  } else {
    (255.0 * value + 0.5) as u8
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_encode_extremes() {
    let white = ColorGeometry4f::new(1.0, 1.0, 1.0, 1.0).encode();
    assert_eq!(white, ColorGeometry4b::new(255, 255, 255, 255));

    let black = ColorGeometry4f::new(0.0, 0.0, 0.0, 0.0).encode();
    assert_eq!(black, ColorGeometry4b::new(0, 0, 0, 0));

    // Out of range input clamps.
    let clamped = ColorGeometry4f::new(-1.0, 2.0, 0.0, 5.0).encode();
    assert_eq!(clamped, ColorGeometry4b::new(0, 255, 0, 255));
  }

  #[test]
  fn test_byte_roundtrip_is_stable() {
    for value in [0u8, 1, 17, 64, 128, 200, 254, 255] {
      let color = ColorGeometry4b::new(value, value, value, value);
      assert_eq!(color.decode().encode(), color);
    }
  }

  #[test]
  fn test_mid_gray_is_gamma_encoded() {
    // Linear 0.5 lands well above byte 128 in sRGB.
    let encoded = ColorGeometry4f::gray(0.5).encode();
    assert_eq!(encoded.r, 188);
    assert_eq!(encoded.a, 255);
  }

  #[test]
  fn test_grayscale_weights_sum_to_one() {
    let white = ColorGeometry4f::gray(1.0);
    assert!((white.grayscale() - 1.0).abs() < 1e-6);

    let green = ColorGeometry4f::new(0.0, 1.0, 0.0, 1.0);
    assert!(green.grayscale() > ColorGeometry4f::new(1.0, 0.0, 0.0, 1.0).grayscale());
  }
}
