use crate::error::ViewerError;

/// Largest edge accepted for a displayable bitmap (default wgpu 2D texture limit)
pub const MAX_DIMENSION: u32 = 8192;

/// 8-bit channel layouts accepted from frame producers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Gray),
            2 => Some(PixelFormat::GrayAlpha),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::GrayAlpha => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Frame - row-major, top-to-bottom pixel buffer as handed over by a producer
///
/// Nothing is validated at construction; `Bitmap::try_from` decides whether the
/// frame is displayable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self { width, height, channels, data }
    }

    pub fn gray(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, 1, data)
    }

    pub fn rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, 3, data)
    }

    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, 4, data)
    }

    /// Uniformly colored RGB frame
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb.repeat((width * height) as usize);
        Self::rgb(width, height, data)
    }

    pub fn format(&self) -> Option<PixelFormat> {
        PixelFormat::from_channels(self.channels)
    }

    /// Width / height
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    fn check(&self) -> Result<PixelFormat, ViewerError> {
        let format = self.format().ok_or_else(|| {
            ViewerError::InvalidFrame(format!(
                "unsupported channel count {} (expected 1, 2, 3 or 4)",
                self.channels
            ))
        })?;

        if self.width == 0 || self.height == 0 {
            return Err(ViewerError::InvalidFrame(format!(
                "empty frame {}x{}",
                self.width, self.height
            )));
        }

        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(ViewerError::InvalidFrame(format!(
                "frame {}x{} exceeds the {MAX_DIMENSION} pixel limit",
                self.width, self.height
            )));
        }

        let expected = self.width as usize * self.height as usize * self.channels as usize;
        if self.data.len() != expected {
            return Err(ViewerError::InvalidFrame(format!(
                "buffer holds {} bytes, {}x{}x{} needs {expected}",
                self.data.len(),
                self.width,
                self.height,
                self.channels
            )));
        }

        Ok(format)
    }
}

/// Bitmap - the backend-native RGBA8 representation the painters upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGBA8 pixel data, `width * height * 4` bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        let px = &self.pixels[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl TryFrom<Frame> for Bitmap {
    type Error = ViewerError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let format = frame.check()?;
        let Frame { width, height, data, .. } = frame;

        let pixels = match format {
            PixelFormat::Rgba => data,
            PixelFormat::Rgb => bytemuck::cast_slice::<u8, [u8; 3]>(&data)
                .iter()
                .flat_map(|&[r, g, b]| [r, g, b, 255])
                .collect(),
            PixelFormat::GrayAlpha => bytemuck::cast_slice::<u8, [u8; 2]>(&data)
                .iter()
                .flat_map(|&[v, a]| [v, v, v, a])
                .collect(),
            PixelFormat::Gray => data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        };

        Ok(Self { width, height, pixels })
    }
}

impl TryFrom<&Frame> for Bitmap {
    type Error = ViewerError;

    fn try_from(frame: &Frame) -> Result<Self, Self::Error> {
        Bitmap::try_from(frame.clone())
    }
}
