// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 视频帧缓冲 (Frame buffer)
//!
//! 三通道像素网格, HWC 布局 `[height, width, 3]`。

use image::{DynamicImage, Rgb, Rgb32FImage, RgbImage};
use ndarray::{Array3, ArrayView3};

use crate::error::StageError;

pub const CHANNELS: usize = 3;

/// 像素值范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelRange {
    /// [0, 255]
    Byte,
    /// [0, 1]
    Unit,
    /// 零均值 (预处理输出)
    Standardized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    data: Array3<f32>,
    range: PixelRange,
}

impl Frame {
    /// 从 HWC 数组创建, 通道数必须为3
    pub fn from_array(data: Array3<f32>, range: PixelRange) -> Result<Self, StageError> {
        let (_, _, c) = data.dim();
        if c != CHANNELS {
            return Err(StageError::InvalidFrame(format!(
                "expected {} channels, got {}",
                CHANNELS, c
            )));
        }
        Ok(Self { data, range })
    }

    /// 从交错排列的 RGB 字节创建
    pub fn from_raw_rgb(width: u32, height: u32, bytes: &[u8]) -> Result<Self, StageError> {
        let (w, h) = (width as usize, height as usize);
        let expected = w.checked_mul(h).and_then(|n| n.checked_mul(CHANNELS));
        if expected != Some(bytes.len()) {
            return Err(StageError::InvalidFrame(format!(
                "buffer of {} bytes does not match {}x{} RGB",
                bytes.len(),
                width,
                height
            )));
        }
        let data = Array3::from_shape_fn((h, w, CHANNELS), |(y, x, c)| {
            bytes[(y * w + x) * CHANNELS + c] as f32
        });
        Ok(Self {
            data,
            range: PixelRange::Byte,
        })
    }

    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let data = Array3::from_shape_fn((h as usize, w as usize, CHANNELS), |(y, x, c)| {
            img.get_pixel(x as u32, y as u32).0[c] as f32
        });
        Self {
            data,
            range: PixelRange::Byte,
        }
    }

    pub fn from_dynamic(img: &DynamicImage) -> Self {
        Self::from_rgb_image(&img.to_rgb8())
    }

    pub fn from_rgb32f(img: Rgb32FImage, range: PixelRange) -> Result<Self, StageError> {
        let (w, h) = img.dimensions();
        let data = Array3::from_shape_vec((h as usize, w as usize, CHANNELS), img.into_raw())
            .map_err(|e| StageError::InvalidFrame(e.to_string()))?;
        Ok(Self { data, range })
    }

    /// 转为 `image` 浮点图像, 供 imageops / imageproc 使用
    pub fn to_rgb32f(&self) -> Rgb32FImage {
        Rgb32FImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([
                self.data[[y, x, 0]],
                self.data[[y, x, 1]],
                self.data[[y, x, 2]],
            ])
        })
    }

    /// 所有像素同一取值
    pub fn uniform(width: usize, height: usize, value: f32, range: PixelRange) -> Self {
        Self {
            data: Array3::from_elem((height, width, CHANNELS), value),
            range,
        }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn range(&self) -> PixelRange {
        self.range
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}
