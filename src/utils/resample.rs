// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 区域裁剪与缩放

use image::imageops::{self, FilterType};
use image::Rgb32FImage;
use ndarray::Array3;

use crate::detection::BoundingBox;

/// 裁剪失败原因
#[derive(Debug, Clone, PartialEq)]
pub enum CropError {
    /// 截断到图像范围后面积为0
    EmptyRegion,
    /// 目标分辨率为0
    ZeroOutput,
}

/// 截断到图像范围后的整数区域 (x0, y0, x1, y1), 右下角不含
pub fn clamp_region(bbox: &BoundingBox, width: usize, height: usize) -> Result<(usize, usize, usize, usize), CropError> {
    if !(bbox.x.is_finite() && bbox.y.is_finite() && bbox.width.is_finite() && bbox.height.is_finite()) {
        return Err(CropError::EmptyRegion);
    }
    let x0 = bbox.x.max(0.0).floor();
    let y0 = bbox.y.max(0.0).floor();
    let x1 = bbox.xmax().min(width as f32).ceil();
    let y1 = bbox.ymax().min(height as f32).ceil();
    if x1 - x0 < 1.0 || y1 - y0 < 1.0 || bbox.is_degenerate() {
        return Err(CropError::EmptyRegion);
    }
    Ok((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
}

/// 裁剪区域并用三角 (双线性) 滤波缩放到 (out_w, out_h), 返回 HWC 数组
pub fn crop_and_resize(
    src: &Rgb32FImage,
    bbox: &BoundingBox,
    out_w: u32,
    out_h: u32,
) -> Result<Array3<f32>, CropError> {
    if out_w == 0 || out_h == 0 {
        return Err(CropError::ZeroOutput);
    }
    let (w, h) = src.dimensions();
    let (x0, y0, x1, y1) = clamp_region(bbox, w as usize, h as usize)?;
    let mut region =
        imageops::crop_imm(src, x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32).to_image();

    let shape = (out_h as usize, out_w as usize, 3);
    let (lo, hi) = region
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = hi - lo;
    if !(span.is_finite() && span > 0.0) {
        // 常量区域 (或没有有限值)
        let fill = if lo.is_finite() { lo } else { 0.0 };
        return Ok(Array3::from_elem(shape, fill));
    }

    // f32 重采样结果会被截断到 [0, 1], 先线性映射到该区间, 缩放后还原
    for v in region.iter_mut() {
        *v = if v.is_finite() { (*v - lo) / span } else { 0.0 };
    }
    let resized = imageops::resize(&region, out_w, out_h, FilterType::Triangle);

    Ok(Array3::from_shape_fn(shape, |(y, x, c)| {
        resized.get_pixel(x as u32, y as u32).0[c] * span + lo
    }))
}
