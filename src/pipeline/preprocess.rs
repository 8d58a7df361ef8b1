// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧预处理: 归一化 → 全局对比度标准化 → 3x3 高斯平滑

use image::Rgb32FImage;
use imageproc::filter::filter3x3;
use ndarray::Array3;
use tracing::warn;

use crate::error::StageError;
use crate::frame::{Frame, PixelRange};

/// 高斯平滑核 [[1,2,1],[2,4,2],[1,2,1]] / 16, 行优先
pub const GAUSSIAN_3X3: [f32; 9] = [
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
    2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0,
    1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0,
];

/// 标准化结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contrast {
    /// z-score 已完成
    Normalized { mean: f32, std: f32 },
    /// 方差为0: 只做了去均值
    MeanOnly { mean: f32 },
}

pub fn preprocess(frame: &Frame) -> Result<Frame, StageError> {
    if frame.is_empty() {
        return Err(StageError::InvalidFrame(format!(
            "empty frame {}x{}",
            frame.width(),
            frame.height()
        )));
    }

    let mut data = frame.view().to_owned();
    if frame.range() == PixelRange::Byte {
        data.mapv_inplace(|v| v / 255.0);
    }

    if let Contrast::MeanOnly { mean } = standardize(&mut data) {
        warn!(
            mean,
            width = frame.width(),
            height = frame.height(),
            "zero-variance frame, contrast normalization skipped"
        );
    }

    // imageproc 边界按边缘像素延拓
    let image = Frame::from_array(data, PixelRange::Standardized)?.to_rgb32f();
    let smoothed: Rgb32FImage = filter3x3(&image, &GAUSSIAN_3X3);
    Frame::from_rgb32f(smoothed, PixelRange::Standardized)
}

/// 全局 z-score (总体方差); 调用方保证 data 非空
pub fn standardize(data: &mut Array3<f32>) -> Contrast {
    let n = data.len() as f64;
    let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = data
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    let std = variance.sqrt();

    let mean_f = mean as f32;
    // 标准差不超过均值本身的舍入误差即视为0
    if !std.is_finite() || std <= f64::EPSILON * mean.abs() {
        data.mapv_inplace(|v| v - mean_f);
        return Contrast::MeanOnly { mean: mean_f };
    }

    let std_f = std as f32;
    data.mapv_inplace(|v| (v - mean_f) / std_f);
    Contrast::Normalized {
        mean: mean_f,
        std: std_f,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_gray_frame_is_defined() {
        let frame = Frame::uniform(16, 12, 128.0, PixelRange::Byte);
        let out = preprocess(&frame).unwrap();
        assert_eq!((out.width(), out.height()), (16, 12));
        assert_eq!(out.range(), PixelRange::Standardized);
        assert!(out.view().iter().all(|v| v.is_finite() && v.abs() < 1e-5));
    }

    #[test]
    fn test_standardize_zero_mean_unit_std() {
        let mut data = Array3::from_shape_fn((4, 4, 3), |(y, x, c)| (y * 12 + x * 3 + c) as f32);
        let contrast = standardize(&mut data);
        assert!(matches!(contrast, Contrast::Normalized { .. }));

        let n = data.len() as f32;
        let mean = data.sum() / n;
        let var = data.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        assert!(mean.abs() < 1e-5);
        assert!((var - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_standardize_uniform_is_mean_only() {
        let mut data = Array3::from_elem((3, 3, 3), 0.25f32);
        let contrast = standardize(&mut data);
        assert_eq!(contrast, Contrast::MeanOnly { mean: 0.25 });
        assert!(data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_tiny_variance_is_still_normalized() {
        let mut data = Array3::from_elem((64, 64, 3), 0.5f32);
        data[[10, 10, 0]] = 0.5001;
        let contrast = standardize(&mut data);
        let Contrast::Normalized { std, .. } = contrast else {
            panic!("expected normalization, got {:?}", contrast);
        };
        assert!(std < 1e-6);
        assert!(data[[10, 10, 0]] > 100.0);
    }

    #[test]
    fn test_smoothing_replicates_edges() {
        // 左半 0, 右半 1 的台阶
        let data = Array3::from_shape_fn((4, 6, 3), |(_, x, _)| if x < 3 { 0.0 } else { 1.0 });
        let frame = Frame::from_array(data, PixelRange::Unit).unwrap();
        let out = preprocess(&frame).unwrap();
        let v = out.view();
        // 标准化后 ±1; 台阶处平滑为 ∓0.5, 边缘列保持原值
        assert!((v[[0, 0, 0]] + 1.0).abs() < 1e-5);
        assert!((v[[3, 5, 2]] - 1.0).abs() < 1e-5);
        assert!((v[[1, 2, 0]] + 0.5).abs() < 1e-5);
        assert!((v[[1, 3, 0]] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_byte_and_unit_frames_agree() {
        let bytes: Vec<u8> = (0..(5 * 5 * 3)).map(|i| (i * 3 % 256) as u8).collect();
        let byte_frame = Frame::from_raw_rgb(5, 5, &bytes).unwrap();
        let unit = byte_frame.view().mapv(|v| v / 255.0);
        let unit_frame = Frame::from_array(unit, PixelRange::Unit).unwrap();

        let a = preprocess(&byte_frame).unwrap();
        let b = preprocess(&unit_frame).unwrap();
        for (x, y) in a.view().iter().zip(b.view().iter()) {
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = Frame::uniform(0, 0, 0.0, PixelRange::Unit);
        assert!(matches!(preprocess(&frame), Err(StageError::InvalidFrame(_))));
    }
}
