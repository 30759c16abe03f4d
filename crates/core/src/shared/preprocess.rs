use ndarray::Array4;

use crate::shared::constants::{NORM_MEAN, NORM_STD};
use crate::shared::frame::Frame;

/// Resize `frame` to `content` size and place it at the top-left of a
/// `canvas`-sized NCHW tensor, normalized as `(x - 127.5) / 128`.
///
/// The area outside the content is black (normalized 0). Resampling is
/// bilinear with pixel-center alignment and edge replication.
pub fn to_normalized_nchw(frame: &Frame, content: (u32, u32), canvas: (u32, u32)) -> Array4<f32> {
    let (cw, ch) = (content.0.min(canvas.0) as usize, content.1.min(canvas.1) as usize);
    let (tw, th) = (canvas.0 as usize, canvas.1 as usize);
    let black = normalize(0.0);
    let mut tensor = Array4::<f32>::from_elem((1, 3, th, tw), black);

    if frame.is_empty() || cw == 0 || ch == 0 {
        return tensor;
    }

    let sx = frame.width() as f64 / content.0 as f64;
    let sy = frame.height() as f64 / content.1 as f64;
    let max_x = (frame.width() - 1) as f64;
    let max_y = (frame.height() - 1) as f64;

    for y in 0..ch {
        let src_y = ((y as f64 + 0.5) * sy - 0.5).clamp(0.0, max_y);
        for x in 0..cw {
            let src_x = ((x as f64 + 0.5) * sx - 0.5).clamp(0.0, max_x);
            for c in 0..3 {
                let v = frame.sample_bilinear(src_x, src_y, c, 0);
                tensor[[0, c, y, x]] = normalize(v as f32);
            }
        }
    }

    tensor
}

fn normalize(v: f32) -> f32 {
    (v - NORM_MEAN) / NORM_STD
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shape_is_canvas() {
        let frame = Frame::filled(50, 30, [10, 20, 30], 0);
        let t = to_normalized_nchw(&frame, (50, 30), (64, 32));
        assert_eq!(t.shape(), &[1, 3, 32, 64]);
    }

    #[test]
    fn test_normalization() {
        let frame = Frame::filled(10, 10, [255, 127, 0], 0);
        let t = to_normalized_nchw(&frame, (10, 10), (10, 10));
        assert_relative_eq!(t[[0, 0, 5, 5]], (255.0 - 127.5) / 128.0);
        assert_relative_eq!(t[[0, 1, 5, 5]], (127.0 - 127.5) / 128.0);
        assert_relative_eq!(t[[0, 2, 5, 5]], -127.5 / 128.0);
    }

    #[test]
    fn test_padding_is_black() {
        let frame = Frame::filled(20, 10, [200, 200, 200], 0);
        let t = to_normalized_nchw(&frame, (20, 10), (32, 32));
        let black = -127.5 / 128.0;
        assert_relative_eq!(t[[0, 0, 31, 31]], black);
        assert_relative_eq!(t[[0, 0, 5, 25]], black);
        assert_relative_eq!(t[[0, 0, 5, 5]], (200.0 - 127.5) / 128.0);
    }

    #[test]
    fn test_uniform_frame_stays_uniform_when_downscaled() {
        let frame = Frame::filled(300, 200, [90, 90, 90], 0);
        let t = to_normalized_nchw(&frame, (112, 112), (112, 112));
        let expected = (90.0 - 127.5) / 128.0;
        assert!(t.iter().all(|v| (v - expected).abs() < 1e-5));
    }

    #[test]
    fn test_upscale_keeps_corners() {
        let mut data = vec![0u8; 2 * 2 * 3];
        data[0] = 255; // top-left red
        let frame = Frame::new(data, 2, 2, 3, 0);
        let t = to_normalized_nchw(&frame, (8, 8), (8, 8));
        assert_relative_eq!(t[[0, 0, 0, 0]], (255.0 - 127.5) / 128.0);
        assert_relative_eq!(t[[0, 0, 7, 7]], -127.5 / 128.0);
    }

    #[test]
    fn test_empty_frame_gives_black_canvas() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        let t = to_normalized_nchw(&frame, (0, 0), (32, 32));
        assert!(t.iter().all(|v| (*v - -127.5 / 128.0).abs() < 1e-6));
    }
}
