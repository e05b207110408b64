//! Single-scale template matching by zero-mean normalized cross-correlation.
//!
//! Scores follow the TM_CCOEFF_NORMED definition: per-channel means are
//! removed from both the template and each frame window, channel sums are
//! added together, and the result lies in [-1, 1]. Alpha is ignored.
//!
//! The numerator is a circular cross-correlation done in the frequency
//! domain. The grid is the frame's own size, so no valid placement wraps.

use std::sync::Arc;

use image::{imageops, RgbaImage};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::geometry::Span;

/// Below this the template or the window is treated as flat and scores 0.
const MIN_ENERGY: f64 = 1e-6;

/// Scores closer than this count as a tie and keep the earlier placement.
const TIE_EPS: f64 = 1e-9;

/// Best-scoring placement of a template inside a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub score: f64,
    pub location: Span,
}

/// Accept the best placement if it scores at least `threshold`.
pub fn match_template(
    frame: &RgbaImage,
    template: &RgbaImage,
    threshold: f64,
    grayscale: bool,
) -> Option<Span> {
    best_match(frame, template, grayscale)
        .filter(|m| m.score >= threshold)
        .map(|m| m.location)
}

/// Highest-scoring placement of `template` over `frame`. Ties keep the
/// first placement in row-major order. `None` when the template does not
/// fit or has no variance.
pub fn best_match(frame: &RgbaImage, template: &RgbaImage, grayscale: bool) -> Option<MatchScore> {
    PreparedFrame::new(frame, grayscale).best_match(template)
}

/// 2-D FFT over a `width` x `height` grid, done as row passes around a
/// transpose. Spectra are kept in transposed (column-major) order.
struct Fft2 {
    width: usize,
    height: usize,
    row_fwd: Arc<dyn Fft<f64>>,
    col_fwd: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
}

impl Fft2 {
    fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            width,
            height,
            row_fwd: planner.plan_fft_forward(width),
            col_fwd: planner.plan_fft_forward(height),
            row_inv: planner.plan_fft_inverse(width),
            col_inv: planner.plan_fft_inverse(height),
        }
    }

    fn forward(&self, data: Vec<Complex<f64>>) -> Vec<Complex<f64>> {
        let mut data = data;
        self.row_fwd.process(&mut data);
        let mut data = transpose(&data, self.height, self.width);
        self.col_fwd.process(&mut data);
        data
    }

    /// Inverse of `forward`, normalised, back in row-major order.
    fn inverse(&self, spectrum: Vec<Complex<f64>>) -> Vec<f64> {
        let mut data = spectrum;
        self.col_inv.process(&mut data);
        let mut data = transpose(&data, self.width, self.height);
        self.row_inv.process(&mut data);
        let scale = 1.0 / (self.width * self.height) as f64;
        data.into_iter().map(|c| c.re * scale).collect()
    }
}

fn transpose(src: &[Complex<f64>], rows: usize, cols: usize) -> Vec<Complex<f64>> {
    let mut dst = vec![Complex::default(); src.len()];
    for r in 0..rows {
        for c in 0..cols {
            dst[c * rows + r] = src[r * cols + c];
        }
    }
    dst
}

/// A frame ready to be matched against any number of templates: window
/// sums come from summed-area tables and the correlation from the frame's
/// spectrum, both computed once.
pub struct PreparedFrame {
    width: usize,
    height: usize,
    grayscale: bool,
    integrals: Vec<Integral>,
    spectra: Vec<Vec<Complex<f64>>>,
    fft: Fft2,
}

impl PreparedFrame {
    pub fn new(frame: &RgbaImage, grayscale: bool) -> Self {
        let planes = Planes::from_image(frame, grayscale);
        let (width, height) = (planes.width, planes.height);
        let fft = Fft2::new(width.max(1), height.max(1));

        let integrals = planes.channels.iter().map(|ch| Integral::new(ch, width, height)).collect();
        let spectra = if width == 0 || height == 0 {
            Vec::new()
        } else {
            planes
                .channels
                .iter()
                .map(|ch| {
                    // centring the plane keeps the spectrum well conditioned;
                    // the zero-mean template makes the offset irrelevant
                    let mean = ch.iter().sum::<f64>() / ch.len() as f64;
                    fft.forward(ch.iter().map(|v| Complex::new(v - mean, 0.0)).collect())
                })
                .collect()
        };
        Self { width, height, grayscale, integrals, spectra, fft }
    }

    pub fn best_match(&self, template: &RgbaImage) -> Option<MatchScore> {
        let tpl = Planes::from_image(template, self.grayscale);
        if tpl.width == 0 || tpl.height == 0 || tpl.width > self.width || tpl.height > self.height {
            return None;
        }
        let n = (tpl.width * tpl.height) as f64;

        // sum over channels of frame spectrum times conjugate template spectrum
        let mut product = vec![Complex::default(); self.width * self.height];
        let mut tpl_energy = 0.0;
        for (c, ch) in tpl.channels.iter().enumerate() {
            let mean = ch.iter().sum::<f64>() / n;
            let mut padded = vec![Complex::default(); self.width * self.height];
            for row in 0..tpl.height {
                for col in 0..tpl.width {
                    let v = ch[row * tpl.width + col] - mean;
                    tpl_energy += v * v;
                    padded[row * self.width + col] = Complex::new(v, 0.0);
                }
            }
            let spectrum = self.fft.forward(padded);
            for (acc, (f, t)) in product.iter_mut().zip(self.spectra[c].iter().zip(&spectrum)) {
                *acc += f * t.conj();
            }
        }
        if tpl_energy < MIN_ENERGY {
            return None;
        }
        let cross = self.fft.inverse(product);

        let mut best: Option<MatchScore> = None;
        for y in 0..=(self.height - tpl.height) {
            for x in 0..=(self.width - tpl.width) {
                let mut win_energy = 0.0;
                for integral in &self.integrals {
                    let (sum, sq) = integral.window(x, y, tpl.width, tpl.height);
                    win_energy += sq - sum * sum / n;
                }

                let denom = (tpl_energy * win_energy.max(0.0)).sqrt();
                let score = if denom < MIN_ENERGY { 0.0 } else { cross[y * self.width + x] / denom };

                if best.map_or(true, |b| score > b.score + TIE_EPS) {
                    best = Some(MatchScore {
                        score,
                        location: Span::new(
                            x as i32,
                            y as i32,
                            (x + tpl.width) as i32,
                            (y + tpl.height) as i32,
                        ),
                    });
                }
            }
        }
        best
    }
}

/// Image split into f64 channel planes (luma only, or R, G, B).
struct Planes {
    width: usize,
    height: usize,
    channels: Vec<Vec<f64>>,
}

impl Planes {
    fn from_image(img: &RgbaImage, grayscale: bool) -> Self {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let channels = if grayscale {
            let gray = imageops::grayscale(img);
            vec![gray.pixels().map(|p| p[0] as f64).collect()]
        } else {
            (0..3)
                .map(|c| img.pixels().map(|p| p[c] as f64).collect())
                .collect()
        };
        Self { width, height, channels }
    }
}

/// Summed-area tables of values and squared values.
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl Integral {
    fn new(plane: &[f64], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sum = vec![0.0; stride * (height + 1)];
        let mut sq = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..width {
                let v = plane[y * width + x];
                row_sum += v;
                row_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row_sum;
                sq[i] = sq[i - stride] + row_sq;
            }
        }
        Self { stride, sum, sq }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let (a, b, c, d) = (y * s + x, y * s + x + w, (y + h) * s + x, (y + h) * s + x + w);
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sq[d] - self.sq[b] - self.sq[c] + self.sq[a],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use image::Rgba;

    #[test]
    fn finds_planted_template_exactly() {
        let tpl = fixtures::noise_template(3);
        let frame = fixtures::frame_with(&[(&tpl, 37, 52)], 99);
        for grayscale in [true, false] {
            let m = best_match(&frame, &tpl, grayscale).unwrap();
            assert!((m.score - 1.0).abs() < 1e-6, "score {}", m.score);
            assert_eq!(m.location, Span::new(37, 52, 37 + 16, 52 + 16));
        }
    }

    #[test]
    fn threshold_rejects_absent_template() {
        let present = fixtures::noise_template(1);
        let absent = fixtures::noise_template(2);
        let frame = fixtures::frame_with(&[(&present, 10, 10)], 5);
        assert!(match_template(&frame, &present, 0.9, true).is_some());
        assert!(match_template(&frame, &absent, 0.75, true).is_none());
    }

    #[test]
    fn matching_is_deterministic() {
        let tpl = fixtures::noise_template(8);
        let frame = fixtures::frame_with(&[(&tpl, 100, 20)], 42);
        let a = best_match(&frame, &tpl, false);
        let b = best_match(&frame, &tpl, false);
        assert_eq!(a, b);
        assert_eq!(
            match_template(&frame, &tpl, 0.75, true),
            match_template(&frame, &tpl, 0.75, true)
        );
    }

    #[test]
    fn alpha_channel_is_ignored() {
        let tpl = fixtures::noise_template(4);
        let mut frame = fixtures::frame_with(&[(&tpl, 30, 30)], 6);
        for p in frame.pixels_mut() {
            p[3] = 17;
        }
        let m = best_match(&frame, &tpl, false).unwrap();
        assert_eq!((m.location.left, m.location.top), (30, 30));
    }

    #[test]
    fn oversized_or_flat_template_never_matches() {
        let frame = fixtures::frame_with(&[], 1);
        let huge = RgbaImage::new(frame.width() + 1, 4);
        assert!(best_match(&frame, &huge, true).is_none());

        let flat = RgbaImage::from_pixel(8, 8, Rgba([120, 120, 120, 255]));
        assert!(match_template(&frame, &flat, 0.0, true).is_none());
    }

    #[test]
    fn repeated_template_reports_first_placement() {
        let tpl = fixtures::noise_template(11);
        let frame = fixtures::frame_with(&[(&tpl, 90, 70), (&tpl, 20, 70), (&tpl, 60, 10)], 12);
        let m = best_match(&frame, &tpl, true).unwrap();
        assert_eq!((m.location.left, m.location.top), (60, 10));
    }

    #[test]
    fn prepared_frame_serves_several_templates() {
        let a = fixtures::noise_template(21);
        let b = fixtures::noise_template(22);
        let frame = fixtures::frame_with(&[(&a, 5, 9), (&b, 120, 90)], 23);
        let prepared = PreparedFrame::new(&frame, false);
        assert_eq!(prepared.best_match(&a).unwrap().location, Span::new(5, 9, 21, 25));
        assert_eq!(prepared.best_match(&b).unwrap().location, Span::new(120, 90, 136, 106));
    }

    #[test]
    fn window_sized_frame_matches_quickly() {
        let frame = fixtures::noise_frame(640, 360, 7);
        let tpl = imageops::crop_imm(&frame, 300, 150, 120, 40).to_image();
        let start = std::time::Instant::now();
        let found = match_template(&frame, &tpl, 0.9, true);
        let elapsed = start.elapsed();
        assert_eq!(found, Some(Span::new(300, 150, 420, 190)));
        assert!(elapsed < std::time::Duration::from_secs(3), "took {:?}", elapsed);
    }
}
