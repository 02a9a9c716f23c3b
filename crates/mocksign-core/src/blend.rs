//! Gradient-domain (Poisson) seamless clone.
//!
//! The destination rectangle's outer ring keeps the page colors and acts
//! as the Dirichlet boundary. Interior pixels are solved per channel from
//! the discrete Poisson equation
//!
//! ```text
//! 4 f(p) - sum f(q) = sum v(p, q)      over the 4-neighbors q of p
//! ```
//!
//! with successive over-relaxation, started from the solution of the
//! half-resolution problem. The guidance `v` is the signature
//! gradient, or in [`CloneMode::Mixed`] whichever of the signature and
//! page gradients is stronger, so a flat paper background picks up the
//! page underneath while ink strokes survive.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// How the guidance field is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    /// Stronger of the signature and page gradients, per channel.
    #[default]
    Mixed,
    /// Signature gradient only.
    Normal,
}

/// Poisson solver parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Upper bound on SOR sweeps per channel and resolution level.
    pub max_iterations: u32,

    /// Stop once the largest per-pixel update of a sweep is below this
    /// many intensity levels.
    pub tolerance: f64,

    /// Guidance field selection.
    pub mode: CloneMode,
}

impl BlendConfig {
    /// Default for [`max_iterations`](Self::max_iterations).
    pub const DEFAULT_MAX_ITERATIONS: u32 = 2000;

    /// Default for [`tolerance`](Self::tolerance).
    pub const DEFAULT_TOLERANCE: f64 = 0.01;
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            tolerance: Self::DEFAULT_TOLERANCE,
            mode: CloneMode::default(),
        }
    }
}

/// Seamlessly clone all of `source` into `dest` with its top-left corner
/// at `(left, top)`.
///
/// The caller clips `source` to fit. Pixels outside the target rectangle
/// are never written; a rectangle that does not fit, or that is smaller
/// than 3x3, leaves `dest` unchanged.
pub fn seamless_clone(dest: &mut RgbImage, source: &RgbImage, left: u32, top: u32, config: &BlendConfig) {
    let (w, h) = source.dimensions();
    if w < 3 || h < 3 {
        return;
    }
    let fits = left
        .checked_add(w)
        .zip(top.checked_add(h))
        .is_some_and(|(right, bottom)| right <= dest.width() && bottom <= dest.height());
    if !fits {
        return;
    }

    let (wu, hu) = (w as usize, h as usize);
    for channel in 0..3 {
        let signature = channel_plane(source, 0, 0, w, h, channel);
        let page = channel_plane(dest, left, top, w, h, channel);

        let solved = solve(&signature, &page, wu, hu, config);
        tracing::debug!(
            channel,
            iterations = solved.iterations,
            residual = solved.residual,
            width = w,
            height = h,
            "poisson solve finished"
        );

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let value = solved.field[y as usize * wu + x as usize];
                dest.get_pixel_mut(left + x, top + y).0[channel] = to_u8(value);
            }
        }
    }
}

/// One channel of the `w x h` rectangle of `image` at `(left, top)`.
fn channel_plane(image: &RgbImage, left: u32, top: u32, w: u32, h: u32, channel: usize) -> Vec<f64> {
    (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| f64::from(image.get_pixel(left + x, top + y).0[channel]))
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Levels whose shorter side is below this are solved without a coarser
/// starting guess.
const COARSEST_SIDE: usize = 32;

/// A solved channel.
struct Solution {
    field: Vec<f64>,
    /// SOR sweeps spent on the finest level.
    iterations: u32,
    /// Largest update of the last sweep.
    residual: f64,
}

/// Per interior pixel, the sum of guidance gradients towards its four
/// neighbors.
fn guidance_sums(src: &[f64], page: &[f64], w: usize, h: usize, mode: CloneMode) -> Vec<f64> {
    let mut sums = vec![0.0; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = y * w + x;
            sums[p] = [p - 1, p + 1, p - w, p + w]
                .into_iter()
                .map(|q| {
                    let gs = src[p] - src[q];
                    match mode {
                        CloneMode::Normal => gs,
                        CloneMode::Mixed => {
                            let gp = page[p] - page[q];
                            if gs.abs() > gp.abs() { gs } else { gp }
                        }
                    }
                })
                .sum();
        }
    }
    sums
}

/// Over-relaxation factor of a `w x h` grid, optimal for the Laplacian.
#[allow(clippy::cast_precision_loss)]
fn relaxation(w: usize, h: usize) -> f64 {
    let side = |n: usize| (std::f64::consts::PI / n.saturating_sub(1).max(2) as f64).cos();
    let jacobi = f64::midpoint(side(w), side(h));
    2.0 / (1.0 + jacobi.mul_add(-jacobi, 1.0).sqrt())
}

/// Box-average `plane` down to half size, rounding odd sides up.
#[allow(clippy::cast_precision_loss)]
fn downsample(plane: &[f64], w: usize, h: usize) -> (Vec<f64>, usize, usize) {
    let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
    let mut out = vec![0.0; cw * ch];
    for cy in 0..ch {
        for cx in 0..cw {
            let rows = 2 * cy..(2 * cy + 2).min(h);
            let cols = 2 * cx..(2 * cx + 2).min(w);
            let count = (rows.len() * cols.len()) as f64;
            let sum: f64 = rows
                .flat_map(|y| cols.clone().map(move |x| plane[y * w + x]))
                .sum();
            out[cy * cw + cx] = sum / count;
        }
    }
    (out, cw, ch)
}

/// Bilinear sample of a `w x h` plane, clamped to its edges.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn sample(plane: &[f64], w: usize, h: usize, x: f64, y: f64) -> f64 {
    let x = x.clamp(0.0, (w - 1) as f64);
    let y = y.clamp(0.0, (h - 1) as f64);
    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (tx, ty) = (x - x0 as f64, y - y0 as f64);
    let upper = plane[y0 * w + x0].mul_add(1.0 - tx, plane[y0 * w + x1] * tx);
    let lower = plane[y1 * w + x0].mul_add(1.0 - tx, plane[y1 * w + x1] * tx);
    upper.mul_add(1.0 - ty, lower * ty)
}

/// Solve one channel coarse to fine.
///
/// The half-resolution problem is solved first. Its offset from the
/// signature, which is smooth where the signature is not, is upsampled
/// as the starting guess, so the fine sweeps only remove what the coarse
/// grid cannot represent. Coarser levels converge to a tighter tolerance.
#[allow(clippy::cast_precision_loss)]
fn solve(src: &[f64], page: &[f64], w: usize, h: usize, config: &BlendConfig) -> Solution {
    let initial = if w.min(h) < 2 * COARSEST_SIDE {
        src.to_vec()
    } else {
        let (coarse_src, cw, ch) = downsample(src, w, h);
        let (coarse_page, _, _) = downsample(page, w, h);
        let coarse_config = BlendConfig {
            tolerance: config.tolerance / 4.0,
            ..config.clone()
        };
        let coarse = solve(&coarse_src, &coarse_page, cw, ch, &coarse_config);
        let offset: Vec<f64> = coarse
            .field
            .iter()
            .zip(&coarse_src)
            .map(|(f, s)| f - s)
            .collect();
        (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .map(|(x, y)| {
                let cx = (x as f64 - 0.5) / 2.0;
                let cy = (y as f64 - 0.5) / 2.0;
                src[y * w + x] + sample(&offset, cw, ch, cx, cy)
            })
            .collect()
    };
    let guidance = guidance_sums(src, page, w, h, config.mode);
    relax(initial, page, &guidance, w, h, config)
}

/// SOR sweeps from `initial` until converged. The outer ring is taken
/// from `page`.
fn relax(
    initial: Vec<f64>,
    page: &[f64],
    guidance: &[f64],
    w: usize,
    h: usize,
    config: &BlendConfig,
) -> Solution {
    let mut f = initial;
    let last_row = (h - 1) * w;
    f[..w].copy_from_slice(&page[..w]);
    f[last_row..].copy_from_slice(&page[last_row..]);
    for y in 0..h {
        f[y * w] = page[y * w];
        f[y * w + w - 1] = page[y * w + w - 1];
    }

    let omega = relaxation(w, h);
    let mut iterations = 0;
    let mut residual = f64::INFINITY;
    while iterations < config.max_iterations {
        iterations += 1;
        residual = 0.0;
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let p = y * w + x;
                let target = (f[p - 1] + f[p + 1] + f[p - w] + f[p + w] + guidance[p]) / 4.0;
                let delta = omega * (target - f[p]);
                f[p] += delta;
                residual = residual.max(delta.abs());
            }
        }
        if residual < config.tolerance {
            break;
        }
    }
    Solution {
        field: f,
        iterations,
        residual,
    }
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
mod tests {
    use super::*;

    fn flat(w: u32, h: u32, v: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, image::Rgb([v, v, v]))
    }

    fn textured(w: u32, h: u32) -> RgbImage {
        #[allow(clippy::cast_possible_truncation)]
        RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([(x * 9 % 256) as u8, (y * 5 % 256) as u8, ((x + y) * 3 % 256) as u8])
        })
    }

    fn normal() -> BlendConfig {
        BlendConfig {
            mode: CloneMode::Normal,
            ..BlendConfig::default()
        }
    }

    #[test]
    fn pixels_outside_rectangle_are_untouched() {
        let original = textured(40, 30);
        let mut page = original.clone();
        seamless_clone(&mut page, &flat(10, 8, 0), 5, 7, &BlendConfig::default());
        assert_eq!(page.dimensions(), (40, 30));
        for (x, y, p) in page.enumerate_pixels() {
            let inside = (6..14).contains(&x) && (8..14).contains(&y);
            if !inside {
                assert_eq!(p, original.get_pixel(x, y), "pixel ({x},{y}) changed");
            }
        }
    }

    #[test]
    fn flat_source_takes_on_flat_page_color() {
        let mut page = flat(20, 20, 200);
        seamless_clone(&mut page, &flat(12, 12, 0), 4, 4, &normal());
        for p in page.pixels() {
            let diff = i16::from(p.0[0]) - 200;
            assert!(diff.abs() <= 1, "expected ~200, got {}", p.0[0]);
        }
    }

    #[test]
    fn identical_source_leaves_page_unchanged() {
        let page_before = textured(16, 16);
        let source = image::imageops::crop_imm(&page_before, 3, 2, 10, 9).to_image();
        let mut page = page_before.clone();
        seamless_clone(&mut page, &source, 3, 2, &normal());
        assert_eq!(page, page_before);
    }

    #[test]
    fn mixed_clone_keeps_ink_and_drops_paper() {
        // White paper with a dark vertical stroke in the middle column.
        let signature = RgbImage::from_fn(15, 15, |x, _| {
            if x == 7 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let mut page = flat(25, 25, 120);
        seamless_clone(&mut page, &signature, 5, 5, &BlendConfig::default());

        let paper = page.get_pixel(5 + 2, 5 + 7).0[0];
        let ink = page.get_pixel(5 + 7, 5 + 7).0[0];
        assert!((i16::from(paper) - 120).abs() <= 10, "paper should blend into page, got {paper}");
        assert!(ink + 60 < paper, "ink {ink} should stay darker than paper {paper}");
    }

    /// White paper with a dark horizontal stroke well inside the edges.
    fn stroked_paper(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let stroke = (h / 2 - 4..h / 2 + 4).contains(&y) && (w / 8..w - w / 8).contains(&x);
            if stroke {
                image::Rgb([20, 20, 20])
            } else {
                image::Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn coarse_start_bounds_fine_sweeps() {
        let (w, h) = (300_u32, 120_u32);
        let (wu, hu) = (w as usize, h as usize);
        let signature = channel_plane(&stroked_paper(w, h), 0, 0, w, h, 0);
        let page = vec![180.0; signature.len()];
        let config = BlendConfig::default();

        let solved = solve(&signature, &page, wu, hu, &config);
        assert!(solved.iterations < 40, "{} fine sweeps", solved.iterations);
        assert!(solved.residual < config.tolerance);

        let guidance = guidance_sums(&signature, &page, wu, hu, config.mode);
        let single_level = relax(signature.clone(), &page, &guidance, wu, hu, &config);
        assert!(
            single_level.iterations > 100,
            "{} single-level sweeps",
            single_level.iterations
        );

        // Paper lands on the page level; ink keeps its depth below it.
        let at = |x: usize, y: usize| solved.field[y * wu + x];
        assert!((at(20, 20) - 180.0).abs() < 1.0, "paper {}", at(20, 20));
        assert!((at(150, 60) + 55.0).abs() < 1.0, "ink {}", at(150, 60));
    }

    #[test]
    fn large_region_matches_single_level_solve() {
        let (w, h) = (96_u32, 70_u32);
        let (wu, hu) = (w as usize, h as usize);
        let signature = channel_plane(&stroked_paper(w, h), 0, 0, w, h, 0);
        let page = channel_plane(&textured(w, h), 0, 0, w, h, 1);
        let config = BlendConfig {
            tolerance: 1e-4,
            ..BlendConfig::default()
        };

        let solved = solve(&signature, &page, wu, hu, &config);
        let guidance = guidance_sums(&signature, &page, wu, hu, config.mode);
        let single_level = relax(signature.clone(), &page, &guidance, wu, hu, &config);
        for (a, b) in solved.field.iter().zip(&single_level.field) {
            assert!((a - b).abs() < 0.5, "{a} vs {b}");
        }
    }

    #[test]
    fn downsample_averages_and_rounds_odd_sides_up() {
        let plane = vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0];
        let (out, w, h) = downsample(&plane, 3, 2);
        assert_eq!((w, h), (2, 1));
        assert_eq!(out, vec![(0.0 + 2.0 + 6.0 + 8.0) / 4.0, (4.0 + 10.0) / 2.0]);
    }

    #[test]
    fn tiny_region_is_a_no_op() {
        let original = textured(10, 10);
        let mut page = original.clone();
        seamless_clone(&mut page, &flat(2, 5, 0), 1, 1, &BlendConfig::default());
        assert_eq!(page, original);
    }

    #[test]
    fn overhanging_region_is_a_no_op() {
        let original = textured(10, 10);
        let mut page = original.clone();
        seamless_clone(&mut page, &flat(5, 5, 0), 8, 8, &BlendConfig::default());
        assert_eq!(page, original);
    }
}
