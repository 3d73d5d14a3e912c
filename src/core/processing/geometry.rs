//! Scale / budget-crop / grid-align planning.
//!
//! Everything here is a pure function of the native dimensions and the
//! parameters, so the same plan drives the real transform and dry runs.
//! All divisions are floor divisions; when a crop amount is odd, the extra
//! pixel comes off the trailing (right/bottom) edge.
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::params::NormalizeParams;
use crate::error::{Error, Result};

/// Region kept from the scaled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Shrink the width by `amount`, half from each edge, leftover from the right.
    fn trim_width(&mut self, amount: u32) {
        let amount = amount.min(self.width);
        self.left += amount / 2;
        self.width -= amount;
    }

    /// Shrink the height by `amount`, half from each edge, leftover from the bottom.
    fn trim_height(&mut self, amount: u32) {
        let amount = amount.min(self.height);
        self.top += amount / 2;
        self.height -= amount;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransformPlan {
    pub original: (u32, u32),
    /// Dimensions after the aspect-preserving downscale (equal to `original` when none)
    pub scaled: (u32, u32),
    pub crop: CropRect,
    pub budget_removed: u64,
    pub align_removed: u64,
}

impl TransformPlan {
    pub fn needs_resize(&self) -> bool {
        self.scaled != self.original
    }

    pub fn final_size(&self) -> (u32, u32) {
        (self.crop.width, self.crop.height)
    }

    pub fn removed_pixels(&self) -> u64 {
        self.budget_removed + self.align_removed
    }

    /// Fraction of the native area removed by cropping.
    pub fn loss_ratio(&self) -> f64 {
        let area = self.original.0 as u64 * self.original.1 as u64;
        if area == 0 {
            return 0.0;
        }
        self.removed_pixels() as f64 / area as f64
    }
}

/// Scale so the long side equals `target_size`, rounding the short side.
pub fn calculate_resize_dimensions(cols: u32, rows: u32, target_size: u32) -> (u32, u32) {
    let short_side = rows.min(cols);
    let long_side = rows.max(cols);

    if target_size >= long_side {
        return (cols, rows);
    }

    let scale_factor = target_size as f64 / long_side as f64;
    let new_short_side = ((short_side as f64 * scale_factor).round() as u32).max(1);

    if cols > rows {
        (target_size, new_short_side)
    } else {
        (new_short_side, target_size)
    }
}

pub fn align_down(value: u32, align: u32) -> u32 {
    (value / align) * align
}

pub fn plan_transform(width: u32, height: u32, params: &NormalizeParams) -> Result<TransformPlan> {
    if width == 0 || height == 0 {
        return Err(Error::DegenerateImage { width, height });
    }
    let max_pixels = params.max_pixels;
    let align = params.align;
    let native_area = width as u64 * height as u64;

    // Step 1: downscale only when over budget
    let scaled = if native_area > max_pixels {
        calculate_resize_dimensions(width, height, params.max_long_side)
    } else {
        (width, height)
    };
    let mut crop = CropRect::full(scaled.0, scaled.1);

    // Step 2: crop the larger axis when the downscale alone did not reach the budget
    let mut budget_removed = 0;
    if crop.area() > max_pixels {
        let excess = crop.area() - max_pixels;
        let before = crop.area();
        if crop.width > crop.height {
            let reduction = align_down((excess / crop.height as u64) as u32, align);
            crop.trim_width(reduction);
        } else {
            let reduction = align_down((excess / crop.width as u64) as u32, align);
            crop.trim_height(reduction);
        }
        budget_removed = before - crop.area();
        debug!(
            "Budget crop {}x{} -> {}x{}",
            scaled.0, scaled.1, crop.width, crop.height
        );
    }

    // Step 3: centered crop down to the grid
    let before = crop.area();
    crop.trim_width(crop.width - align_down(crop.width, align));
    crop.trim_height(crop.height - align_down(crop.height, align));
    let mut align_removed = before - crop.area();

    if crop.width == 0 || crop.height == 0 {
        return Err(Error::DegenerateImage { width, height });
    }

    // Only reachable when max_long_side^2 exceeds max_pixels
    if crop.area() > max_pixels {
        warn!(
            "{}x{} still over budget after alignment; trimming further",
            crop.width, crop.height
        );
        let before = crop.area();
        while crop.area() > max_pixels {
            if crop.width > crop.height {
                crop.trim_width(align);
            } else {
                crop.trim_height(align);
            }
            if crop.width == 0 || crop.height == 0 {
                return Err(Error::DegenerateImage { width, height });
            }
        }
        align_removed += before - crop.area();
    }

    Ok(TransformPlan {
        original: (width, height),
        scaled,
        crop,
        budget_removed,
        align_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> NormalizeParams {
        NormalizeParams::default()
    }

    fn assert_invariants(plan: &TransformPlan, params: &NormalizeParams) {
        let (w, h) = plan.final_size();
        assert_eq!(w % params.align, 0);
        assert_eq!(h % params.align, 0);
        assert!(w as u64 * h as u64 <= params.max_pixels);
        let loss = plan.loss_ratio();
        assert!((0.0..1.0).contains(&loss), "loss ratio {loss} out of range");
        assert!(plan.crop.left + w <= plan.scaled.0);
        assert!(plan.crop.top + h <= plan.scaled.1);
    }

    #[test]
    fn large_landscape_downscales_then_aligns() {
        let plan = plan_transform(4000, 3000, &defaults()).unwrap();
        assert_eq!(plan.scaled, (1088, 816));
        assert_eq!(plan.final_size(), (1088, 800));
        assert_eq!(plan.budget_removed, 0);
        assert_eq!(plan.align_removed, 1088 * 16);
        assert_eq!(plan.crop.top, 8);
        let expected = (1088.0 * 16.0) / 12_000_000.0;
        assert!((plan.loss_ratio() - expected).abs() < 1e-12);
        assert_invariants(&plan, &defaults());
    }

    #[test]
    fn large_portrait_mirrors_landscape() {
        let plan = plan_transform(3000, 4000, &defaults()).unwrap();
        assert_eq!(plan.scaled, (816, 1088));
        assert_eq!(plan.final_size(), (800, 1088));
        assert_eq!(plan.crop.left, 8);
    }

    #[test]
    fn aligned_input_is_untouched() {
        for (w, h) in [(1088, 800), (1088, 1088), (480, 480), (32, 32)] {
            let plan = plan_transform(w, h, &defaults()).unwrap();
            assert_eq!(plan.final_size(), (w, h));
            assert_eq!(plan.loss_ratio(), 0.0);
            assert!(!plan.needs_resize());
        }
    }

    #[test]
    fn renormalizing_output_is_idempotent() {
        for (w, h) in [(4000, 3000), (1920, 1080), (777, 1333), (5000, 40)] {
            let first = plan_transform(w, h, &defaults()).unwrap();
            let (fw, fh) = first.final_size();
            let second = plan_transform(fw, fh, &defaults()).unwrap();
            assert_eq!(second.final_size(), (fw, fh));
            assert_eq!(second.loss_ratio(), 0.0);
        }
    }

    #[test]
    fn odd_leftover_comes_off_trailing_edge() {
        let plan = plan_transform(1001, 70, &defaults()).unwrap();
        assert_eq!(plan.final_size(), (992, 64));
        // 9 columns removed: 4 leading, 5 trailing
        assert_eq!(plan.crop.left, 4);
        // 6 rows removed: 3 leading, 3 trailing
        assert_eq!(plan.crop.top, 3);
    }

    #[test]
    fn budget_crop_fires_when_downscale_is_not_enough() {
        let params = NormalizeParams {
            max_pixels: 10_000,
            max_long_side: 200,
            align: 8,
            ..defaults()
        };
        let plan = plan_transform(300, 150, &params).unwrap();
        assert_eq!(plan.scaled, (200, 100));
        // excess 10_000 / 100 = 100 -> 96 after flooring to the grid
        assert_eq!(plan.budget_removed, 96 * 100);
        assert_eq!(plan.final_size(), (104, 96));
        assert_eq!(plan.crop.left, 48);
        assert_eq!(plan.crop.top, 2);
        assert_eq!(plan.removed_pixels(), 200 * 100 - 104 * 96);
        assert_invariants(&plan, &params);
    }

    #[test]
    fn guard_keeps_budget_with_loose_long_side() {
        let params = NormalizeParams {
            max_pixels: 10_000,
            max_long_side: 200,
            ..defaults()
        };
        let plan = plan_transform(200, 200, &params).unwrap();
        assert_eq!(plan.final_size(), (128, 64));
        assert_eq!(plan.crop.left, 36);
        assert_invariants(&plan, &params);
    }

    #[test]
    fn too_small_for_grid_is_degenerate() {
        assert!(matches!(
            plan_transform(20, 500, &defaults()),
            Err(Error::DegenerateImage { .. })
        ));
        assert!(matches!(
            plan_transform(0, 10, &defaults()),
            Err(Error::DegenerateImage { .. })
        ));
    }

    #[test]
    fn invariants_hold_across_a_sweep() {
        let params = defaults();
        for w in (400..6000).step_by(397) {
            for h in (400..6000).step_by(411) {
                let plan = plan_transform(w, h, &params).unwrap();
                assert_invariants(&plan, &params);
            }
        }
    }

    #[test]
    fn resize_dimensions_round_short_side() {
        assert_eq!(calculate_resize_dimensions(4000, 3000, 1088), (1088, 816));
        assert_eq!(calculate_resize_dimensions(1000, 3000, 1088), (363, 1088));
        assert_eq!(calculate_resize_dimensions(500, 400, 1088), (500, 400));
    }
}
