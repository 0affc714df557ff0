//! Widget snapshot capture.
//!
//! [`SnapshotCapturer`] turns a region of a [`RenderSurface`] into one raster
//! image. Collapsed sections inside the live region are expanded for the
//! duration of the capture and collapsed again afterwards whatever the
//! outcome; the snapshot itself is taken
//! from a detached clone whose colors and canvases have been made
//! capturable.

pub mod element;
pub mod raster;
pub mod surface;

pub use element::{Element, ElementId, ElementKind, Flow};
pub use surface::{RenderSurface, SceneSurface};

use crate::color::{convert, has_perceptual_color, rewrite_colors};
use crate::error::CaptureError;
use authenticx_core::config::{CaptureConfig, MIN_CAPTURE_SCALE};
use image::RgbaImage;
use std::sync::Arc;

/// A captured region plus capture diagnostics.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub region: String,
    pub image: Arc<RgbaImage>,
    pub scale: u32,
    pub colors_rewritten: usize,
    pub canvases_substituted: usize,
}

/// Captures regions of a render surface.
#[derive(Debug, Clone)]
pub struct SnapshotCapturer {
    scale: u32,
    wait_for_fonts: bool,
}

impl Default for SnapshotCapturer {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

impl SnapshotCapturer {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.scale, config.wait_for_fonts)
    }

    /// Scales below the supersampling floor are raised to it.
    pub fn new(scale: u32, wait_for_fonts: bool) -> Self {
        let scale = if scale < MIN_CAPTURE_SCALE {
            tracing::warn!(
                "Capture scale {} is below {}; using {}",
                scale,
                MIN_CAPTURE_SCALE,
                MIN_CAPTURE_SCALE
            );
            MIN_CAPTURE_SCALE
        } else {
            scale
        };
        Self {
            scale,
            wait_for_fonts,
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Capture `region` from `surface`.
    pub async fn capture(
        &self,
        surface: &dyn RenderSurface,
        region: &str,
    ) -> Result<Snapshot, CaptureError> {
        if self.wait_for_fonts {
            surface.fonts_ready().await?;
        }
        let id = surface
            .find_region(region)
            .await?
            .ok_or_else(|| CaptureError::RegionNotFound {
                region: region.to_string(),
            })?;
        let collapsed = surface.collapsed_within(id).await?;

        let result = self.capture_expanded(surface, id, region, &collapsed).await;

        for &el in collapsed.iter().rev() {
            if let Err(e) = surface.set_expanded(el, false).await {
                tracing::warn!("Failed to collapse element {} of '{}' again: {}", el, region, e);
            }
        }
        if let Err(ref e) = result {
            tracing::error!("Capture of '{}' failed: {}", region, e);
        }
        result
    }

    async fn capture_expanded(
        &self,
        surface: &dyn RenderSurface,
        id: ElementId,
        region: &str,
        collapsed: &[ElementId],
    ) -> Result<Snapshot, CaptureError> {
        for &el in collapsed {
            surface.set_expanded(el, true).await?;
        }
        let mut clone = surface.clone_detached(id).await?;

        let canvases_substituted = substitute_canvases(surface, &mut clone).await?;
        let colors_rewritten = normalize_colors(&mut clone);
        tracing::debug!(
            "Capturing '{}' at scale {}: {} colors rewritten, {} canvases substituted",
            region,
            self.scale,
            colors_rewritten,
            canvases_substituted
        );

        let image = surface.rasterize(&clone, self.scale).await?;
        tracing::debug!(
            "Snapshot of '{}' is {}x{} pixels",
            region,
            image.width(),
            image.height()
        );
        Ok(Snapshot {
            region: region.to_string(),
            image: Arc::new(image),
            scale: self.scale,
            colors_rewritten,
            canvases_substituted,
        })
    }
}

/// Rewrite every perceptual color in the tree's styles to sRGB.
///
/// A value that is a single color is replaced outright; compound values
/// keep their other tokens.
pub fn normalize_colors(root: &mut Element) -> usize {
    let mut count = 0;
    root.visit_mut(&mut |el| {
        for value in el.style.values_mut() {
            if !has_perceptual_color(value) {
                continue;
            }
            let whole = convert(value.trim());
            if whole.is_converted() {
                *value = whole.into_css();
                count += 1;
                continue;
            }
            let (rewritten, n) = rewrite_colors(value);
            if n > 0 {
                *value = rewritten;
                count += n;
            }
        }
    });
    count
}

/// Replace each canvas in `clone` with a static image of its live pixels.
async fn substitute_canvases(
    surface: &dyn RenderSurface,
    clone: &mut Element,
) -> Result<usize, CaptureError> {
    let canvas_ids: Vec<ElementId> = clone
        .descendants()
        .into_iter()
        .filter(|e| matches!(e.kind, ElementKind::Canvas(_)))
        .map(|e| e.id)
        .collect();
    for id in &canvas_ids {
        let pixels = surface.read_canvas(*id).await?;
        tracing::debug!(
            "Canvas {} read back at {}x{}",
            id,
            pixels.width(),
            pixels.height()
        );
        if let Some(el) = clone.find_mut(*id) {
            el.kind = ElementKind::Image(Arc::new(pixels));
        }
    }
    Ok(canvas_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_clamped() {
        assert_eq!(SnapshotCapturer::new(1, false).scale(), 2);
        assert_eq!(SnapshotCapturer::new(0, false).scale(), 2);
        assert_eq!(SnapshotCapturer::new(3, false).scale(), 3);
        assert_eq!(SnapshotCapturer::default().scale(), 2);
    }

    #[test]
    fn test_normalize_colors_counts_rewrites() {
        let mut tree = Element::block()
            .style("background-color", "oklch(1 0 0)")
            .style("color", "#000")
            .child(Element::text("x").style(
                "box-shadow",
                "0 0 1px oklch(0 0 0), 0 0 2px oklab(1 0 0)",
            ));
        assert_eq!(normalize_colors(&mut tree), 3);
        assert_eq!(tree.style["background-color"], "rgb(255, 255, 255)");
        assert_eq!(tree.style["color"], "#000");
        assert_eq!(normalize_colors(&mut tree), 0);
    }

    #[test]
    fn test_single_color_value_is_replaced_whole() {
        let mut tree = Element::block()
            .style("fill", "  oklch(0 0 0)  ")
            .style("stroke", "OKLCH(1 0 0 / 50%)");
        assert_eq!(normalize_colors(&mut tree), 2);
        assert_eq!(tree.style["fill"], "rgb(0, 0, 0)");
        assert_eq!(tree.style["stroke"], "rgba(255, 255, 255, 0.5)");
    }
}
