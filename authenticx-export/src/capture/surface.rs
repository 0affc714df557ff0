//! Render surface trait and the in-memory scene implementation.
//!
//! The `RenderSurface` trait abstracts the live view a widget is captured
//! from, so the capturer can be exercised without a browser.

use super::element::{Element, ElementId, ElementKind};
use super::raster;
use crate::error::CaptureError;
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Horizontal offset that parks a detached clone outside the viewport.
pub const OFFSCREEN_LEFT: &str = "-10000px";

/// Operations the snapshot capturer needs from a live view.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Resolve once web fonts are loaded.
    async fn fonts_ready(&self) -> Result<(), CaptureError>;

    /// Look up a region by identifier.
    async fn find_region(&self, region: &str) -> Result<Option<ElementId>, CaptureError>;

    async fn set_expanded(&self, id: ElementId, expanded: bool) -> Result<(), CaptureError>;

    /// Collapsed elements within `id`, including `id` itself, in tree order.
    async fn collapsed_within(&self, id: ElementId) -> Result<Vec<ElementId>, CaptureError>;

    /// A deep copy of the element with every collapsible descendant
    /// expanded, positioned off the visible viewport.
    async fn clone_detached(&self, id: ElementId) -> Result<Element, CaptureError>;

    /// Current pixels of a live canvas.
    async fn read_canvas(&self, id: ElementId) -> Result<RgbaImage, CaptureError>;

    /// Rasterize an element tree at `scale` device pixels per CSS pixel.
    async fn rasterize(&self, element: &Element, scale: u32) -> Result<RgbaImage, CaptureError>;
}

/// In-memory render surface: a retained element tree behind a mutex.
pub struct SceneSurface {
    root: Mutex<Element>,
    fonts: watch::Sender<bool>,
    /// If set, the next rasterize() fails with this message.
    raster_failure: Mutex<Option<String>>,
    /// Record of surface calls for assertions: (method, argument).
    call_log: Mutex<Vec<(String, String)>>,
}

impl SceneSurface {
    /// Wrap `root`, numbering its elements. Fonts start out loaded.
    pub fn new(mut root: Element) -> Self {
        root.assign_ids(1);
        let (fonts, _) = watch::channel(true);
        Self {
            root: Mutex::new(root),
            fonts,
            raster_failure: Mutex::new(None),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Same as [`SceneSurface::new`] but with fonts still loading.
    pub fn with_pending_fonts(root: Element) -> Self {
        let surface = Self::new(root);
        surface.fonts.send_replace(false);
        surface
    }

    /// Mark web fonts as loaded, waking any waiter.
    pub fn mark_fonts_loaded(&self) {
        self.fonts.send_replace(true);
    }

    /// Make the next rasterize() call fail.
    pub async fn fail_next_rasterize(&self, message: impl Into<String>) {
        *self.raster_failure.lock().await = Some(message.into());
    }

    /// A copy of the live tree.
    pub async fn snapshot_tree(&self) -> Element {
        self.root.lock().await.clone()
    }

    /// Replace the pixels of a live canvas, as a chart library redraw would.
    pub async fn draw_canvas(&self, id: ElementId, bitmap: RgbaImage) -> Result<(), CaptureError> {
        let mut root = self.root.lock().await;
        let el = root
            .find_mut(id)
            .ok_or(CaptureError::UnknownElement { id })?;
        el.kind = ElementKind::Canvas(Arc::new(bitmap));
        Ok(())
    }

    /// Expansion state of a live element; non-collapsible elements report
    /// expanded.
    pub async fn is_expanded(&self, id: ElementId) -> Result<bool, CaptureError> {
        self.log_call("is_expanded", id.to_string()).await;
        let root = self.root.lock().await;
        let el = root.find(id).ok_or(CaptureError::UnknownElement { id })?;
        Ok(el.expanded.unwrap_or(true))
    }

    pub async fn calls(&self) -> Vec<(String, String)> {
        self.call_log.lock().await.clone()
    }

    pub async fn call_count(&self, method: &str) -> usize {
        self.call_log
            .lock()
            .await
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    async fn log_call(&self, method: &str, arg: impl Into<String>) {
        self.call_log
            .lock()
            .await
            .push((method.to_string(), arg.into()));
    }
}

#[async_trait]
impl RenderSurface for SceneSurface {
    async fn fonts_ready(&self) -> Result<(), CaptureError> {
        self.log_call("fonts_ready", "").await;
        let mut rx = self.fonts.subscribe();
        rx.wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|e| CaptureError::FontsUnavailable {
                message: e.to_string(),
            })
    }

    async fn find_region(&self, region: &str) -> Result<Option<ElementId>, CaptureError> {
        self.log_call("find_region", region).await;
        Ok(self.root.lock().await.find_named(region).map(|e| e.id))
    }

    async fn set_expanded(&self, id: ElementId, expanded: bool) -> Result<(), CaptureError> {
        self.log_call("set_expanded", format!("{id}={expanded}")).await;
        let mut root = self.root.lock().await;
        let el = root
            .find_mut(id)
            .ok_or(CaptureError::UnknownElement { id })?;
        if el.expanded.is_some() {
            el.expanded = Some(expanded);
        }
        Ok(())
    }

    async fn collapsed_within(&self, id: ElementId) -> Result<Vec<ElementId>, CaptureError> {
        self.log_call("collapsed_within", id.to_string()).await;
        let root = self.root.lock().await;
        let el = root.find(id).ok_or(CaptureError::UnknownElement { id })?;
        Ok(el
            .descendants()
            .into_iter()
            .filter(|e| e.expanded == Some(false))
            .map(|e| e.id)
            .collect())
    }

    async fn clone_detached(&self, id: ElementId) -> Result<Element, CaptureError> {
        self.log_call("clone_detached", id.to_string()).await;
        let root = self.root.lock().await;
        let mut clone = root
            .find(id)
            .cloned()
            .ok_or(CaptureError::UnknownElement { id })?;
        clone.visit_mut(&mut |el| {
            if el.expanded.is_some() {
                el.expanded = Some(true);
            }
        });
        clone
            .style
            .insert("position".to_string(), "absolute".to_string());
        clone
            .style
            .insert("left".to_string(), OFFSCREEN_LEFT.to_string());
        Ok(clone)
    }

    async fn read_canvas(&self, id: ElementId) -> Result<RgbaImage, CaptureError> {
        self.log_call("read_canvas", id.to_string()).await;
        let root = self.root.lock().await;
        match root.find(id).map(|e| &e.kind) {
            Some(ElementKind::Canvas(bitmap)) => Ok(bitmap.as_ref().clone()),
            _ => Err(CaptureError::UnknownElement { id }),
        }
    }

    async fn rasterize(&self, element: &Element, scale: u32) -> Result<RgbaImage, CaptureError> {
        self.log_call("rasterize", scale.to_string()).await;
        if let Some(message) = self.raster_failure.lock().await.take() {
            return Err(CaptureError::RasterFailed { message });
        }
        raster::rasterize(element, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scene() -> SceneSurface {
        SceneSurface::new(
            Element::block().named("region").width(100).child(
                Element::block()
                    .named("details")
                    .collapsible(false)
                    .child(Element::text("hidden")),
            ),
        )
    }

    #[tokio::test]
    async fn test_find_region() {
        let surface = scene();
        assert_eq!(surface.find_region("region").await.unwrap(), Some(1));
        assert_eq!(surface.find_region("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expansion_roundtrip() {
        let surface = scene();
        assert!(!surface.is_expanded(2).await.unwrap());
        surface.set_expanded(2, true).await.unwrap();
        assert!(surface.is_expanded(2).await.unwrap());
        // plain blocks always report expanded
        assert!(surface.is_expanded(1).await.unwrap());
        assert!(matches!(
            surface.is_expanded(42).await,
            Err(CaptureError::UnknownElement { id: 42 })
        ));
    }

    #[tokio::test]
    async fn test_collapsed_within() {
        let surface = scene();
        assert_eq!(surface.collapsed_within(1).await.unwrap(), vec![2]);
        surface.set_expanded(2, true).await.unwrap();
        assert!(surface.collapsed_within(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clone_is_expanded_and_offscreen_without_touching_live_tree() {
        let surface = scene();
        let clone = surface.clone_detached(1).await.unwrap();
        assert_eq!(clone.find(2).unwrap().expanded, Some(true));
        assert_eq!(clone.style.get("left").map(String::as_str), Some(OFFSCREEN_LEFT));
        let live = surface.snapshot_tree().await;
        assert_eq!(live.find(2).unwrap().expanded, Some(false));
        assert!(!live.style.contains_key("left"));
    }

    #[tokio::test]
    async fn test_fonts_ready_waits_for_load() {
        let surface = Arc::new(SceneSurface::with_pending_fonts(Element::block()));
        let waiter = {
            let surface = Arc::clone(&surface);
            tokio::spawn(async move { surface.fonts_ready().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        surface.mark_fonts_loaded();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_injected_raster_failure_is_one_shot() {
        let surface = scene();
        surface.fail_next_rasterize("boom").await;
        let el = Element::block().size(4, 4);
        assert!(matches!(
            surface.rasterize(&el, 2).await,
            Err(CaptureError::RasterFailed { .. })
        ));
        assert!(surface.rasterize(&el, 2).await.is_ok());
        assert_eq!(surface.call_count("rasterize").await, 2);
    }
}
