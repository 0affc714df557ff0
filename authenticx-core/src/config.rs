//! Configuration system for AuthenticX exports.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/authenticx/config.toml` and/or
//! `.authenticx/config.toml` in the workspace directory.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest supersampling factor accepted for widget capture.
pub const MIN_CAPTURE_SCALE: u32 = 2;

/// Smallest printable height a page may leave between its margins.
///
/// Every block the layout engine cannot split (a chart with its heading,
/// the first attack-path node under its heading, a table header with one
/// body line) fits in this height.
pub const MIN_PRINTABLE_HEIGHT: f32 = 80.0;

/// Smallest printable width; the bar chart and heatmap legend span this.
pub const MIN_PRINTABLE_WIDTH: f32 = 172.0;

/// Top-level configuration for report exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output: OutputConfig,
    pub page: PageConfig,
    pub capture: CaptureConfig,
    pub report: ReportConfig,
}

/// Where finished documents are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, relative paths resolve against the workspace.
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("reports"),
        }
    }
}

/// Physical page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// 210 x 297 mm
    #[default]
    A4,
    /// 215.9 x 279.4 mm
    Letter,
}

impl PageSize {
    /// Page dimensions in millimetres `(width, height)`, portrait.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
        }
    }
}

/// Page geometry, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub size: PageSize,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin_top: 20.0,
            margin_bottom: 20.0,
            margin_left: 14.0,
            margin_right: 14.0,
        }
    }
}

/// Live widget capture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Supersampling factor for raster capture (at least 2).
    pub scale: u32,
    /// Identifier of the heatmap widget's container region.
    pub heatmap_region: String,
    /// Wait for webfont readiness before capturing.
    pub wait_for_fonts: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            scale: MIN_CAPTURE_SCALE,
            heatmap_region: "heatmap-section".into(),
            wait_for_fonts: true,
        }
    }
}

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Value written to the document's `Producer` field.
    pub producer: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            producer: "AuthenticX".into(),
        }
    }
}

impl ExportConfig {
    /// Check geometry and clamp the capture scale.
    ///
    /// A scale below [`MIN_CAPTURE_SCALE`] is raised with a warning; margins
    /// that leave less than [`MIN_PRINTABLE_WIDTH`] by
    /// [`MIN_PRINTABLE_HEIGHT`] are rejected.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.capture.scale < MIN_CAPTURE_SCALE {
            tracing::warn!(
                "capture.scale {} is below the minimum, using {}",
                self.capture.scale,
                MIN_CAPTURE_SCALE
            );
            self.capture.scale = MIN_CAPTURE_SCALE;
        }

        let page = &self.page;
        for (field, value) in [
            ("page.margin_top", page.margin_top),
            ("page.margin_bottom", page.margin_bottom),
            ("page.margin_left", page.margin_left),
            ("page.margin_right", page.margin_right),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    message: format!("must be a non-negative number, got {value}"),
                });
            }
        }

        let (w, h) = page.size.dimensions_mm();
        let printable_w = w - page.margin_left - page.margin_right;
        if printable_w < MIN_PRINTABLE_WIDTH {
            return Err(ConfigError::Invalid {
                field: "page.margin_left".into(),
                message: format!(
                    "horizontal margins leave {printable_w:.1}mm, need at least {MIN_PRINTABLE_WIDTH}mm"
                ),
            });
        }
        let printable_h = h - page.margin_top - page.margin_bottom;
        if printable_h < MIN_PRINTABLE_HEIGHT {
            return Err(ConfigError::Invalid {
                field: "page.margin_top".into(),
                message: format!(
                    "vertical margins leave {printable_h:.1}mm, need at least {MIN_PRINTABLE_HEIGHT}mm"
                ),
            });
        }

        if self.capture.heatmap_region.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "capture.heatmap_region".into(),
                message: "must not be empty".into(),
            });
        }

        Ok(self)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Explicit per-field overrides, applied above every other layer.
///
/// Only fields that are set replace values from files and the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigOverrides {
    pub output: OutputOverrides,
    pub page: PageOverrides,
    pub capture: CaptureOverrides,
    pub report: ReportOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<PageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_top: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_bottom: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_left: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_right: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaptureOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_fonts: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}

impl ConfigOverrides {
    /// Override only the output directory.
    pub fn output_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            output: OutputOverrides {
                directory: Some(directory.into()),
            },
            ..Self::default()
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `AUTHENTICX_`)
/// 3. Workspace-local config (`.authenticx/config.toml`)
/// 4. User config (`~/.config/authenticx/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<ExportConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ExportConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // AUTHENTICX_CAPTURE__SCALE, AUTHENTICX_PAGE__SIZE, etc.
    figment = figment.merge(Env::prefixed("AUTHENTICX_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: ExportConfig = figment.extract().map_err(Box::new)?;
    config.validated()
}

/// Check whether any configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "authenticx", "authenticx")
        .map(|d| d.config_dir().join("config.toml"))
}

fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".authenticx").join("config.toml")
}
