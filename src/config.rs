use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Columns per row in the wrapped network-interface grid.
    pub wrap_columns: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self { wrap_columns: 7 }
    }
}

/// Page geometry for the paginated emitter. Defaults describe A4 portrait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOptions {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
    pub row_height_mm: f32,
    pub font_size: f32,
    pub line_width_mm: f32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 10.0,
            row_height_mm: 10.0,
            font_size: 10.0,
            line_width_mm: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutOptions,
    pub page: PageOptions,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutOptionsFile {
    wrap_columns: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PageOptionsFile {
    width_mm: Option<f32>,
    height_mm: Option<f32>,
    margin_mm: Option<f32>,
    row_height_mm: Option<f32>,
    font_size: Option<f32>,
    line_width_mm: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutOptionsFile>,
    page: Option<PageOptionsFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.wrap_columns {
            config.layout.wrap_columns = v.max(1);
        }
    }
    if let Some(page) = parsed.page {
        if let Some(v) = page.width_mm {
            config.page.width_mm = v;
        }
        if let Some(v) = page.height_mm {
            config.page.height_mm = v;
        }
        if let Some(v) = page.margin_mm {
            config.page.margin_mm = v;
        }
        if let Some(v) = page.row_height_mm {
            config.page.row_height_mm = v;
        }
        if let Some(v) = page.font_size {
            config.page.font_size = v;
        }
        if let Some(v) = page.line_width_mm {
            config.page.line_width_mm = v;
        }
    }

    Ok(config)
}
