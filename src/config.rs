use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Card geometry, spacing and behaviour of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    /// Transition length in milliseconds.
    pub animation_duration: u32,
    pub node_width: f32,
    pub node_height: f32,
    /// Horizontal gap handed to the layout engine between sibling cards.
    pub node_spacing: f32,
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub node_border_radius: f32,
    pub avatar_width: f32,
    /// Row height: every card sits at `depth * line_depth_y`.
    pub line_depth_y: f32,
    pub wrap_width: f32,
    pub margin: f32,
    /// Scale the name font down as names get longer.
    pub auto_name_font: bool,
    pub download_image_trigger_id: Option<String>,
    pub download_pdf_trigger_id: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            animation_duration: 350,
            node_width: 180.0,
            node_height: 200.0,
            node_spacing: 24.0,
            node_padding_x: 16.0,
            node_padding_y: 16.0,
            node_border_radius: 4.0,
            avatar_width: 40.0,
            line_depth_y: 260.0,
            wrap_width: 124.0,
            margin: 40.0,
            auto_name_font: false,
            download_image_trigger_id: Some("download-image".to_string()),
            download_pdf_trigger_id: Some("download-pdf".to_string()),
        }
    }
}

impl ChartConfig {
    /// Baseline of the name line, measured from the card's top edge.
    pub fn name_y(&self) -> f32 {
        self.node_padding_y * 1.8 + self.avatar_width
    }

    /// Wrap width for card text, kept inside the horizontal padding.
    pub fn text_width(&self) -> f32 {
        let inner = (self.node_width - self.node_padding_x * 2.0).max(0.0);
        self.wrap_width.min(inner)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Pixel multiplier for bitmap export.
    pub scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { scale: 2.0 }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub chart: ChartConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::classic(),
            chart: ChartConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    chart: Option<ChartConfigFile>,
    scale: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background_color: Option<String>,
    card_color: Option<String>,
    name_color: Option<String>,
    title_color: Option<String>,
    reports_color: Option<String>,
    border_color: Option<String>,
    highlight_color: Option<String>,
    line_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartConfigFile {
    animation_duration: Option<u32>,
    node_width: Option<f32>,
    node_height: Option<f32>,
    node_spacing: Option<f32>,
    node_padding_x: Option<f32>,
    node_padding_y: Option<f32>,
    node_border_radius: Option<f32>,
    avatar_width: Option<f32>,
    line_depth_y: Option<f32>,
    wrap_width: Option<f32>,
    margin: Option<f32>,
    auto_name_font: Option<bool>,
    download_image_trigger_id: Option<String>,
    download_pdf_trigger_id: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme '{theme_name}'"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.background_color {
            config.theme.background = v;
        }
        if let Some(v) = vars.card_color {
            config.theme.card_background = v;
        }
        if let Some(v) = vars.name_color {
            config.theme.name_color = v;
        }
        if let Some(v) = vars.title_color {
            config.theme.title_color = v;
        }
        if let Some(v) = vars.reports_color {
            config.theme.reports_color = v;
        }
        if let Some(v) = vars.border_color {
            config.theme.border_color = v;
        }
        if let Some(v) = vars.highlight_color {
            config.theme.highlight_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
    }

    if let Some(chart) = parsed.chart {
        let c = &mut config.chart;
        if let Some(v) = chart.animation_duration {
            c.animation_duration = v;
        }
        if let Some(v) = chart.node_width {
            c.node_width = v;
        }
        if let Some(v) = chart.node_height {
            c.node_height = v;
        }
        if let Some(v) = chart.node_spacing {
            c.node_spacing = v;
        }
        if let Some(v) = chart.node_padding_x {
            c.node_padding_x = v;
        }
        if let Some(v) = chart.node_padding_y {
            c.node_padding_y = v;
        }
        if let Some(v) = chart.node_border_radius {
            c.node_border_radius = v;
        }
        if let Some(v) = chart.avatar_width {
            c.avatar_width = v;
        }
        if let Some(v) = chart.line_depth_y {
            c.line_depth_y = v;
        }
        if let Some(v) = chart.wrap_width {
            c.wrap_width = v;
        }
        if let Some(v) = chart.margin {
            c.margin = v;
        }
        if let Some(v) = chart.auto_name_font {
            c.auto_name_font = v;
        }
        if chart.download_image_trigger_id.is_some() {
            c.download_image_trigger_id = chart.download_image_trigger_id;
        }
        if chart.download_pdf_trigger_id.is_some() {
            c.download_pdf_trigger_id = chart.download_pdf_trigger_id;
        }
    }

    if let Some(scale) = parsed.scale {
        config.render.scale = scale.max(0.1);
    }

    Ok(config)
}
