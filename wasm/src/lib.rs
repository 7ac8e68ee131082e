use org_chart_renderer::{ClickTarget, Config, NodeId, OrgChart, OrgTree, SvgMode, Theme};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    animation_duration: Option<u32>,
    line_depth_y: Option<f32>,
    node_width: Option<f32>,
    node_height: Option<f32>,
}

fn build_config(options: ChartRenderOptions) -> Config {
    let mut config = Config::default();
    if let Some(theme) = options.theme.as_deref().and_then(Theme::by_name) {
        config.theme = theme;
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(duration) = options.animation_duration {
        config.chart.animation_duration = duration;
    }
    if let Some(line_depth_y) = options.line_depth_y {
        config.chart.line_depth_y = line_depth_y;
    }
    if let Some(width) = options.node_width {
        config.chart.node_width = width;
    }
    if let Some(height) = options.node_height {
        config.chart.node_height = height;
    }
    config
}

fn parse_options(options_json: Option<String>) -> Result<ChartRenderOptions, JsValue> {
    match options_json {
        Some(raw) => serde_json::from_str::<ChartRenderOptions>(&raw)
            .map_err(|error| JsValue::from_str(&error.to_string())),
        None => Ok(ChartRenderOptions::default()),
    }
}

#[wasm_bindgen]
pub fn render_org_chart_svg(tree_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let config = build_config(parse_options(options_json)?);
    org_chart_renderer::render_tree_json(tree_json, config)
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

/// A chart kept alive between clicks so transitions animate from the
/// previous render.
#[wasm_bindgen]
pub struct OrgChartHandle {
    chart: OrgChart,
}

#[wasm_bindgen]
impl OrgChartHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(tree_json: &str, options_json: Option<String>) -> Result<OrgChartHandle, JsValue> {
        let config = build_config(parse_options(options_json)?);
        let tree = OrgTree::from_json(tree_json).map_err(|error| JsValue::from_str(&error.to_string()))?;
        let mut chart = OrgChart::new(tree, config);
        chart.render();
        Ok(Self { chart })
    }

    /// Handles a click on an element carrying `data-node-id`/`data-target`
    /// and returns the animated svg of the resulting render.
    pub fn click(&mut self, node_id: &str, target: &str) -> Result<String, JsValue> {
        let target = ClickTarget::from_attr(target)
            .ok_or_else(|| JsValue::from_str(&format!("unknown click target '{target}'")))?;
        self.chart
            .click(&NodeId::new(node_id), target)
            .map_err(|error| JsValue::from_str(&error.to_string()))?;
        Ok(self.chart.svg(SvgMode::Animated))
    }

    pub fn svg(&mut self) -> String {
        self.chart.svg(SvgMode::Animated)
    }
}
