pub mod avatar;
pub mod chart;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dump;
pub mod error;
pub mod export;
pub mod interaction;
pub mod ir;
pub mod layout;
pub mod lines;
pub mod reconcile;
pub mod render;
pub mod text;
pub mod text_metrics;
pub mod theme;

pub use chart::OrgChart;
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{ChartConfig, Config, RenderConfig};
pub use error::{ChartError, ExportError, ImageLoadError};
pub use interaction::{ChartCallbacks, ClickOutcome, ClickTarget};
pub use ir::{NodeId, OrgTree, Person, TreeNode};
pub use layout::{DagreTreeLayout, TreeLayout, compute_layout};
pub use render::{Frame, SvgMode, render_svg};
pub use theme::Theme;

/// Parses an org tree from JSON and renders its snapshot svg.
pub fn render_tree_json(input: &str, config: Config) -> Result<String, ChartError> {
    let tree = OrgTree::from_json(input)?;
    let mut chart = OrgChart::new(tree, config);
    Ok(chart.svg(SvgMode::Snapshot))
}
