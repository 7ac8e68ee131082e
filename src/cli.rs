use crate::avatar::{AvatarUpdate, FsAvatarLoader};
use crate::chart::OrgChart;
use crate::config::{Config, load_config};
use crate::dump::write_frame_dump;
use crate::export::{ExportFormat, write_export, write_output_svg};
use crate::interaction::{ChartCallbacks, ClickTarget};
use crate::ir::{NodeId, OrgTree, TreeNode};
use crate::render::SvgMode;
use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "orgc", version, about = "Organization chart renderer")]
pub struct Args {
    /// Org tree JSON file or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png/pdf). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Theme preset (classic, modern); overrides the config file
    #[arg(short = 't', long = "theme")]
    pub theme: Option<String>,

    /// Collapse every node at this depth or deeper before rendering
    #[arg(long = "collapse-depth")]
    pub collapse_depth: Option<usize>,

    /// Click these nodes (in order) before the final render
    #[arg(long = "toggle")]
    pub toggle: Vec<String>,

    /// JSON object mapping node ids to lazily loaded reports
    #[arg(long = "reports")]
    pub reports: Option<PathBuf>,

    /// Directory avatar references are resolved against; avatars are
    /// embedded as data URLs
    #[arg(long = "avatar-dir")]
    pub avatar_dir: Option<PathBuf>,

    /// Keep the transition from the previous render in the SVG
    #[arg(long = "animated")]
    pub animated: bool,

    /// Write the final render frame as JSON
    #[arg(long = "dump-frame")]
    pub dump_frame: Option<PathBuf>,

    /// Bitmap scale factor for PNG output
    #[arg(short = 's', long = "scale")]
    pub scale: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Pdf,
}

/// Serves lazily loaded reports from a prepared id → children map.
#[derive(Debug, Default)]
struct ReportsFile {
    reports: HashMap<String, Vec<TreeNode>>,
}

impl ChartCallbacks for ReportsFile {
    fn load_children(&mut self, node: &TreeNode) -> Option<Vec<TreeNode>> {
        self.reports.remove(node.id.as_str())
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let input = read_input(args.input.as_deref())?;
    let mut tree = OrgTree::from_json(&input).context("failed to load org tree")?;
    if let Some(depth) = args.collapse_depth {
        tree.collapse_to_depth(depth);
    }
    let callbacks = match args.reports.as_deref() {
        Some(path) => ReportsFile {
            reports: serde_json::from_str(&std::fs::read_to_string(path)?)
                .with_context(|| format!("failed to read reports from {}", path.display()))?,
        },
        None => ReportsFile::default(),
    };

    let mut chart = OrgChart::with_callbacks(tree, config, callbacks);
    if let Some(dir) = args.avatar_dir.as_deref() {
        chart = chart.with_avatar_loader(Arc::new(FsAvatarLoader::new(dir)));
    }

    chart.render();
    for raw in &args.toggle {
        let outcome = chart.click(&NodeId::new(raw.as_str()), ClickTarget::Card)?;
        info!(node = %raw, ?outcome, "toggled node");
    }

    for update in chart.wait_for_avatars(Duration::from_secs(10)) {
        if let AvatarUpdate::Failed(id, err) = update {
            warn!(node = %id, error = %err, "avatar not embedded");
        }
    }

    if let Some(path) = args.dump_frame.as_deref()
        && let Some(frame) = chart.frame()
    {
        write_frame_dump(path, frame)?;
    }

    match args.output_format {
        OutputFormat::Svg => {
            let mode = if args.animated {
                SvgMode::Animated
            } else {
                SvgMode::Snapshot
            };
            let svg = chart.svg(mode);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png | OutputFormat::Pdf => {
            let format = if args.output_format == OutputFormat::Png {
                ExportFormat::Png
            } else {
                ExportFormat::Pdf
            };
            let output = ensure_output(&args.output, format.extension())?;
            let svg = chart.svg(SvgMode::Snapshot);
            write_export(&svg, format, &output, &chart.config().render)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init();
}

fn apply_overrides(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(name) = args.theme.as_deref() {
        config.theme =
            Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("unknown theme '{name}'"))?;
    }
    if let Some(scale) = args.scale {
        config.render.scale = scale.max(0.1);
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_argument_set() {
        let args = Args::try_parse_from([
            "orgc",
            "-i",
            "tree.json",
            "-e",
            "pdf",
            "-o",
            "chart.pdf",
            "--toggle",
            "36",
            "--toggle",
            "25",
            "--collapse-depth",
            "1",
        ])
        .unwrap();
        assert_eq!(args.output_format, OutputFormat::Pdf);
        assert_eq!(args.toggle, vec!["36", "25"]);
        assert_eq!(args.collapse_depth, Some(1));
    }

    #[test]
    fn binary_formats_need_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        assert!(ensure_output(&Some(PathBuf::from("a.png")), "png").is_ok());
    }

    #[test]
    fn reports_file_serves_each_entry_once() {
        let mut callbacks = ReportsFile {
            reports: serde_json::from_str(r#"{ "36": [ { "id": 70, "person": { "name": "Kenneth" } } ] }"#)
                .unwrap(),
        };
        let mut node = TreeNode::new("36", crate::ir::Person::new("Tomasz"));
        node.has_child = true;
        assert_eq!(callbacks.load_children(&node).map(|c| c.len()), Some(1));
        assert!(callbacks.load_children(&node).is_none());
    }

    #[test]
    fn theme_and_scale_overrides_apply() {
        let mut config = Config::default();
        let args = Args::try_parse_from(["orgc", "--theme", "modern", "--scale", "3"]).unwrap();
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.theme.background, Theme::modern().background);
        assert_eq!(config.render.scale, 3.0);
    }
}
