use crate::config::ChartConfig;
use crate::ir::NodeId;
use crate::layout::Point;
use crate::reconcile::Phase;
use crate::render::{SvgMode, escape_xml};
use crate::theme::Theme;
use serde::Serialize;

/// Connector from a parent's bottom-centre to a child's top-centre, drawn as
/// an elbow through the vertical midpoint. Always four points so animated
/// paths keep the same command structure.
pub fn elbow_points(parent: Point, child: Point, config: &ChartConfig) -> [Point; 4] {
    let half = config.node_width / 2.0;
    let start = Point::new(parent.x + half, parent.y + config.node_height);
    let end = Point::new(child.x + half, child.y);
    let mid_y = start.y + (end.y - start.y) / 2.0;
    [start, Point::new(start.x, mid_y), Point::new(end.x, mid_y), end]
}

pub fn points_to_path(points: &[Point]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.x, first.y);
    for point in &points[1..] {
        d.push_str(&format!(" L {:.2} {:.2}", point.x, point.y));
    }
    d
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkFrame {
    pub source: NodeId,
    pub target: NodeId,
    pub phase: Phase,
    pub from: [Point; 4],
    pub to: [Point; 4],
}

impl LinkFrame {
    /// `parent_*`/`child_*` are card positions at the start and the end of
    /// the transition.
    pub fn new(
        source: NodeId,
        target: NodeId,
        phase: Phase,
        (parent_from, child_from): (Point, Point),
        (parent_to, child_to): (Point, Point),
        config: &ChartConfig,
    ) -> Self {
        Self {
            source,
            target,
            phase,
            from: elbow_points(parent_from, child_from, config),
            to: elbow_points(parent_to, child_to, config),
        }
    }
}

pub fn link_svg(link: &LinkFrame, theme: &Theme, mode: SvgMode, duration_ms: u32) -> String {
    let id = format!("link-{}-{}", link.source, link.target);
    match mode {
        SvgMode::Snapshot => format!(
            "<path id=\"{}\" class=\"link\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>",
            escape_xml(&id),
            points_to_path(&link.to),
            theme.line_color
        ),
        SvgMode::Animated => {
            let from = points_to_path(&link.from);
            let to = points_to_path(&link.to);
            let mut svg = format!(
                "<path id=\"{}\" class=\"link\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\">",
                escape_xml(&id),
                to,
                theme.line_color
            );
            if from != to && duration_ms > 0 {
                svg.push_str(&format!(
                    "<animate attributeName=\"d\" from=\"{from}\" to=\"{to}\" dur=\"{duration_ms}ms\" fill=\"freeze\"/>"
                ));
            }
            if link.phase == Phase::Exit {
                svg.push_str(&fade_out(duration_ms));
            }
            svg.push_str("</path>");
            svg
        }
    }
}

pub(crate) fn fade_out(duration_ms: u32) -> String {
    format!(
        "<animate attributeName=\"opacity\" from=\"1\" to=\"0\" dur=\"{}ms\" fill=\"freeze\"/>",
        duration_ms.max(1)
    )
}
