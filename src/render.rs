use crate::config::ChartConfig;
use crate::ir::{NodeId, OrgTree, Person, TreeNode};
use crate::layout::{Layout, NodeLayout, Point};
use crate::lines::{self, LinkFrame};
use crate::reconcile::{Phase, reconcile};
use crate::text::{self, Cursor};
use crate::theme::Theme;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const CHART_NODE_CLASS: &str = "org-chart-node";
pub const PERSON_LINK_CLASS: &str = "org-chart-person-link";
pub const PERSON_NAME_CLASS: &str = "org-chart-person-name";
pub const PERSON_TITLE_CLASS: &str = "org-chart-person-title";
pub const PERSON_HIGHLIGHT_CLASS: &str = "org-chart-person-highlight";
pub const PERSON_REPORTS_CLASS: &str = "org-chart-person-reports";

/// Offset of the supervisor icon from the root card's corner.
const SUPERVISOR_OFFSET: Point = Point { x: 70.0, y: -24.0 };
/// Room kept above the root row for the supervisor icon.
const TOP_GUTTER: f32 = 40.0;
const REPORTS_FONT_SCALE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvgMode {
    /// Replays the transition from the previous render with SMIL animations.
    Animated,
    /// Final state only; exiting nodes are left out.
    Snapshot,
}

/// Bounding extents of the chart, as reported back to the caller after
/// every render. `left_x` is the distance from the root to the leftmost
/// card and is therefore positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extents {
    pub left_x: f32,
    pub right_x: f32,
    pub max_y: f32,
}

impl Default for Extents {
    fn default() -> Self {
        Self {
            left_x: 70.0,
            right_x: 70.0,
            max_y: 200.0,
        }
    }
}

impl Extents {
    pub fn from_layout(layout: &Layout) -> Self {
        let mut left = -70.0f32;
        let mut right = 70.0f32;
        let mut max_y = 200.0f32;
        for node in &layout.nodes {
            left = left.min(node.x);
            right = right.max(node.x);
            max_y = max_y.max(node.y);
        }
        Self {
            left_x: -left,
            right_x: right,
            max_y,
        }
    }

    /// `(min_x, min_y, width, height)` covering every card plus the margin.
    pub fn view_box(&self, config: &ChartConfig) -> (f32, f32, f32, f32) {
        let min_x = -self.left_x - config.margin;
        let min_y = -TOP_GUTTER - config.margin;
        let width = self.left_x + self.right_x + config.node_width + config.margin * 2.0;
        let height = self.max_y + config.node_height + TOP_GUTTER + config.margin * 2.0;
        (min_x, min_y, width, height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardContent {
    pub name_lines: Vec<String>,
    pub name_font_size: f32,
    pub title_lines: Vec<String>,
    pub department: String,
    pub country: String,
    pub reports: String,
    pub report_lines: Vec<String>,
    pub avatar_href: Option<String>,
    pub link: Option<String>,
    #[serde(skip)]
    pub cursor: Cursor,
    pub highlight: bool,
}

impl CardContent {
    pub fn from_node(node: &TreeNode, theme: &Theme, config: &ChartConfig) -> Self {
        let person = &node.person;
        let name_font_size = if config.auto_name_font {
            text::resize_font(&person.name)
        } else {
            theme.font_size * 0.63
        };
        let title_font_size = theme.font_size * 0.63;
        let reports = text::report_text(person);
        Self {
            name_lines: text::wrap_text(
                &text::valid_text(&person.name),
                config.text_width(),
                name_font_size,
                &theme.font_family,
            ),
            name_font_size,
            title_lines: text::wrap_text(
                &text::valid_optional_text(person.title.as_deref()),
                config.text_width(),
                title_font_size,
                &theme.font_family,
            ),
            department: text::valid_optional_text(person.department.as_deref()),
            country: text::valid_optional_text(person.country.as_deref()),
            report_lines: text::wrap_text(
                &reports,
                config.text_width(),
                theme.font_size * REPORTS_FONT_SCALE,
                &theme.font_family,
            ),
            reports,
            avatar_href: avatar_href(person),
            link: person.link_url().map(str::to_string),
            cursor: text::cursor_for_node(node),
            highlight: node.is_highlight,
        }
    }
}

fn avatar_href(person: &Person) -> Option<String> {
    if person.avatar.trim().is_empty() {
        None
    } else {
        Some(person.avatar.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeFrame {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub phase: Phase,
    /// Card position when the transition starts.
    pub from: Point,
    /// Card position when the transition ends.
    pub to: Point,
    pub card: CardContent,
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub nodes: Vec<NodeFrame>,
    pub links: Vec<LinkFrame>,
    pub extents: Extents,
    pub duration_ms: u32,
    /// Position of the supervisor icon when the root reports to someone.
    pub supervisor: Option<Point>,
    /// Entering nodes whose avatar still has to be loaded.
    #[serde(skip)]
    pub avatar_requests: Vec<(NodeId, Person)>,
}

impl Frame {
    pub fn node(&self, id: &NodeId) -> Option<&NodeFrame> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut NodeFrame> {
        self.nodes.iter_mut().find(|node| &node.id == id)
    }
}

/// Retained render state: what was drawn last time and where.
#[derive(Debug, Default)]
pub struct Renderer {
    previous: HashMap<NodeId, Point>,
    parents: HashMap<NodeId, Option<NodeId>>,
    rendered: Vec<NodeId>,
    cards: HashMap<NodeId, CardContent>,
    extents: Extents,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_position(&self, id: &NodeId) -> Option<Point> {
        self.previous.get(id).copied()
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn is_rendered(&self, id: &NodeId) -> bool {
        self.rendered.contains(id)
    }

    /// Swaps in a loaded avatar on a card that is still on screen.
    pub fn set_avatar(&mut self, id: &NodeId, href: &str) -> bool {
        match self.cards.get_mut(id) {
            Some(card) if self.rendered.contains(id) => {
                card.avatar_href = Some(href.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn render(
        &mut self,
        tree: &OrgTree,
        layout: &Layout,
        theme: &Theme,
        config: &ChartConfig,
    ) -> Frame {
        let next_ids: Vec<NodeId> = layout.nodes.iter().map(|node| node.id.clone()).collect();
        let diff = reconcile(&self.rendered, &next_ids);
        let phases = diff.phases();
        let tree_nodes = tree.index();
        let by_id: HashMap<&NodeId, &NodeLayout> =
            layout.nodes.iter().map(|node| (&node.id, node)).collect();
        let root_position = layout
            .nodes
            .first()
            .map(NodeLayout::position)
            .unwrap_or_default();

        let mut nodes = Vec::with_capacity(layout.nodes.len() + diff.exiting.len());
        let mut avatar_requests = Vec::new();
        let mut starts: HashMap<NodeId, Point> = HashMap::new();

        for placed in &layout.nodes {
            let Some(node) = tree_nodes.get(&placed.id).copied() else {
                continue;
            };
            let to = placed.position();
            let updating = phases.get(&placed.id) == Some(&Phase::Update);
            let (phase, from) = match self.previous.get(&placed.id) {
                Some(previous) if updating => (Phase::Update, *previous),
                _ => (
                    Phase::Enter,
                    self.entering_origin(placed, &by_id).unwrap_or(root_position),
                ),
            };
            if phase == Phase::Enter && !node.person.avatar_ready() {
                avatar_requests.push((placed.id.clone(), node.person.clone()));
            }
            starts.insert(placed.id.clone(), from);
            nodes.push(NodeFrame {
                id: placed.id.clone(),
                parent: placed.parent.clone(),
                depth: placed.depth,
                phase,
                from,
                to,
                card: CardContent::from_node(node, theme, config),
            });
        }

        let mut exit_targets: HashMap<NodeId, Point> = HashMap::new();
        for id in &diff.exiting {
            let from = self.previous.get(id).copied().unwrap_or(root_position);
            let to = self.exit_target(id, &by_id).unwrap_or(root_position);
            let card = match tree_nodes.get(id) {
                Some(node) => CardContent::from_node(node, theme, config),
                None => match self.cards.get(id) {
                    Some(card) => card.clone(),
                    None => continue,
                },
            };
            starts.insert(id.clone(), from);
            exit_targets.insert(id.clone(), to);
            nodes.push(NodeFrame {
                id: id.clone(),
                parent: self.parents.get(id).cloned().flatten(),
                depth: 0,
                phase: Phase::Exit,
                from,
                to,
                card,
            });
        }

        let mut links = Vec::with_capacity(layout.links.len());
        for link in &layout.links {
            let (Some(parent), Some(child)) = (by_id.get(&link.source), by_id.get(&link.target))
            else {
                continue;
            };
            let child_from = starts.get(&link.target).copied().unwrap_or(child.position());
            let parent_from = starts.get(&link.source).copied().unwrap_or(parent.position());
            let phase = phases.get(&link.target).copied().unwrap_or(Phase::Update);
            let from = if phase == Phase::Enter {
                (child_from, child_from)
            } else {
                (parent_from, child_from)
            };
            links.push(LinkFrame::new(
                link.source.clone(),
                link.target.clone(),
                phase,
                from,
                (parent.position(), child.position()),
                config,
            ));
        }
        for id in &diff.exiting {
            let Some(Some(parent)) = self.parents.get(id) else {
                continue;
            };
            let (Some(child_from), Some(target)) = (self.previous.get(id), exit_targets.get(id))
            else {
                continue;
            };
            let parent_from = self.previous.get(parent).copied().unwrap_or(*target);
            links.push(LinkFrame::new(
                parent.clone(),
                id.clone(),
                Phase::Exit,
                (parent_from, *child_from),
                (*target, *target),
                config,
            ));
        }

        let supervisor = if tree.root().has_parent {
            Some(Point::new(
                root_position.x + SUPERVISOR_OFFSET.x,
                root_position.y + SUPERVISOR_OFFSET.y,
            ))
        } else {
            None
        };

        self.extents = Extents::from_layout(layout);
        self.previous = layout.positions();
        self.parents = layout
            .nodes
            .iter()
            .map(|node| (node.id.clone(), node.parent.clone()))
            .collect();
        self.cards = nodes
            .iter()
            .filter(|node| node.phase != Phase::Exit)
            .map(|node| (node.id.clone(), node.card.clone()))
            .collect();
        self.rendered = next_ids;

        debug!(
            entering = diff.entering.len(),
            updating = diff.updating.len(),
            exiting = diff.exiting.len(),
            "rendered chart frame"
        );

        Frame {
            nodes,
            links,
            extents: self.extents,
            duration_ms: config.animation_duration,
            supervisor,
            avatar_requests,
        }
    }

    /// Previous position of the nearest ancestor that was on screen last
    /// time, so new cards grow out of the card that revealed them.
    fn entering_origin(
        &self,
        placed: &NodeLayout,
        by_id: &HashMap<&NodeId, &NodeLayout>,
    ) -> Option<Point> {
        let mut cursor = placed.parent.as_ref();
        while let Some(id) = cursor {
            if let Some(previous) = self.previous.get(id) {
                return Some(*previous);
            }
            cursor = by_id.get(id).and_then(|node| node.parent.as_ref());
        }
        None
    }

    /// New position of the nearest previously known ancestor still laid out.
    fn exit_target(&self, id: &NodeId, by_id: &HashMap<&NodeId, &NodeLayout>) -> Option<Point> {
        let mut cursor = self.parents.get(id).and_then(Option::as_ref);
        while let Some(ancestor) = cursor {
            if let Some(node) = by_id.get(ancestor) {
                return Some(node.position());
            }
            cursor = self.parents.get(ancestor).and_then(Option::as_ref);
        }
        None
    }
}

pub fn render_svg(frame: &Frame, theme: &Theme, config: &ChartConfig, mode: SvgMode) -> String {
    let (min_x, min_y, width, height) = frame.extents.view_box(config);
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{min_x:.2} {min_y:.2} {width:.2} {height:.2}\">",
    ));
    svg.push_str("<defs>");
    svg.push_str("<filter id=\"boxShadow\" x=\"-20%\" y=\"-20%\" width=\"140%\" height=\"140%\"><feDropShadow dx=\"0\" dy=\"3\" stdDeviation=\"3\" flood-color=\"#000000\" flood-opacity=\"0.15\"/></filter>");
    svg.push_str("<clipPath id=\"avatarClip\" clipPathUnits=\"objectBoundingBox\"><circle cx=\"0.5\" cy=\"0.5\" r=\"0.5\"/></clipPath>");
    svg.push_str("</defs>");
    svg.push_str(&format!(
        "<rect x=\"{min_x:.2}\" y=\"{min_y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<g class=\"links\">");
    for link in &frame.links {
        if mode == SvgMode::Snapshot && link.phase == Phase::Exit {
            continue;
        }
        svg.push_str(&lines::link_svg(link, theme, mode, frame.duration_ms));
    }
    svg.push_str("</g>");

    if let (Some(position), Some(root)) = (frame.supervisor, frame.nodes.first()) {
        svg.push_str(&supervisor_svg(position, &root.id, theme));
    }

    for node in &frame.nodes {
        if mode == SvgMode::Snapshot && node.phase == Phase::Exit {
            continue;
        }
        svg.push_str(&node_svg(node, theme, config, mode, frame.duration_ms));
    }

    svg.push_str("</svg>");
    svg
}

fn node_svg(
    node: &NodeFrame,
    theme: &Theme,
    config: &ChartConfig,
    mode: SvgMode,
    duration_ms: u32,
) -> String {
    let card = &node.card;
    let id = escape_xml(node.id.as_str());
    let mut svg = String::new();
    svg.push_str(&format!(
        "<g id=\"node-{id}\" class=\"{CHART_NODE_CLASS}\" data-node-id=\"{id}\" transform=\"translate({:.2},{:.2})\">",
        node.to.x, node.to.y
    ));
    if mode == SvgMode::Animated {
        if node.from != node.to && duration_ms > 0 {
            svg.push_str(&format!(
                "<animateTransform attributeName=\"transform\" type=\"translate\" from=\"{:.2} {:.2}\" to=\"{:.2} {:.2}\" dur=\"{duration_ms}ms\" fill=\"freeze\"/>",
                node.from.x, node.from.y, node.to.x, node.to.y
            ));
        }
        if node.phase == Phase::Exit {
            svg.push_str(&lines::fade_out(duration_ms));
        }
    }

    let (w, h, r) = (config.node_width, config.node_height, config.node_border_radius);
    svg.push_str(&format!(
        "<rect width=\"{w:.2}\" height=\"{h:.2}\" rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"{}\" stroke=\"{}\" fill-opacity=\"0.05\" stroke-opacity=\"0.025\" filter=\"url(#boxShadow)\"/>",
        theme.card_background, theme.border_color
    ));
    let (class, stroke) = if card.highlight {
        (format!("{PERSON_HIGHLIGHT_CLASS} box"), theme.highlight_color.as_str())
    } else {
        ("box".to_string(), theme.border_color.as_str())
    };
    svg.push_str(&format!(
        "<rect id=\"box-{id}\" class=\"{class}\" data-target=\"card\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"{r:.2}\" ry=\"{r:.2}\" fill=\"{}\" stroke=\"{stroke}\" style=\"cursor: {}\"/>",
        theme.card_background,
        card.cursor.as_str()
    ));

    let center_x = w / 2.0;
    let name_y = config.name_y();
    let pad_y = config.node_padding_y;
    let small = theme.font_size * 0.63;

    svg.push_str(&text_svg(
        &TextSpec {
            class: PERSON_NAME_CLASS,
            target: Some("card"),
            x: center_x,
            y: name_y,
            font_size: card.name_font_size,
            bold: true,
            fill: &theme.name_color,
        },
        &card.name_lines,
        theme,
    ));
    svg.push_str(&text_svg(
        &TextSpec {
            class: PERSON_TITLE_CLASS,
            target: None,
            x: center_x,
            y: name_y + pad_y * 1.8,
            font_size: small,
            bold: false,
            fill: &theme.title_color,
        },
        &card.title_lines,
        theme,
    ));
    svg.push_str(&text_svg(
        &TextSpec {
            class: PERSON_TITLE_CLASS,
            target: None,
            x: center_x,
            y: name_y + pad_y * 2.0 + 30.0,
            font_size: small,
            bold: false,
            fill: &theme.title_color,
        },
        std::slice::from_ref(&card.department),
        theme,
    ));
    svg.push_str(&text_svg(
        &TextSpec {
            class: PERSON_TITLE_CLASS,
            target: None,
            x: center_x,
            y: name_y + pad_y * 2.4 + 53.0,
            font_size: theme.font_size * 0.55,
            bold: true,
            fill: &theme.title_color,
        },
        std::slice::from_ref(&card.country),
        theme,
    ));
    svg.push_str(&text_svg(
        &TextSpec {
            class: PERSON_REPORTS_CLASS,
            target: Some("reports"),
            x: center_x,
            y: name_y + pad_y * 2.4 + 65.0,
            font_size: theme.font_size * REPORTS_FONT_SCALE,
            bold: true,
            fill: &theme.reports_color,
        },
        &card.report_lines,
        theme,
    ));

    if let Some(href) = &card.avatar_href {
        let avatar = config.avatar_width;
        svg.push_str(&format!(
            "<image id=\"image-{id}\" data-target=\"card\" x=\"{:.2}\" y=\"{:.2}\" width=\"{avatar:.2}\" height=\"{avatar:.2}\" href=\"{}\" clip-path=\"url(#avatarClip)\" style=\"cursor: pointer\"/>",
            center_x - avatar / 2.0,
            pad_y / 2.0,
            escape_xml(href)
        ));
    }

    if let Some(link) = &card.link {
        svg.push_str(&link_icon_svg(link, w - 20.0, 8.0, theme));
    }

    svg.push_str("</g>");
    svg
}

struct TextSpec<'a> {
    class: &'a str,
    target: Option<&'a str>,
    x: f32,
    y: f32,
    font_size: f32,
    bold: bool,
    fill: &'a str,
}

fn text_svg(spec: &TextSpec<'_>, lines: &[String], theme: &Theme) -> String {
    let lines: Vec<&String> = lines.iter().filter(|line| !line.is_empty()).collect();
    if lines.is_empty() {
        return String::new();
    }
    let target = spec
        .target
        .map(|target| format!(" data-target=\"{target}\""))
        .unwrap_or_default();
    let weight = if spec.bold { " font-weight=\"700\"" } else { "" };
    let x = spec.x;
    let mut text = format!(
        "<text class=\"{}\"{target} x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\"{weight} fill=\"{}\">",
        spec.class,
        spec.y,
        escape_xml(&theme.font_family),
        spec.font_size,
        spec.fill
    );
    let line_height = spec.font_size * 1.2;
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

fn link_icon_svg(href: &str, x: f32, y: f32, theme: &Theme) -> String {
    format!(
        "<a class=\"{PERSON_LINK_CLASS}\" data-target=\"link\" href=\"{href}\" xlink:href=\"{href}\"><g transform=\"translate({x:.2},{y:.2})\"><rect width=\"12\" height=\"12\" fill=\"none\"/><path d=\"M 5 2 H 2 V 10 H 10 V 7 M 7 2 H 10 V 5 M 10 2 L 5 7\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.2\"/></g></a>",
        theme.link_icon_color,
        href = escape_xml(href)
    )
}

fn supervisor_svg(position: Point, root: &NodeId, theme: &Theme) -> String {
    format!(
        "<g id=\"supervisorIcon\" data-target=\"supervisor\" data-node-id=\"{}\" transform=\"translate({:.2},{:.2})\" style=\"cursor: pointer\"><circle cx=\"20\" cy=\"8\" r=\"10\" fill=\"{}\" stroke=\"{}\"/><path d=\"M 15 11 L 20 5 L 25 11\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/></g>",
        escape_xml(root.as_str()),
        position.x,
        position.y,
        theme.card_background,
        theme.border_color,
        theme.line_color
    )
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
