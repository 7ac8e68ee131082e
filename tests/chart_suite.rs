use std::collections::HashMap;
use std::path::Path;

use org_chart_renderer::reconcile::Phase;
use org_chart_renderer::{
    ChartCallbacks, ClickOutcome, ClickTarget, Config, NodeId, OrgChart, OrgTree, Person, SvgMode,
    TreeNode,
};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).expect("fixture read failed")
}

fn assert_valid_svg(svg: &str) {
    assert!(svg.contains("<svg"), "missing <svg tag");
    assert!(svg.contains("</svg>"), "missing </svg tag");
}

#[derive(Default)]
struct Reports {
    pending: HashMap<String, Vec<TreeNode>>,
    link_clicks: usize,
}

impl ChartCallbacks for Reports {
    fn load_children(&mut self, node: &TreeNode) -> Option<Vec<TreeNode>> {
        self.pending.remove(node.id.as_str())
    }

    fn on_person_link_click(&mut self, _person: &Person, _url: &str) {
        self.link_clicks += 1;
    }
}

fn chart() -> OrgChart<Reports> {
    let tree = OrgTree::from_json(&fixture("tree.json")).expect("tree parses");
    let pending = serde_json::from_str(&fixture("reports.json")).expect("reports parse");
    OrgChart::with_callbacks(
        tree,
        Config::default(),
        Reports {
            pending,
            link_clicks: 0,
        },
    )
}

#[test]
fn renders_fixture_snapshot() {
    let mut chart = chart();
    let svg = chart.svg(SvgMode::Snapshot);
    assert_valid_svg(&svg);
    assert!(svg.contains("3 colaboradores"));
    assert!(svg.contains("FULL STACK DEVELOPER"));
    assert!(svg.contains("org-chart-person-link"));
    assert!(!svg.contains("<animate"));

    let frame = chart.frame().unwrap();
    assert_eq!(frame.nodes.len(), 6);
    let row = chart.config().chart.line_depth_y;
    for node in &frame.nodes {
        assert_eq!(node.to.y, node.depth as f32 * row);
    }
}

#[test]
fn lazy_reports_enter_from_their_manager() {
    let mut chart = chart();
    chart.render();
    let manager = NodeId::new("36");
    let before = chart.frame().unwrap().node(&manager).unwrap().to;

    let outcome = chart.click(&manager, ClickTarget::Card).unwrap();
    assert_eq!(
        outcome,
        ClickOutcome::ChildrenLoaded {
            id: manager.clone(),
            count: 2
        }
    );
    let frame = chart.frame().unwrap();
    let sam = frame.node(&NodeId::new("56")).unwrap();
    assert_eq!(sam.phase, Phase::Enter);
    assert_eq!(sam.from, before);

    let svg = chart.svg(SvgMode::Animated);
    assert_valid_svg(&svg);
    assert!(svg.contains("<animateTransform"));
}

#[test]
fn collapse_round_trip_restores_the_frame() {
    let mut chart = chart();
    chart.render();
    let manager = NodeId::new("25");
    let children = chart.tree().find(&manager).unwrap().children.clone();

    chart.click(&manager, ClickTarget::Reports).unwrap();
    let frame = chart.frame().unwrap();
    let exiting: Vec<&str> = frame
        .nodes
        .iter()
        .filter(|n| n.phase == Phase::Exit)
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(exiting, vec!["70", "45"]);
    let parent_now = frame.node(&manager).unwrap().to;
    assert!(frame
        .nodes
        .iter()
        .filter(|n| n.phase == Phase::Exit)
        .all(|n| n.to == parent_now));

    chart.click(&manager, ClickTarget::Reports).unwrap();
    assert_eq!(chart.tree().find(&manager).unwrap().children, children);
    assert_eq!(chart.frame().unwrap().nodes.len(), 6);
}

#[test]
fn link_click_leaves_chart_untouched() {
    let mut chart = chart();
    chart.render();
    let tree_before = chart.tree().clone();
    let frame_before = chart.frame().unwrap().clone();

    let outcome = chart
        .click(&NodeId::new("25"), ClickTarget::PersonLink)
        .unwrap();
    assert!(matches!(outcome, ClickOutcome::LinkOpened { .. }));
    assert_eq!(chart.tree(), &tree_before);
    assert_eq!(chart.frame().unwrap(), &frame_before);
    assert_eq!(chart.callbacks().link_clicks, 1);
}

#[test]
fn render_tree_json_helper_matches_chart() {
    let svg = org_chart_renderer::render_tree_json(&fixture("tree.json"), Config::default())
        .expect("render succeeds");
    assert_valid_svg(&svg);
    assert!(svg.contains("data-node-id=\"100\""));
}
