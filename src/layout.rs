use crate::config::ChartConfig;
use crate::ir::{NodeId, OrgTree, VisibleNode};
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A placed card. `x`/`y` are the card's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NodeLayout {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLayout {
    pub source: NodeId,
    pub target: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Visible nodes in pre-order; the root comes first.
    pub nodes: Vec<NodeLayout>,
    pub links: Vec<LinkLayout>,
}

impl Layout {
    pub fn node(&self, id: &NodeId) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub fn positions(&self) -> HashMap<NodeId, Point> {
        self.nodes
            .iter()
            .map(|node| (node.id.clone(), node.position()))
            .collect()
    }
}

/// Horizontal placement capability. Implementations return the horizontal
/// centre of every node they were given; vertical placement is fixed by
/// depth and never delegated.
pub trait TreeLayout {
    fn place(&self, nodes: &[VisibleNode<'_>], config: &ChartConfig) -> HashMap<NodeId, f32>;
}

/// Places nodes with the dagre hierarchical layout, ranked top to bottom.
#[derive(Debug, Clone, Copy, Default)]
pub struct DagreTreeLayout;

impl TreeLayout for DagreTreeLayout {
    fn place(&self, nodes: &[VisibleNode<'_>], config: &ChartConfig) -> HashMap<NodeId, f32> {
        let mut centers = HashMap::new();
        if nodes.is_empty() {
            return centers;
        }

        let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
            DagreGraph::new(Some(GraphOption {
                directed: Some(true),
                multigraph: Some(false),
                compound: Some(false),
            }));

        let mut graph_config = DagreConfig::default();
        graph_config.rankdir = Some("tb".to_string());
        graph_config.nodesep = Some(config.node_spacing);
        graph_config.ranksep = Some((config.line_depth_y - config.node_height).max(1.0));
        graph_config.marginx = Some(0.0);
        graph_config.marginy = Some(0.0);
        dagre_graph.set_graph(graph_config);

        for visible in nodes {
            let mut node = DagreNode::default();
            node.width = config.node_width;
            node.height = config.node_height;
            dagre_graph.set_node(visible.node.id.to_string(), Some(node));
        }

        for visible in nodes {
            let Some(parent) = visible.parent else {
                continue;
            };
            let from = parent.to_string();
            let to = visible.node.id.to_string();
            let _ = dagre_graph.set_edge(&from, &to, Some(DagreEdge::default()), None);
        }

        dagre_layout::run_layout(&mut dagre_graph);

        for visible in nodes {
            let key = visible.node.id.to_string();
            let Some(dagre_node) = dagre_graph.node(&key) else {
                continue;
            };
            centers.insert(visible.node.id.clone(), dagre_node.x);
        }
        centers
    }
}

/// Lays out the expanded part of `tree`. The root's card starts at x = 0 and
/// every card's y is `depth * line_depth_y`.
pub fn compute_layout(tree: &OrgTree, engine: &dyn TreeLayout, config: &ChartConfig) -> Layout {
    let visible = tree.visible();
    let centers = engine.place(&visible, config);
    let root_center = centers
        .get(&tree.root().id)
        .copied()
        .unwrap_or(config.node_width / 2.0);

    let mut layout = Layout::default();
    for entry in &visible {
        let center = match centers.get(&entry.node.id) {
            Some(center) => *center,
            None => {
                warn!(node = %entry.node.id, "layout engine returned no position");
                root_center
            }
        };
        layout.nodes.push(NodeLayout {
            id: entry.node.id.clone(),
            parent: entry.parent.cloned(),
            depth: entry.depth,
            x: center - root_center,
            y: entry.depth as f32 * config.line_depth_y,
            width: config.node_width,
            height: config.node_height,
        });
        if let Some(parent) = entry.parent {
            layout.links.push(LinkLayout {
                source: parent.clone(),
                target: entry.node.id.clone(),
            });
        }
    }
    debug!(
        nodes = layout.nodes.len(),
        links = layout.links.len(),
        "computed chart layout"
    );
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Person, TreeNode};

    fn tree() -> OrgTree {
        let leaf = |id: &str| TreeNode::new(id, Person::new(id));
        let root = TreeNode::new("root", Person::new("Root")).with_children(vec![
            leaf("a").with_children(vec![leaf("a1"), leaf("a2")]),
            leaf("b"),
        ]);
        OrgTree::new(root).unwrap()
    }

    #[test]
    fn y_is_depth_times_row_height() {
        let config = ChartConfig {
            line_depth_y: 40.0,
            node_height: 30.0,
            ..ChartConfig::default()
        };
        let layout = compute_layout(&tree(), &DagreTreeLayout, &config);
        assert_eq!(layout.nodes.len(), 5);
        for node in &layout.nodes {
            assert_eq!(node.y, node.depth as f32 * 40.0);
        }
        let a1 = layout.node(&NodeId::new("a1")).unwrap();
        assert_eq!(a1.depth, 2);
        assert_eq!(a1.y, 80.0);
    }

    #[test]
    fn root_is_anchored_at_origin_and_links_follow_hierarchy() {
        let layout = compute_layout(&tree(), &DagreTreeLayout, &ChartConfig::default());
        let root = &layout.nodes[0];
        assert_eq!(root.id, NodeId::new("root"));
        assert_eq!(root.x, 0.0);
        assert_eq!(layout.links.len(), 4);
        assert!(layout.links.contains(&LinkLayout {
            source: NodeId::new("a"),
            target: NodeId::new("a2"),
        }));
    }

    #[test]
    fn collapsed_children_are_not_laid_out() {
        let mut tree = tree();
        tree.find_mut(&NodeId::new("a")).unwrap().collapse();
        let layout = compute_layout(&tree, &DagreTreeLayout, &ChartConfig::default());
        assert!(layout.node(&NodeId::new("a1")).is_none());
        assert_eq!(layout.nodes.len(), 3);
    }

    struct Columns;

    impl TreeLayout for Columns {
        fn place(&self, nodes: &[VisibleNode<'_>], _config: &ChartConfig) -> HashMap<NodeId, f32> {
            nodes
                .iter()
                .enumerate()
                .map(|(idx, v)| (v.node.id.clone(), 100.0 + idx as f32 * 50.0))
                .collect()
        }
    }

    #[test]
    fn injected_engine_positions_are_shifted_to_root() {
        let layout = compute_layout(&tree(), &Columns, &ChartConfig::default());
        let xs: Vec<f32> = layout.nodes.iter().map(|n| n.x).collect();
        assert_eq!(xs, vec![0.0, 50.0, 100.0, 150.0, 200.0]);
    }
}
