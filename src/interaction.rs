use crate::config::ChartConfig;
use crate::error::ChartError;
use crate::ir::{NodeId, OrgTree, Person, TreeNode};
use crate::render::Extents;
use tracing::{debug, info};

/// Part of a card that received a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Card,
    Reports,
    PersonLink,
    Supervisor,
}

impl ClickTarget {
    /// Parses the `data-target` attribute written into the svg.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "card" => Some(Self::Card),
            "reports" => Some(Self::Reports),
            "link" => Some(Self::PersonLink),
            "supervisor" => Some(Self::Supervisor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Expanded(NodeId),
    Collapsed(NodeId),
    /// Reports were fetched through `load_children` and expanded.
    ChildrenLoaded { id: NodeId, count: usize },
    LinkOpened { id: NodeId, url: String },
    /// A supervisor became the new root.
    Rerooted { previous: NodeId, root: NodeId },
    Ignored,
}

impl ClickOutcome {
    /// Whether the chart must be redrawn.
    pub fn needs_render(&self) -> bool {
        !matches!(self, ClickOutcome::LinkOpened { .. } | ClickOutcome::Ignored)
    }
}

/// Hooks the host application supplies. Every method has a no-op default.
pub trait ChartCallbacks {
    fn on_click_node(&mut self, _node: &TreeNode) {}

    fn on_person_link_click(&mut self, _person: &Person, _url: &str) {}

    fn on_config_change(&mut self, _config: &ChartConfig, _extents: &Extents) {}

    /// Reports of a node flagged `has_child` whose children were never loaded.
    fn load_children(&mut self, _node: &TreeNode) -> Option<Vec<TreeNode>> {
        None
    }

    /// The supervisor of the current root, with whatever other reports it has.
    fn load_parent(&mut self, _root: &TreeNode) -> Option<TreeNode> {
        None
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl ChartCallbacks for NoopCallbacks {}

pub fn handle_click(
    tree: &mut OrgTree,
    id: &NodeId,
    target: ClickTarget,
    callbacks: &mut dyn ChartCallbacks,
) -> Result<ClickOutcome, ChartError> {
    let node = tree
        .find(id)
        .ok_or_else(|| ChartError::UnknownNode(id.clone()))?;
    debug!(node = %id, ?target, "chart click");

    match target {
        ClickTarget::PersonLink => {
            let Some(url) = node.person.link_url().map(str::to_string) else {
                return Ok(ClickOutcome::Ignored);
            };
            callbacks.on_person_link_click(&node.person, &url);
            Ok(ClickOutcome::LinkOpened {
                id: id.clone(),
                url,
            })
        }
        ClickTarget::Card | ClickTarget::Reports => {
            if target == ClickTarget::Card {
                callbacks.on_click_node(node);
            }
            toggle(tree, id, callbacks)
        }
        ClickTarget::Supervisor => reroot(tree, callbacks),
    }
}

/// Expands or collapses `id`, loading its reports first if needed.
pub fn toggle(
    tree: &mut OrgTree,
    id: &NodeId,
    callbacks: &mut dyn ChartCallbacks,
) -> Result<ClickOutcome, ChartError> {
    let node = tree.get_mut(id)?;
    if node.collapse() {
        return Ok(ClickOutcome::Collapsed(id.clone()));
    }
    if node.expand() {
        return Ok(ClickOutcome::Expanded(id.clone()));
    }
    if !node.needs_children() {
        return Ok(ClickOutcome::Ignored);
    }

    let Some(children) = callbacks.load_children(node) else {
        return Ok(ClickOutcome::Ignored);
    };
    tree.check_new_ids(&children)?;
    let count = children.len();
    let node = tree.get_mut(id)?;
    if count == 0 {
        // Nothing to show after all; stop advertising reports.
        node.has_child = false;
        return Ok(ClickOutcome::Ignored);
    }
    node.attach_children(children);
    info!(node = %id, count, "loaded reports");
    Ok(ClickOutcome::ChildrenLoaded {
        id: id.clone(),
        count,
    })
}

fn reroot(tree: &mut OrgTree, callbacks: &mut dyn ChartCallbacks) -> Result<ClickOutcome, ChartError> {
    if !tree.root().has_parent {
        return Ok(ClickOutcome::Ignored);
    }
    let Some(mut parent) = callbacks.load_parent(tree.root()) else {
        return Ok(ClickOutcome::Ignored);
    };
    let previous = tree.root().id.clone();
    let old_root = tree.root().clone();

    // The old root has to stay visible, so a collapsed supervisor is opened.
    if !parent.hidden_children.is_empty() {
        let hidden = std::mem::take(&mut parent.hidden_children);
        parent.children.extend(hidden);
    }
    match parent.children.iter_mut().find(|child| child.id == previous) {
        Some(slot) => *slot = old_root,
        None => parent.children.push(old_root),
    }
    for child in &mut parent.children {
        child.has_parent = true;
    }
    parent.has_child = true;
    let root = parent.id.clone();
    tree.replace_root(parent)?;
    info!(previous = %previous, root = %root, "moved chart root up to supervisor");
    Ok(ClickOutcome::Rerooted { previous, root })
}
