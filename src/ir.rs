use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ChartError;

/// Stable identity of a chart node. Trees coming from JSON may use numbers
/// or strings; both normalise to the same textual key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Float(f64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(value) => NodeId(value.to_string()),
            RawId::Float(value) => NodeId(value.to_string()),
            RawId::Text(value) => NodeId(value),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avatar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "deserialize_report_count")]
    pub total_reports: u32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_image: bool,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Profile link, if one is set to something other than whitespace.
    pub fn link_url(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| !link.trim().is_empty())
    }

    /// True when the avatar reference can be embedded without loading.
    pub fn avatar_ready(&self) -> bool {
        self.has_image || self.avatar.starts_with("data:")
    }
}

fn deserialize_report_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawCount {
        Count(u64),
        Fraction(f64),
        Text(String),
    }

    let count = match Option::<RawCount>::deserialize(deserializer)? {
        Some(RawCount::Count(value)) => value.min(u32::MAX as u64) as u32,
        Some(RawCount::Fraction(value)) if value > 0.0 => value as u32,
        Some(RawCount::Text(text)) => {
            let text = text.trim();
            match text.parse::<u32>() {
                Ok(value) => value,
                Err(_) => match text.parse::<f64>() {
                    Ok(value) if value.is_finite() && value > 0.0 => value.min(u32::MAX as f64) as u32,
                    _ => 0,
                },
            }
        }
        _ => 0,
    };
    Ok(count)
}

/// `null` in the input means the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One person box in the hierarchy. Expanded children live in `children`,
/// collapsed ones are parked in `hidden_children` so a later expand restores
/// them untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub person: Person,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<TreeNode>,
    #[serde(default, rename = "_children", deserialize_with = "null_as_default")]
    pub hidden_children: Vec<TreeNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_child: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_parent: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_highlight: bool,
}

impl TreeNode {
    pub fn new(id: impl Into<NodeId>, person: Person) -> Self {
        Self {
            id: id.into(),
            person,
            children: Vec::new(),
            hidden_children: Vec::new(),
            has_child: false,
            has_parent: false,
            is_highlight: false,
        }
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.has_child = self.has_child || !children.is_empty();
        self.children = children;
        for child in &mut self.children {
            child.has_parent = true;
        }
        self
    }

    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_collapsed(&self) -> bool {
        self.children.is_empty() && !self.hidden_children.is_empty()
    }

    /// Reports exist on the server side but none have been loaded yet.
    pub fn needs_children(&self) -> bool {
        self.has_child && self.children.is_empty() && self.hidden_children.is_empty()
    }

    pub fn is_expandable(&self) -> bool {
        !self.children.is_empty() || !self.hidden_children.is_empty() || self.has_child
    }

    /// Moves expanded children into the hidden list. Returns false when there
    /// was nothing to collapse.
    pub fn collapse(&mut self) -> bool {
        if self.children.is_empty() {
            return false;
        }
        self.hidden_children = std::mem::take(&mut self.children);
        true
    }

    pub fn expand(&mut self) -> bool {
        if self.hidden_children.is_empty() {
            return false;
        }
        self.children = std::mem::take(&mut self.hidden_children);
        true
    }

    pub fn attach_children(&mut self, mut children: Vec<TreeNode>) {
        for child in &mut children {
            child.has_parent = true;
        }
        self.has_child = self.has_child || !children.is_empty();
        self.children = children;
        self.hidden_children.clear();
    }

    fn all_children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children.iter().chain(self.hidden_children.iter())
    }

    fn find(&self, id: &NodeId) -> Option<&TreeNode> {
        if &self.id == id {
            return Some(self);
        }
        self.all_children().find_map(|child| child.find(id))
    }

    fn find_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .chain(self.hidden_children.iter_mut())
            .find_map(|child| child.find_mut(id))
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a NodeId>) {
        out.push(&self.id);
        for child in self.all_children() {
            child.collect_ids(out);
        }
    }

    fn collect_nodes<'a>(&'a self, out: &mut HashMap<&'a NodeId, &'a TreeNode>) {
        out.insert(&self.id, self);
        for child in self.all_children() {
            child.collect_nodes(out);
        }
    }

    fn collapse_below(&mut self, depth: usize, max_depth: usize) {
        for child in self.children.iter_mut().chain(self.hidden_children.iter_mut()) {
            child.collapse_below(depth + 1, max_depth);
        }
        if depth >= max_depth {
            self.collapse();
        }
    }
}

/// A node reachable from the root through expanded children only.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNode<'a> {
    pub node: &'a TreeNode,
    pub parent: Option<&'a NodeId>,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgTree {
    root: TreeNode,
}

impl OrgTree {
    pub fn new(root: TreeNode) -> Result<Self, ChartError> {
        let tree = Self { root };
        tree.check_unique_ids()?;
        Ok(tree)
    }

    pub fn from_json(input: &str) -> Result<Self, ChartError> {
        let root: TreeNode = serde_json::from_str(input)?;
        Self::new(root)
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut TreeNode {
        &mut self.root
    }

    pub fn find(&self, id: &NodeId) -> Option<&TreeNode> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: &NodeId) -> Option<&mut TreeNode> {
        self.root.find_mut(id)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Result<&mut TreeNode, ChartError> {
        self.root
            .find_mut(id)
            .ok_or_else(|| ChartError::UnknownNode(id.clone()))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn ids(&self) -> Vec<&NodeId> {
        let mut ids = Vec::new();
        self.root.collect_ids(&mut ids);
        ids
    }

    /// Every node, expanded or not, keyed by id.
    pub fn index(&self) -> HashMap<&NodeId, &TreeNode> {
        let mut nodes = HashMap::new();
        self.root.collect_nodes(&mut nodes);
        nodes
    }

    /// Pre-order walk over the expanded part of the tree.
    pub fn visible(&self) -> Vec<VisibleNode<'_>> {
        let mut out = Vec::new();
        let mut stack = vec![(&self.root, None, 0usize)];
        while let Some((node, parent, depth)) = stack.pop() {
            out.push(VisibleNode {
                node,
                parent,
                depth,
            });
            for child in node.children.iter().rev() {
                stack.push((child, Some(&node.id), depth + 1));
            }
        }
        out
    }

    /// Collapses every node at `depth` or deeper (root is depth 0).
    pub fn collapse_to_depth(&mut self, depth: usize) {
        self.root.collapse_below(0, depth);
    }

    /// Replaces the root, e.g. after loading a supervisor above it.
    pub fn replace_root(&mut self, root: TreeNode) -> Result<(), ChartError> {
        let previous = std::mem::replace(&mut self.root, root);
        if let Err(err) = self.check_unique_ids() {
            self.root = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Fails when any of `candidates` would collide with an id already in the
    /// tree (or with each other).
    pub fn check_new_ids(&self, candidates: &[TreeNode]) -> Result<(), ChartError> {
        let mut seen: HashSet<&NodeId> = self.ids().into_iter().collect();
        let mut incoming = Vec::new();
        for candidate in candidates {
            candidate.collect_ids(&mut incoming);
        }
        for id in incoming {
            if !seen.insert(id) {
                return Err(ChartError::DuplicateId(id.clone()));
            }
        }
        Ok(())
    }

    fn check_unique_ids(&self) -> Result<(), ChartError> {
        let mut seen = HashSet::new();
        for id in self.ids() {
            if !seen.insert(id) {
                return Err(ChartError::DuplicateId(id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrgTree {
        let input = r#"{
            "id": 100,
            "person": {
                "id": 100,
                "name": "Richard Lozada",
                "title": "Full Stack Developer",
                "totalReports": "3",
                "label": "colaboradores"
            },
            "hasChild": true,
            "children": [
                { "id": 36, "person": { "name": "Tomasz" }, "hasParent": true,
                  "children": [ { "id": "x1", "person": { "name": "Deep" } } ] },
                { "id": 32, "person": { "name": "Emanuel", "totalReports": 0 } }
            ]
        }"#;
        OrgTree::from_json(input).expect("sample tree parses")
    }

    #[test]
    fn parses_numeric_string_report_count() {
        let tree = sample();
        assert_eq!(tree.root().person.total_reports, 3);
        assert_eq!(tree.root().id, NodeId::new("100"));
        assert_eq!(tree.root().person.department, None);
    }

    #[test]
    fn unparsable_report_count_is_zero() {
        let person: Person =
            serde_json::from_str(r#"{ "name": "A", "totalReports": "many" }"#).unwrap();
        assert_eq!(person.total_reports, 0);
        let person: Person = serde_json::from_str(r#"{ "name": "A", "totalReports": null }"#).unwrap();
        assert_eq!(person.total_reports, 0);
    }

    #[test]
    fn decimal_report_count_strings_are_numbers() {
        let person: Person =
            serde_json::from_str(r#"{ "name": "A", "totalReports": "3.0" }"#).unwrap();
        assert_eq!(person.total_reports, 3);
        let person: Person =
            serde_json::from_str(r#"{ "name": "A", "totalReports": " 12.7 " }"#).unwrap();
        assert_eq!(person.total_reports, 12);
        let person: Person =
            serde_json::from_str(r#"{ "name": "A", "totalReports": "-2.5" }"#).unwrap();
        assert_eq!(person.total_reports, 0);
    }

    #[test]
    fn null_fields_read_as_missing() {
        let input = r#"{
            "id": 1,
            "person": { "avatar": null, "name": null, "hasImage": null, "title": null },
            "hasChild": null,
            "isHighlight": null,
            "children": [
                { "id": 2, "person": null, "children": null, "_children": null }
            ]
        }"#;
        let tree = OrgTree::from_json(input).expect("nulls are tolerated");
        let root = tree.root();
        assert_eq!(root.person.avatar, "");
        assert_eq!(root.person.name, "");
        assert!(!root.person.has_image);
        assert_eq!(root.person.title, None);
        assert!(!root.is_highlight);
        let leaf = tree.find(&NodeId::new("2")).unwrap();
        assert_eq!(leaf.person, Person::default());
        assert!(leaf.children.is_empty());
        assert!(leaf.hidden_children.is_empty());
        assert_eq!(tree.visible().len(), 2);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let input = r#"{ "id": 1, "person": {}, "children": [
            { "id": 2, "person": {} },
            { "id": "2", "person": {} }
        ] }"#;
        let err = OrgTree::from_json(input).unwrap_err();
        assert!(matches!(err, ChartError::DuplicateId(id) if id.as_str() == "2"));
    }

    #[test]
    fn visible_walk_is_preorder_with_depths() {
        let tree = sample();
        let visible: Vec<(String, usize)> = tree
            .visible()
            .iter()
            .map(|v| (v.node.id.to_string(), v.depth))
            .collect();
        assert_eq!(
            visible,
            vec![
                ("100".to_string(), 0),
                ("36".to_string(), 1),
                ("x1".to_string(), 2),
                ("32".to_string(), 1),
            ]
        );
    }

    #[test]
    fn collapse_then_expand_restores_children() {
        let mut tree = sample();
        let before = tree.root().children.clone();
        let root = tree.root_mut();
        assert!(root.collapse());
        assert!(root.children.is_empty());
        assert!(root.is_collapsed());
        assert!(root.expand());
        assert_eq!(tree.root().children, before);
    }

    #[test]
    fn index_covers_collapsed_nodes() {
        let mut tree = sample();
        tree.find_mut(&NodeId::new("36")).unwrap().collapse();
        let index = tree.index();
        assert_eq!(index.len(), 4);
        assert_eq!(index[&NodeId::new("x1")].person.name, "Deep");
    }

    #[test]
    fn collapse_to_depth_hides_deeper_levels() {
        let mut tree = sample();
        tree.collapse_to_depth(1);
        let ids: Vec<String> = tree.visible().iter().map(|v| v.node.id.to_string()).collect();
        assert_eq!(ids, vec!["100", "36", "32"]);
        assert!(tree.find(&NodeId::new("x1")).is_some());
    }

    #[test]
    fn check_new_ids_detects_collisions() {
        let tree = sample();
        let fresh = vec![TreeNode::new("900", Person::new("New"))];
        assert!(tree.check_new_ids(&fresh).is_ok());
        let clash = vec![TreeNode::new("36", Person::new("Clash"))];
        assert!(tree.check_new_ids(&clash).is_err());
    }
}
