use crate::layout::Point;
use crate::reconcile::Phase;
use crate::render::{Extents, Frame};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct FrameDump {
    pub duration_ms: u32,
    pub extents: Extents,
    pub supervisor: Option<[f32; 2]>,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub parent: Option<String>,
    pub phase: Phase,
    pub from: [f32; 2],
    pub to: [f32; 2],
    pub name_lines: Vec<String>,
    pub reports: String,
    pub has_avatar: bool,
    pub has_link: bool,
}

#[derive(Debug, Serialize)]
pub struct LinkDump {
    pub source: String,
    pub target: String,
    pub phase: Phase,
    pub points: Vec<[f32; 2]>,
}

fn pair(point: Point) -> [f32; 2] {
    [point.x, point.y]
}

impl FrameDump {
    pub fn from_frame(frame: &Frame) -> Self {
        let nodes = frame
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.to_string(),
                parent: node.parent.as_ref().map(ToString::to_string),
                phase: node.phase,
                from: pair(node.from),
                to: pair(node.to),
                name_lines: node.card.name_lines.clone(),
                reports: node.card.reports.clone(),
                has_avatar: node.card.avatar_href.is_some(),
                has_link: node.card.link.is_some(),
            })
            .collect();

        let links = frame
            .links
            .iter()
            .map(|link| LinkDump {
                source: link.source.to_string(),
                target: link.target.to_string(),
                phase: link.phase,
                points: link.to.iter().copied().map(pair).collect(),
            })
            .collect();

        FrameDump {
            duration_ms: frame.duration_ms,
            extents: frame.extents,
            supervisor: frame.supervisor.map(pair),
            nodes,
            links,
        }
    }
}

pub fn write_frame_dump(path: &Path, frame: &Frame) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = FrameDump::from_frame(frame);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::chart::OrgChart;
    use crate::ir::{OrgTree, Person, TreeNode};

    #[test]
    fn dump_serialises_phases_and_points() {
        let root = TreeNode::new("1", Person::new("Root"))
            .with_children(vec![TreeNode::new("2", Person::new("Child"))]);
        let mut chart = OrgChart::new(OrgTree::new(root).unwrap(), Config::default());
        let dump = FrameDump::from_frame(chart.render());
        assert_eq!(dump.nodes.len(), 2);
        assert_eq!(dump.links[0].points.len(), 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.json");
        write_frame_dump(&path, chart.frame().unwrap()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["nodes"][0]["phase"], "enter");
        assert_eq!(value["nodes"][1]["parent"], "1");
    }
}
