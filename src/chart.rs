use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::avatar::{AvatarEvent, AvatarLoader, AvatarPipeline, AvatarUpdate};
use crate::config::Config;
use crate::error::{ChartError, ExportError, ImageLoadError};
use crate::export::{self, ExportFormat};
use crate::interaction::{self, ChartCallbacks, ClickOutcome, ClickTarget, NoopCallbacks};
use crate::ir::{NodeId, OrgTree};
use crate::layout::{DagreTreeLayout, TreeLayout, compute_layout};
use crate::render::{Frame, Renderer, SvgMode, render_svg};

/// A mounted chart: the tree, its render state and the host's hooks.
pub struct OrgChart<C: ChartCallbacks = NoopCallbacks> {
    tree: OrgTree,
    config: Config,
    layout: Box<dyn TreeLayout>,
    renderer: Renderer,
    callbacks: C,
    avatars: Option<AvatarPipeline>,
    frame: Option<Frame>,
}

impl OrgChart<NoopCallbacks> {
    pub fn new(tree: OrgTree, config: Config) -> Self {
        Self::with_callbacks(tree, config, NoopCallbacks)
    }
}

impl<C: ChartCallbacks> OrgChart<C> {
    pub fn with_callbacks(tree: OrgTree, config: Config, callbacks: C) -> Self {
        Self {
            tree,
            config,
            layout: Box::new(DagreTreeLayout),
            renderer: Renderer::new(),
            callbacks,
            avatars: None,
            frame: None,
        }
    }

    pub fn with_layout(mut self, layout: Box<dyn TreeLayout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_avatar_loader(mut self, loader: Arc<dyn AvatarLoader>) -> Self {
        self.avatars = Some(AvatarPipeline::new(loader));
        self
    }

    pub fn tree(&self) -> &OrgTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut OrgTree {
        &mut self.tree
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Lays out the current tree, reconciles it against the previous render
    /// and reports the new extents through `on_config_change`.
    pub fn render(&mut self) -> &Frame {
        let layout = compute_layout(&self.tree, self.layout.as_ref(), &self.config.chart);
        let mut frame =
            self.renderer
                .render(&self.tree, &layout, &self.config.theme, &self.config.chart);
        if let Some(pipeline) = self.avatars.as_mut() {
            for (id, person) in frame.avatar_requests.drain(..) {
                pipeline.request(id, person);
            }
        }
        self.callbacks
            .on_config_change(&self.config.chart, &frame.extents);
        self.frame.insert(frame)
    }

    pub fn click(&mut self, id: &NodeId, target: ClickTarget) -> Result<ClickOutcome, ChartError> {
        let outcome = interaction::handle_click(&mut self.tree, id, target, &mut self.callbacks)?;
        if outcome.needs_render() {
            self.render();
        }
        Ok(outcome)
    }

    /// Animated svg of the last render, or of a fresh one.
    pub fn svg(&mut self, mode: SvgMode) -> String {
        if self.frame.is_none() {
            self.render();
        }
        match self.frame.as_ref() {
            Some(frame) => render_svg(frame, &self.config.theme, &self.config.chart, mode),
            None => String::new(),
        }
    }

    /// Applies avatar loads that have completed so far.
    pub fn apply_avatar_events(&mut self) -> Vec<AvatarUpdate> {
        let events = match self.avatars.as_mut() {
            Some(pipeline) => pipeline.drain(),
            None => return Vec::new(),
        };
        self.apply_events(events)
    }

    /// Blocks until all requested avatars arrive (or `timeout`), then
    /// applies them.
    pub fn wait_for_avatars(&mut self, timeout: Duration) -> Vec<AvatarUpdate> {
        let events = match self.avatars.as_mut() {
            Some(pipeline) => pipeline.wait(timeout),
            None => return Vec::new(),
        };
        self.apply_events(events)
    }

    fn apply_events(&mut self, events: Vec<AvatarEvent>) -> Vec<AvatarUpdate> {
        let mut updates = Vec::with_capacity(events.len());
        for event in events {
            let AvatarEvent { node_id, result } = event;
            let image = match result {
                Ok(image) => image,
                Err(ImageLoadError::NoReference) => {
                    debug!(node = %node_id, "no avatar to load");
                    updates.push(AvatarUpdate::Failed(node_id, ImageLoadError::NoReference));
                    continue;
                }
                Err(err) => {
                    warn!(node = %node_id, error = %err, "avatar load failed");
                    updates.push(AvatarUpdate::Failed(node_id, err));
                    continue;
                }
            };
            let Some(node) = self.tree.find_mut(&node_id) else {
                debug!(node = %node_id, "dropping avatar for removed node");
                updates.push(AvatarUpdate::Discarded(node_id));
                continue;
            };
            let href = image.to_data_url();
            node.person.avatar = href.clone();
            node.person.has_image = true;

            let on_screen = self.renderer.set_avatar(&node_id, &href);
            if on_screen {
                if let Some(card) = self.frame.as_mut().and_then(|frame| frame.node_mut(&node_id)) {
                    card.card.avatar_href = Some(href);
                }
                updates.push(AvatarUpdate::Applied(node_id));
            } else {
                updates.push(AvatarUpdate::Cached(node_id));
            }
        }
        updates
    }

    /// Maps a host button id to an export and runs it.
    pub fn trigger(&mut self, trigger_id: &str) -> Option<Result<(ExportFormat, Vec<u8>), ExportError>> {
        let chart = &self.config.chart;
        let format = if chart.download_image_trigger_id.as_deref() == Some(trigger_id) {
            ExportFormat::Png
        } else if chart.download_pdf_trigger_id.as_deref() == Some(trigger_id) {
            ExportFormat::Pdf
        } else {
            return None;
        };
        Some(self.export(format).map(|bytes| (format, bytes)))
    }

    pub fn export(&mut self, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
        let svg = self.svg(SvgMode::Snapshot);
        export::export(&svg, format, &self.config.render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::ImageData;
    use crate::config::ChartConfig;
    use crate::ir::{Person, TreeNode};
    use crate::reconcile::Phase;
    use crate::render::Extents;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    struct Bytes;

    impl AvatarLoader for Bytes {
        fn load_image(&self, _person: &Person) -> Result<ImageData, ImageLoadError> {
            ImageData::from_bytes(PNG_HEADER.to_vec())
        }
    }

    #[derive(Default)]
    struct Extent(Vec<Extents>);

    impl ChartCallbacks for Extent {
        fn on_config_change(&mut self, _config: &ChartConfig, extents: &Extents) {
            self.0.push(*extents);
        }
    }

    fn tree() -> OrgTree {
        let mut lead = Person::new("Lead");
        lead.avatar = "lead.png".to_string();
        let mut report = Person::new("Report");
        report.avatar = "report.png".to_string();
        let root = TreeNode::new("1", lead).with_children(vec![TreeNode::new("2", report)]);
        OrgTree::new(root).unwrap()
    }

    #[test]
    fn render_reports_extents_to_callbacks() {
        let mut chart = OrgChart::with_callbacks(tree(), Config::default(), Extent::default());
        chart.render();
        chart.render();
        assert_eq!(chart.callbacks().0.len(), 2);
    }

    #[test]
    fn click_rerenders_with_exit_phase() {
        let mut chart = OrgChart::new(tree(), Config::default());
        chart.render();
        let outcome = chart.click(&NodeId::new("1"), ClickTarget::Card).unwrap();
        assert_eq!(outcome, ClickOutcome::Collapsed(NodeId::new("1")));
        let frame = chart.frame().unwrap();
        assert_eq!(frame.node(&NodeId::new("2")).unwrap().phase, Phase::Exit);
    }

    #[test]
    fn avatars_are_applied_after_render() {
        let mut chart = OrgChart::new(tree(), Config::default()).with_avatar_loader(Arc::new(Bytes));
        chart.render();
        let updates = chart.wait_for_avatars(Duration::from_secs(5));
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| matches!(u, AvatarUpdate::Applied(_))));
        let person = &chart.tree().root().person;
        assert!(person.has_image);
        assert!(person.avatar.starts_with("data:image/png;base64,"));
        let frame = chart.frame().unwrap();
        let href = frame.node(&NodeId::new("2")).unwrap().card.avatar_href.clone();
        assert!(href.unwrap().starts_with("data:"));
    }

    /// Serves images by person id, ignoring the avatar reference.
    struct Directory;

    impl AvatarLoader for Directory {
        fn load_image(&self, person: &Person) -> Result<ImageData, ImageLoadError> {
            match person.id.as_ref().map(NodeId::as_str) {
                Some("7") => ImageData::from_bytes(PNG_HEADER.to_vec()),
                _ => Err(ImageLoadError::Failed("not in directory".to_string())),
            }
        }
    }

    #[test]
    fn cards_without_avatar_reference_still_ask_the_loader() {
        let mut person = Person::new("Solo");
        person.id = Some(NodeId::new("7"));
        let tree = OrgTree::new(TreeNode::new("7", person)).unwrap();
        let mut chart = OrgChart::new(tree, Config::default()).with_avatar_loader(Arc::new(Directory));
        chart.render();
        let updates = chart.wait_for_avatars(Duration::from_secs(5));
        assert_eq!(updates, vec![AvatarUpdate::Applied(NodeId::new("7"))]);
        assert!(chart.tree().root().person.avatar.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn avatar_for_collapsed_card_is_only_cached() {
        let mut chart = OrgChart::new(tree(), Config::default()).with_avatar_loader(Arc::new(Bytes));
        chart.render();
        chart.click(&NodeId::new("1"), ClickTarget::Card).unwrap();
        let updates = chart.wait_for_avatars(Duration::from_secs(5));
        assert!(updates.contains(&AvatarUpdate::Cached(NodeId::new("2"))));
        assert!(chart.tree().find(&NodeId::new("2")).unwrap().person.has_image);
    }

    #[test]
    fn unknown_trigger_is_ignored() {
        let mut chart = OrgChart::new(tree(), Config::default());
        assert!(chart.trigger("not-a-button").is_none());
    }

    #[cfg(feature = "png")]
    #[test]
    fn image_trigger_exports_png() {
        let mut chart = OrgChart::new(tree(), Config::default());
        let (format, bytes) = chart.trigger("download-image").unwrap().unwrap();
        assert_eq!(format, ExportFormat::Png);
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
