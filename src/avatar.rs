//! Avatar loading. Loads run on a small worker pool and report back as
//! [`AvatarEvent`]s; nothing touches render state until the caller drains
//! the channel.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::error::ImageLoadError;
use crate::ir::{NodeId, Person};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    /// Wraps raw bytes, sniffing the mime type from the content.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ImageLoadError> {
        if bytes.is_empty() {
            return Err(ImageLoadError::Empty);
        }
        let mime_type = sniff_mime(&bytes).ok_or(ImageLoadError::Unsupported)?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// `data:` URL that can be embedded straight into an `<image href>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    if head.contains("<svg") {
        return Some("image/svg+xml");
    }
    None
}

/// Source of avatar image bytes for a person record.
pub trait AvatarLoader: Send + Sync {
    fn load_image(&self, person: &Person) -> Result<ImageData, ImageLoadError>;
}

/// Resolves `person.avatar` as a file path relative to a base directory.
#[derive(Debug, Clone)]
pub struct FsAvatarLoader {
    base: PathBuf,
}

impl FsAvatarLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl AvatarLoader for FsAvatarLoader {
    fn load_image(&self, person: &Person) -> Result<ImageData, ImageLoadError> {
        let reference = person.avatar.trim();
        if reference.is_empty() {
            return Err(ImageLoadError::NoReference);
        }
        let path = self.base.join(reference);
        let bytes = std::fs::read(&path).map_err(|err| ImageLoadError::Io {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        ImageData::from_bytes(bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarEvent {
    pub node_id: NodeId,
    pub result: Result<ImageData, ImageLoadError>,
}

/// What happened to one drained avatar event.
#[derive(Debug, Clone, PartialEq)]
pub enum AvatarUpdate {
    /// Cached on the person and swapped into the on-screen card.
    Applied(NodeId),
    /// Cached on the person; the card is not on screen right now.
    Cached(NodeId),
    /// The node no longer exists in the tree.
    Discarded(NodeId),
    Failed(NodeId, ImageLoadError),
}

/// Upper bound on concurrent avatar loads.
pub const AVATAR_WORKERS: usize = 4;

pub struct AvatarPipeline {
    loader: Arc<dyn AvatarLoader>,
    sender: Sender<AvatarEvent>,
    receiver: Receiver<AvatarEvent>,
    pending: HashSet<NodeId>,
    pool: Option<ThreadPool>,
}

impl AvatarPipeline {
    pub fn new(loader: Arc<dyn AvatarLoader>) -> Self {
        Self::with_workers(loader, AVATAR_WORKERS)
    }

    pub fn with_workers(loader: Arc<dyn AvatarLoader>, workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel();
        let pool = match ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|index| format!("avatar-{index}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                warn!(error = %err, "avatar pool unavailable, using the global pool");
                None
            }
        };
        Self {
            loader,
            sender,
            receiver,
            pending: HashSet::new(),
            pool,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Starts a load unless one is already in flight for `node_id`.
    pub fn request(&mut self, node_id: NodeId, person: Person) -> bool {
        if !self.pending.insert(node_id.clone()) {
            return false;
        }
        debug!(node = %node_id, avatar = %person.avatar, "requesting avatar");
        let loader = Arc::clone(&self.loader);
        let sender = self.sender.clone();
        let job = move || {
            let result = loader.load_image(&person);
            // The pipeline may have been dropped; nobody is left to care.
            let _ = sender.send(AvatarEvent { node_id, result });
        };
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
        true
    }

    /// Events that have arrived so far, without blocking.
    pub fn drain(&mut self) -> Vec<AvatarEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            self.settle(&event);
            events.push(event);
        }
        events
    }

    /// Blocks until every in-flight load has reported or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Vec<AvatarEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.drain();
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(event) => {
                    self.settle(&event);
                    events.push(event);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(pending = self.pending.len(), "timed out waiting for avatars");
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        events
    }

    fn settle(&mut self, event: &AvatarEvent) {
        self.pending.remove(&event.node_id);
    }
}
