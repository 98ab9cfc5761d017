//! Asynchronous asset loading with caching and stale-result discard.
//!
//! Decoding runs on a worker thread; the completion is posted back through
//! an mpsc channel and committed from the UI update loop, so session state
//! is only ever mutated on the single-threaded event stream. Each request
//! carries a generation number: when a newer request supersedes an older
//! one, the older result is discarded when it eventually resolves instead
//! of clobbering the newer model.

pub mod gltf;

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::scene::SceneGraph;

/// The two accepted asset container extensions.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["glb", "gltf"];

/// Byte-stream handle plus filename, as delivered by the upload or
/// drag-and-drop boundary.
#[derive(Debug, Clone)]
pub struct AssetSource {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl AssetSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn extension(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Source identity used as the decode-cache key. Includes the content
    /// hash so re-uploading a modified file under the same name is not
    /// served from the cache.
    fn cache_key(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.bytes.hash(&mut hasher);
        format!("{}:{:016x}", self.name, hasher.finish())
    }
}

/// Loader failures. Neither is fatal: the viewer keeps displaying its
/// last-known-good model.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Rejected before any decode attempt: the extension is not one of
    /// [`ACCEPTED_EXTENSIONS`].
    UnsupportedFormat(String),
    /// The byte stream is not a recognized/valid asset.
    Decode(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnsupportedFormat(name) => {
                write!(f, "{name}: not a .glb or .gltf file")
            }
            LoadError::Decode(reason) => write!(f, "failed to decode asset: {reason}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Completion event drained from [`AssetLoader::poll`].
#[derive(Debug)]
pub enum LoadEvent {
    Loaded { graph: Arc<SceneGraph> },
    Failed { label: String, error: LoadError },
}

type DecodeFn = fn(&AssetSource) -> Result<SceneGraph, LoadError>;

/// (generation, cache key, display name, decode outcome).
type LoadResult = (u64, String, String, Result<Arc<SceneGraph>, LoadError>);

/// Owns the pristine decode results and the in-flight worker state.
pub struct AssetLoader {
    decoder: DecodeFn,
    cache: HashMap<String, Arc<SceneGraph>>,
    generation: u64,
    in_flight: bool,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::with_decoder(gltf::decode)
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct with a custom decode function. Test seam.
    pub fn with_decoder(decoder: DecodeFn) -> Self {
        let (tx, rx) = channel();
        Self {
            decoder,
            cache: HashMap::new(),
            generation: 0,
            in_flight: false,
            tx,
            rx,
        }
    }

    /// Start loading `source`. Rejects unsupported extensions synchronously,
    /// before any decode attempt; accepted sources resolve through
    /// [`poll`](Self::poll). A new request supersedes any in-flight one.
    pub fn request(&mut self, source: AssetSource) -> Result<(), LoadError> {
        match source.extension() {
            Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {}
            _ => return Err(LoadError::UnsupportedFormat(source.name)),
        }

        self.generation += 1;
        self.in_flight = true;
        let generation = self.generation;

        let key = source.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            log::debug!("cache hit for {}", source.name);
            let _ = self
                .tx
                .send((generation, key, source.name, Ok(cached.clone())));
            return Ok(());
        }

        log::info!("decoding {} ({} bytes)", source.name, source.bytes.len());
        let tx = self.tx.clone();
        let decoder = self.decoder;
        thread::spawn(move || {
            let name = source.name.clone();
            let result = decoder(&source).map(Arc::new);
            let _ = tx.send((generation, key, name, result));
        });
        Ok(())
    }

    /// Drain completed loads. Results superseded by a newer request are
    /// discarded here; at most one event is returned per call.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        while let Ok((generation, key, name, result)) = self.rx.try_recv() {
            if generation != self.generation {
                log::debug!("discarding stale load result for {name}");
                continue;
            }
            self.in_flight = false;
            match result {
                Ok(graph) => {
                    self.cache.insert(key, graph.clone());
                    log::info!("loaded {} ({} meshes)", graph.label, graph.mesh_count());
                    return Some(LoadEvent::Loaded { graph });
                }
                Err(error) => {
                    log::warn!("load of {name} failed: {error}");
                    return Some(LoadEvent::Failed { label: name, error });
                }
            }
        }
        None
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }
}
