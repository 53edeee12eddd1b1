//! Shared mesh cache
//!
//! Models that name the same mesh share one loaded copy. The cache keeps a
//! [`Weak`] reference per name and hands out [`Arc`] handles, so a mesh
//! lives exactly as long as some model holds it:
//!
//! ```text
//! acquire("cube")  -> loads, count 1
//! acquire("cube")  -> shares, count 2
//! release(handle)  -> count 1
//! release(handle)  -> count 0, entry dropped
//! ```
//!
//! The cache is single threaded and takes no locks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use crate::assets::ObjLoader;
use crate::render::{Mesh, MeshError};

type MeshLoader = Box<dyn Fn(&str) -> Result<Mesh, MeshError>>;

/// Name-keyed cache of shared meshes
pub struct MeshCache {
    entries: HashMap<String, Weak<Mesh>>,
    loader: MeshLoader,
}

impl Default for MeshCache {
    fn default() -> Self {
        Self::new(".")
    }
}

impl MeshCache {
    /// Cache that loads OBJ files relative to `assets_dir`
    ///
    /// The name `"cube"` is built in and never touches the filesystem.
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        let assets_dir = assets_dir.into();
        Self::with_loader(move |name| {
            if name == "cube" {
                return Ok(Mesh::cube());
            }
            ObjLoader::load_obj(assets_dir.join(name))
        })
    }

    /// Cache with a custom loader
    pub fn with_loader(loader: impl Fn(&str) -> Result<Mesh, MeshError> + 'static) -> Self {
        Self {
            entries: HashMap::new(),
            loader: Box::new(loader),
        }
    }

    /// Get a shared handle to the mesh called `name`, loading it on first use
    ///
    /// # Errors
    /// Whatever the loader reports; nothing is cached on failure.
    pub fn acquire(&mut self, name: &str) -> Result<Arc<Mesh>, MeshError> {
        if let Some(mesh) = self.entries.get(name).and_then(Weak::upgrade) {
            log::debug!(
                "Mesh cache hit: {} ({} holders)",
                name,
                Arc::strong_count(&mesh)
            );
            return Ok(mesh);
        }

        log::debug!("Mesh cache miss: {}", name);
        let mesh = Arc::new((self.loader)(name)?);
        self.entries.insert(name.to_string(), Arc::downgrade(&mesh));
        Ok(mesh)
    }

    /// Give back one handle; the entry is freed once no holder remains
    pub fn release(&mut self, mesh: Arc<Mesh>) {
        let weak = Arc::downgrade(&mesh);
        drop(mesh);

        if weak.strong_count() == 0 {
            self.entries.retain(|name, entry| {
                let dead = entry.ptr_eq(&weak);
                if dead {
                    log::debug!("Mesh cache freed: {}", name);
                }
                !dead
            });
        }
    }

    /// Forget every entry
    ///
    /// Handles already given out stay valid; the next `acquire` reloads.
    pub fn cleanup(&mut self) {
        log::info!("Mesh cache cleanup ({} entries)", self.entries.len());
        self.entries.clear();
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Whether no mesh is currently shared through the cache
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
