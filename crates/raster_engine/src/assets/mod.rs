//! Asset management system
//!
//! Mesh loading from OBJ files and the shared mesh cache models draw from.

pub mod mesh_cache;
pub mod obj_loader;

pub use mesh_cache::MeshCache;
pub use obj_loader::ObjLoader;
