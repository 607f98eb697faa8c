//! Geometry kinds and the instancing tree that nests them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

pub mod curves;
pub mod geometry_set;
pub mod instances;
pub mod mesh;
pub mod pointcloud;
pub mod runtime;

pub use curves::{CurveType, Curves};
pub use geometry_set::{
  Collection, GeometryComponentType, GeometryEditData, GeometrySet, Object, Volume,
};
pub use instances::{InstanceReference, Instances};
pub use mesh::{Mesh, MeshEdge, MeshLoop, MeshPoly};
pub use pointcloud::PointCloud;
pub use runtime::{GeometryRuntime, CURVE_TYPES_NUM};

/// A material slot target. Compared by identity when merging tables.
#[derive(Debug, Default)]
pub struct Material {
  pub name: String,
}

impl Material {
  pub fn new(name: impl Into<String>) -> Arc<Self> {
    Arc::new(Self { name: name.into() })
  }
}

/// Shared pointer compared and hashed by address.
pub struct ByAddress<T>(pub Arc<T>);

impl<T> Clone for ByAddress<T> {
  fn clone(&self) -> Self {
    Self(self.0.clone())
  }
}

impl<T> PartialEq for ByAddress<T> {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl<T> Eq for ByAddress<T> {}

impl<T> Hash for ByAddress<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    Arc::as_ptr(&self.0).cast::<()>().hash(state);
  }
}

impl<T> Deref for ByAddress<T> {
  type Target = T;

  fn deref(&self) -> &T {
    &self.0
  }
}

impl<T: fmt::Debug> fmt::Debug for ByAddress<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ByAddress({:p}, {:?})", Arc::as_ptr(&self.0), self.0)
  }
}
