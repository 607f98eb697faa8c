//! Derived data cached next to a geometry and invalidated through attribute
//! writer `finish()` calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use glam::Vec3;

use crate::attributes::AttributeUpdate;

/// Number of curve types tracked in type counts.
pub const CURVE_TYPES_NUM: usize = 4;

#[derive(Default, Debug)]
pub struct GeometryRuntime {
  change_count: AtomicU64,
  vertex_normals: Mutex<Option<Arc<[Vec3]>>>,
  curve_type_counts: Mutex<Option<[usize; CURVE_TYPES_NUM]>>,
}

impl GeometryRuntime {
  /// Record a finished write, dropping caches that depend on it.
  pub fn tag_modified(&self, update: Option<AttributeUpdate>) {
    self.change_count.fetch_add(1, Ordering::Relaxed);
    match update {
      Some(AttributeUpdate::Positions) => self.clear_vertex_normals(),
      Some(AttributeUpdate::CurveTypes) => {
        *self
          .curve_type_counts
          .lock()
          .unwrap_or_else(PoisonError::into_inner) = None;
      }
      None => {}
    }
  }

  /// Number of finished attribute writes since creation.
  #[inline]
  pub fn change_count(&self) -> u64 {
    self.change_count.load(Ordering::Relaxed)
  }

  pub(crate) fn clear_vertex_normals(&self) {
    *self
      .vertex_normals
      .lock()
      .unwrap_or_else(PoisonError::into_inner) = None;
  }

  pub(crate) fn vertex_normals_or_init(&self, init: impl FnOnce() -> Arc<[Vec3]>) -> Arc<[Vec3]> {
    let mut cache = self
      .vertex_normals
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    cache.get_or_insert_with(init).clone()
  }

  pub(crate) fn has_vertex_normals(&self) -> bool {
    self
      .vertex_normals
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .is_some()
  }

  pub(crate) fn curve_type_counts_or_init(
    &self,
    init: impl FnOnce() -> [usize; CURVE_TYPES_NUM],
  ) -> [usize; CURVE_TYPES_NUM] {
    *self
      .curve_type_counts
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get_or_insert_with(init)
  }

  pub(crate) fn set_curve_type_counts(&self, counts: [usize; CURVE_TYPES_NUM]) {
    *self
      .curve_type_counts
      .lock()
      .unwrap_or_else(PoisonError::into_inner) = Some(counts);
  }
}

impl Clone for GeometryRuntime {
  fn clone(&self) -> Self {
    Self {
      change_count: AtomicU64::new(self.change_count()),
      vertex_normals: Mutex::new(
        self
          .vertex_normals
          .lock()
          .unwrap_or_else(PoisonError::into_inner)
          .clone(),
      ),
      curve_type_counts: Mutex::new(
        *self
          .curve_type_counts
          .lock()
          .unwrap_or_else(PoisonError::into_inner),
      ),
    }
  }
}
