//! Attribute writers and their `finish()` protocol.
//!
//! A writer must be finished exactly once after mutation so the owning
//! geometry can drop derived caches. Dropping an unfinished writer is a
//! programmer error and is reported in debug builds.

use super::id::AttributeId;
use super::storage::AttributeUpdate;
use crate::buffer::GMutableSpan;
use crate::geometry::GeometryRuntime;
use crate::gvarray::GVMutableArray;
use crate::types::Domain;
use crate::value::AttributeType;

struct FinishTag<'a> {
  id: AttributeId,
  runtime: &'a GeometryRuntime,
  update: Option<AttributeUpdate>,
  finished: bool,
}

impl<'a> FinishTag<'a> {
  fn new(id: AttributeId, runtime: &'a GeometryRuntime, update: Option<AttributeUpdate>) -> Self {
    Self {
      id,
      runtime,
      update,
      finished: false,
    }
  }

  fn finish(&mut self) {
    if self.finished {
      return;
    }
    self.finished = true;
    self.runtime.tag_modified(self.update);
  }
}

impl Drop for FinishTag<'_> {
  fn drop(&mut self) {
    if cfg!(debug_assertions) && !self.finished && !std::thread::panicking() {
      tracing::warn!(attribute = %self.id, "attribute writer dropped without calling finish()");
    }
  }
}

/// Writer over a possibly type-converted array.
pub struct GAttributeWriter<'a> {
  pub varray: GVMutableArray<'a>,
  pub domain: Domain,
  tag: FinishTag<'a>,
}

impl<'a> GAttributeWriter<'a> {
  pub(crate) fn new(
    varray: GVMutableArray<'a>,
    domain: Domain,
    id: AttributeId,
    runtime: &'a GeometryRuntime,
    update: Option<AttributeUpdate>,
  ) -> Self {
    Self {
      varray,
      domain,
      tag: FinishTag::new(id, runtime, update),
    }
  }

  pub fn id(&self) -> &AttributeId {
    &self.tag.id
  }

  pub fn finish(mut self) {
    self.tag.finish();
  }
}

/// Writer over a dense span of the stored type.
pub struct GSpanAttributeWriter<'a> {
  pub span: GMutableSpan<'a>,
  pub domain: Domain,
  tag: FinishTag<'a>,
}

impl<'a> GSpanAttributeWriter<'a> {
  pub(crate) fn new(
    span: GMutableSpan<'a>,
    domain: Domain,
    id: AttributeId,
    runtime: &'a GeometryRuntime,
    update: Option<AttributeUpdate>,
  ) -> Self {
    Self {
      span,
      domain,
      tag: FinishTag::new(id, runtime, update),
    }
  }

  pub fn id(&self) -> &AttributeId {
    &self.tag.id
  }

  /// Typed access to the span, `None` if `T` is not the stored type.
  pub fn typed<T: AttributeType>(&mut self) -> Option<&mut [T]> {
    T::span_mut(self.span.reborrow())
  }

  pub fn finish(mut self) {
    self.tag.finish();
  }
}
