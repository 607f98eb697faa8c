//! Realize Instances
//!
//! Flattens a tree of nested instances into one point cloud, one mesh and
//! one curves block. The pass runs in three stages:
//!
//! 1. preprocess: per kind, decide which attributes the result carries and
//!    resolve every unique source geometry against that schema;
//! 2. gather: walk the tree once, sequentially, assigning each reachable
//!    geometry its destination offsets, transform, id and fallbacks;
//! 3. execute: per kind, fill disjoint destination slices in parallel.
//!
//! # Usage
//!
//! ```ignore
//! let options = RealizeInstancesOptions::new().with_keep_original_ids(true);
//! let realized = realize_instances(geometry, &options);
//! assert!(!realized.has_instances());
//! ```

mod curves;
mod gather;
mod ids;
mod mesh;
mod ordered;
mod pointcloud;

#[cfg(test)]
pub(crate) mod test_utils;

use glam::Mat4;

use self::curves::{execute_realize_curve_tasks, preprocess_curves};
use self::gather::{gather_realize_tasks_recursive, GatherTasksInfo, InstanceContext};
use self::mesh::{execute_realize_mesh_tasks, preprocess_meshes};
use self::pointcloud::{execute_realize_pointcloud_tasks, preprocess_pointclouds};
use crate::attributes::AttributePropagation;
use crate::geometry::{GeometryComponentType, GeometrySet};

/// Options for [`realize_instances`].
#[derive(Clone, Debug)]
pub struct RealizeInstancesOptions {
  /// Copy stored ids instead of deriving new unique ones from the instance
  /// hierarchy.
  pub keep_original_ids: bool,
  /// Propagate attributes stored on instances to the realized elements.
  pub realize_instance_attributes: bool,
  /// Anonymous attributes to carry over.
  pub propagation: AttributePropagation,
}

impl Default for RealizeInstancesOptions {
  fn default() -> Self {
    Self {
      keep_original_ids: false,
      realize_instance_attributes: true,
      propagation: AttributePropagation::all(),
    }
  }
}

impl RealizeInstancesOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_keep_original_ids(mut self, keep: bool) -> Self {
    self.keep_original_ids = keep;
    self
  }

  pub fn with_realize_instance_attributes(mut self, realize: bool) -> Self {
    self.realize_instance_attributes = realize;
    self
  }

  pub fn with_propagation(mut self, propagation: AttributePropagation) -> Self {
    self.propagation = propagation;
    self
  }
}

/// Statistics from one realize pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealizeStats {
  pub pointcloud_tasks: usize,
  pub mesh_tasks: usize,
  pub curve_tasks: usize,
  /// Preprocessing time in microseconds.
  pub preprocess_us: u64,
  /// Gather time in microseconds.
  pub gather_us: u64,
  /// Execute time in microseconds.
  pub execute_us: u64,
  /// Total time in microseconds.
  pub total_us: u64,
}

/// Realize every instance in `geometry`.
///
/// The result has no instances. It holds at most one point cloud, mesh and
/// curves block, plus the first volume and edit data found in the tree.
/// Geometry without instances is returned unchanged.
pub fn realize_instances(geometry: GeometrySet, options: &RealizeInstancesOptions) -> GeometrySet {
  realize_instances_timed(geometry, options).0
}

/// Same as [`realize_instances`] but also returns timing stats.
pub fn realize_instances_timed(
  mut geometry: GeometrySet,
  options: &RealizeInstancesOptions,
) -> (GeometrySet, RealizeStats) {
  use web_time::Instant;

  let mut stats = RealizeStats::default();
  if !geometry.has_instances() {
    return (geometry, stats);
  }

  let start = Instant::now();

  if options.keep_original_ids {
    remove_id_attribute_from_instances(&mut geometry);
  }

  let pointclouds = preprocess_pointclouds(&geometry, options);
  let meshes = preprocess_meshes(&geometry, options);
  let curves = preprocess_curves(&geometry, options);
  let preprocessed = Instant::now();
  stats.preprocess_us = preprocessed.duration_since(start).as_micros() as u64;

  let mut gather_info = GatherTasksInfo::new(&pointclouds, &meshes, &curves);
  {
    let _span = tracing::info_span!("realize::gather").entered();
    let context = InstanceContext::new(&gather_info);
    gather_realize_tasks_recursive(&mut gather_info, &geometry, &Mat4::IDENTITY, &context);
  }
  let tasks = gather_info.r_tasks;
  stats.pointcloud_tasks = tasks.pointcloud_tasks.len();
  stats.mesh_tasks = tasks.mesh_tasks.len();
  stats.curve_tasks = tasks.curve_tasks.len();
  let gathered = Instant::now();
  stats.gather_us = gathered.duration_since(preprocessed).as_micros() as u64;
  tracing::debug!(
    pointcloud_tasks = stats.pointcloud_tasks,
    mesh_tasks = stats.mesh_tasks,
    curve_tasks = stats.curve_tasks,
    "gathered realize tasks"
  );

  let mut result = GeometrySet::new();
  execute_realize_pointcloud_tasks(options, &pointclouds, &tasks.pointcloud_tasks, &mut result);
  execute_realize_mesh_tasks(options, &meshes, &tasks.mesh_tasks, &mut result);
  execute_realize_curve_tasks(options, &curves, &tasks.curve_tasks, &mut result);

  if let Some(volume) = tasks.first_volume {
    result.replace_volume(volume);
  }
  if let Some(edit_data) = tasks.first_edit_data {
    result.replace_edit_data(edit_data);
  }

  stats.execute_us = gathered.elapsed().as_micros() as u64;
  stats.total_us = start.elapsed().as_micros() as u64;

  (result, stats)
}

/// Stored instance ids would feed the id hash; with original ids kept they
/// must not.
fn remove_id_attribute_from_instances(geometry: &mut GeometrySet) {
  geometry.modify_geometry_sets(&mut |geometry| {
    if !geometry.has(GeometryComponentType::Instances) {
      return;
    }
    if let Some(instances) = geometry.instances_for_write() {
      // The instance `id` builtin is optional, removal cannot fail.
      let _ = instances.attributes_for_write().remove("id");
    }
  });
}

#[cfg(test)]
#[path = "realize_test.rs"]
mod realize_test;
