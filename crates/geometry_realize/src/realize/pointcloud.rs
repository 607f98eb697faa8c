//! Point cloud preprocessing and task execution.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use indexmap::IndexSet;
use rayon::prelude::*;

use super::ids::create_result_ids;
use super::ordered::{
  copy_generic_attributes_to_result, gather_generic_attributes, resolve_builtin,
  resolve_source_attributes, split_generic_writers, split_optional, AttributeFallbacks,
  OrderedAttributes,
};
use super::RealizeInstancesOptions;
use crate::attributes::AttributeId;
use crate::buffer::{AttributeBuffer, GMutableSpan};
use crate::geometry::{ByAddress, GeometryComponentType, GeometrySet, PointCloud};
use crate::threading::{copy_transformed_positions, TASK_GRAIN_SIZE};
use crate::types::{AttributeMetaData, DataType, Domain};

/// One unique source point cloud, resolved against the pass's attributes.
pub(crate) struct PointCloudRealizeInfo {
  pub pointcloud: Arc<PointCloud>,
  /// Slot-ordered source values, `None` where the source lacks one.
  pub attributes: Vec<Option<Arc<AttributeBuffer>>>,
  pub stored_ids: Option<Arc<AttributeBuffer>>,
}

#[derive(Default)]
pub(crate) struct AllPointCloudsInfo {
  pub attributes: OrderedAttributes,
  pub order: IndexSet<ByAddress<PointCloud>>,
  pub realize_info: Vec<PointCloudRealizeInfo>,
  pub create_id_attribute: bool,
}

impl AllPointCloudsInfo {
  pub fn info_index(&self, pointcloud: &Arc<PointCloud>) -> Option<usize> {
    self.order.get_index_of(&ByAddress(pointcloud.clone()))
  }
}

pub(crate) struct RealizePointCloudTask {
  /// First destination point.
  pub start_index: usize,
  pub info: usize,
  pub transform: Mat4,
  pub fallbacks: AttributeFallbacks,
  pub id: u32,
}

#[tracing::instrument(skip_all, name = "realize::preprocess_pointclouds")]
pub(crate) fn preprocess_pointclouds(
  geometry: &GeometrySet,
  options: &RealizeInstancesOptions,
) -> AllPointCloudsInfo {
  let (attributes, create_id_attribute) = gather_generic_attributes(
    geometry,
    GeometryComponentType::PointCloud,
    options.realize_instance_attributes,
    &options.propagation,
    &["position"],
  );

  let mut order = IndexSet::new();
  geometry.foreach_geometry_recursive(&mut |geometry| {
    if let Some(pointcloud) = geometry.pointcloud() {
      if pointcloud.points_num() > 0 {
        order.insert(ByAddress(pointcloud.clone()));
      }
    }
  });

  let realize_info = order
    .iter()
    .map(|pointcloud| {
      let src_attributes = pointcloud.attributes();
      PointCloudRealizeInfo {
        pointcloud: pointcloud.0.clone(),
        attributes: resolve_source_attributes(src_attributes, &attributes),
        stored_ids: if create_id_attribute {
          resolve_builtin(src_attributes, "id", Domain::Point, DataType::Int32)
        } else {
          None
        },
      }
    })
    .collect();

  AllPointCloudsInfo {
    attributes,
    order,
    realize_info,
    create_id_attribute,
  }
}

/// Destination slices owned by one task.
struct PointCloudTaskOutput<'a> {
  positions: Option<&'a mut [Vec3]>,
  ids: Option<&'a mut [i32]>,
  attributes: Vec<Option<GMutableSpan<'a>>>,
}

fn execute_realize_pointcloud_task(
  options: &RealizeInstancesOptions,
  task: &RealizePointCloudTask,
  info: &PointCloudRealizeInfo,
  dst: PointCloudTaskOutput<'_>,
) {
  if let Some(positions) = dst.positions {
    copy_transformed_positions(info.pointcloud.positions(), &task.transform, positions);
  }
  if let Some(ids) = dst.ids {
    let stored_ids = info.stored_ids.as_ref().and_then(|ids| ids.typed::<i32>());
    create_result_ids(options.keep_original_ids, stored_ids, task.id, ids);
  }
  copy_generic_attributes_to_result(&info.attributes, &task.fallbacks, dst.attributes);
}

#[tracing::instrument(skip_all, name = "realize::execute_pointclouds", fields(tasks = tasks.len()))]
pub(crate) fn execute_realize_pointcloud_tasks(
  options: &RealizeInstancesOptions,
  all: &AllPointCloudsInfo,
  tasks: &[RealizePointCloudTask],
  r_result: &mut GeometrySet,
) {
  let Some(last_task) = tasks.last() else {
    return;
  };
  let point_counts: Vec<usize> = tasks
    .iter()
    .map(|task| all.realize_info[task.info].pointcloud.points_num())
    .collect();
  let tot_points = last_task.start_index + point_counts[tasks.len() - 1];

  let mut dst_pointcloud = PointCloud::new(tot_points);
  {
    let mut dst_attributes = dst_pointcloud.attributes_for_write();

    let mut requests = vec![(
      AttributeId::from("position"),
      AttributeMetaData::new(Domain::Point, DataType::Float3),
    )];
    if all.create_id_attribute {
      requests.push((
        AttributeId::from("id"),
        AttributeMetaData::new(Domain::Point, DataType::Int32),
      ));
    }
    let fixed_num = requests.len();
    requests.extend(all.attributes.requests());

    let mut writers = dst_attributes.lookup_or_add_for_write_only_spans(&requests);
    let mut generic_writers = writers.split_off(fixed_num);
    let mut fixed_writers = writers.into_iter();
    let mut positions_writer = fixed_writers.next().flatten();
    let mut ids_writer = fixed_writers.next().flatten();

    {
      let _span = tracing::info_span!("realize::pointcloud_tasks").entered();
      let positions = split_optional(
        positions_writer.as_mut().and_then(|writer| writer.typed::<Vec3>()),
        point_counts.iter().copied(),
      );
      let ids = split_optional(
        ids_writer.as_mut().and_then(|writer| writer.typed::<i32>()),
        point_counts.iter().copied(),
      );
      let attributes = split_generic_writers(&mut generic_writers, tasks.len(), |task, _| {
        point_counts[task]
      });

      tasks
        .par_iter()
        .zip(positions)
        .zip(ids)
        .zip(attributes)
        .with_min_len(TASK_GRAIN_SIZE)
        .for_each(|(((task, positions), ids), attributes)| {
          execute_realize_pointcloud_task(
            options,
            task,
            &all.realize_info[task.info],
            PointCloudTaskOutput {
              positions,
              ids,
              attributes,
            },
          );
        });
    }

    positions_writer.into_iter().for_each(|writer| writer.finish());
    ids_writer.into_iter().for_each(|writer| writer.finish());
    generic_writers.into_iter().flatten().for_each(|writer| writer.finish());
  }

  tracing::debug!(
    tasks = tasks.len(),
    points = tot_points,
    attributes = all.attributes.len(),
    "realized point clouds"
  );
  r_result.replace_pointcloud(dst_pointcloud);
}
