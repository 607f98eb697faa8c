//! Curves preprocessing and task execution.

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
use crate::geometry::curves::DEFAULT_CURVE_RADIUS;
use crate::geometry::{ByAddress, Curves, GeometryComponentType, GeometrySet, CURVE_TYPES_NUM};
use crate::threading::{
  copy_transformed_positions, parallel_copy, parallel_fill, split_lengths_mut, OFFSET_GRAIN_SIZE,
  TASK_GRAIN_SIZE,
};
use crate::types::{AttributeMetaData, DataType, Domain};

const HANDLED_ATTRIBUTES: [&str; 5] = ["position", "radius", "resolution", "handle_right", "handle_left"];

pub(crate) struct CurvesRealizeInfo {
  pub curves: Arc<Curves>,
  pub attributes: Vec<Option<Arc<AttributeBuffer>>>,
  pub stored_ids: Option<Arc<AttributeBuffer>>,
  pub handle_left: Option<Arc<AttributeBuffer>>,
  pub handle_right: Option<Arc<AttributeBuffer>>,
  pub radius: Option<Arc<AttributeBuffer>>,
  /// Resolution of every curve, defaults included. Only resolved when some
  /// source stores resolutions.
  pub resolution: Option<Arc<AttributeBuffer>>,
}

#[derive(Default)]
pub(crate) struct AllCurvesInfo {
  pub attributes: OrderedAttributes,
  pub order: IndexSet<ByAddress<Curves>>,
  pub realize_info: Vec<CurvesRealizeInfo>,
  pub create_id_attribute: bool,
  pub create_handle_position_attributes: bool,
  pub create_radius_attribute: bool,
  pub create_resolution_attribute: bool,
}

impl AllCurvesInfo {
  pub fn info_index(&self, curves: &Arc<Curves>) -> Option<usize> {
    self.order.get_index_of(&ByAddress(curves.clone()))
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CurvesElementStartIndices {
  pub point: usize,
  pub curve: usize,
}

impl CurvesElementStartIndices {
  pub fn advance(&mut self, curves: &Curves) {
    self.point += curves.points_num();
    self.curve += curves.curves_num();
  }
}

pub(crate) struct RealizeCurveTask {
  pub start_indices: CurvesElementStartIndices,
  pub info: usize,
  pub transform: Mat4,
  pub fallbacks: AttributeFallbacks,
  pub id: u32,
}

#[tracing::instrument(skip_all, name = "realize::preprocess_curves")]
pub(crate) fn preprocess_curves(
  geometry: &GeometrySet,
  options: &RealizeInstancesOptions,
) -> AllCurvesInfo {
  let (attributes, create_id_attribute) = gather_generic_attributes(
    geometry,
    GeometryComponentType::Curve,
    options.realize_instance_attributes,
    &options.propagation,
    &HANDLED_ATTRIBUTES,
  );

  let mut order = IndexSet::new();
  geometry.foreach_geometry_recursive(&mut |geometry| {
    if let Some(curves) = geometry.curves() {
      if curves.curves_num() > 0 {
        order.insert(ByAddress(curves.clone()));
      }
    }
  });

  let create_resolution_attribute = order
    .iter()
    .any(|curves| curves.attributes().contains("resolution"));

  let realize_info: Vec<CurvesRealizeInfo> = order
    .iter()
    .map(|curves| {
      let src_attributes = curves.attributes();
      // Both handles are written together, so only the right one decides.
      let (handle_left, handle_right) = if src_attributes.contains("handle_right") {
        (
          resolve_builtin(src_attributes, "handle_left", Domain::Point, DataType::Float3),
          resolve_builtin(src_attributes, "handle_right", Domain::Point, DataType::Float3),
        )
      } else {
        (None, None)
      };
      CurvesRealizeInfo {
        curves: curves.0.clone(),
        attributes: resolve_source_attributes(src_attributes, &attributes),
        stored_ids: if create_id_attribute {
          resolve_builtin(src_attributes, "id", Domain::Point, DataType::Int32)
        } else {
          None
        },
        handle_left,
        handle_right,
        radius: resolve_builtin(src_attributes, "radius", Domain::Point, DataType::Float),
        resolution: create_resolution_attribute
          .then(|| curves.resolution().into_gvarray().into_shared_buffer()),
      }
    })
    .collect();

  let create_handle_position_attributes = realize_info.iter().any(|info| info.handle_right.is_some());
  let create_radius_attribute = realize_info.iter().any(|info| info.radius.is_some());

  AllCurvesInfo {
    attributes,
    order,
    realize_info,
    create_id_attribute,
    create_handle_position_attributes,
    create_radius_attribute,
    create_resolution_attribute,
  }
}

struct CurvesTaskOutput<'a> {
  offsets: &'a mut [i32],
  positions: Option<&'a mut [Vec3]>,
  handle_left: Option<&'a mut [Vec3]>,
  handle_right: Option<&'a mut [Vec3]>,
  radius: Option<&'a mut [f32]>,
  resolution: Option<&'a mut [i32]>,
  ids: Option<&'a mut [i32]>,
  attributes: Vec<Option<GMutableSpan<'a>>>,
}

/// Transformed handles, or zero where the source has none.
fn copy_handles(src: Option<&Arc<AttributeBuffer>>, transform: &Mat4, dst: &mut [Vec3]) {
  match src.and_then(|buffer| buffer.typed::<Vec3>()) {
    Some(src) => copy_transformed_positions(src, transform, dst),
    None => parallel_fill(Vec3::ZERO, dst),
  }
}

fn execute_realize_curve_task(
  options: &RealizeInstancesOptions,
  task: &RealizeCurveTask,
  info: &CurvesRealizeInfo,
  dst: CurvesTaskOutput<'_>,
) {
  let curves = &*info.curves;

  if let Some(positions) = dst.positions {
    copy_transformed_positions(curves.positions(), &task.transform, positions);
  }
  if let Some(handle_left) = dst.handle_left {
    copy_handles(info.handle_left.as_ref(), &task.transform, handle_left);
  }
  if let Some(handle_right) = dst.handle_right {
    copy_handles(info.handle_right.as_ref(), &task.transform, handle_right);
  }

  if let Some(radius) = dst.radius {
    match info.radius.as_ref().and_then(|buffer| buffer.typed::<f32>()) {
      Some(src) => parallel_copy(src, radius),
      None => parallel_fill(DEFAULT_CURVE_RADIUS, radius),
    }
  }
  if let Some(resolution) = dst.resolution {
    if let Some(src) = info.resolution.as_ref().and_then(|buffer| buffer.typed::<i32>()) {
      parallel_copy(src, resolution);
    }
  }

  let point_offset = task.start_indices.point as i32;
  dst
    .offsets
    .par_iter_mut()
    .zip(curves.offsets()[..curves.curves_num()].par_iter())
    .with_min_len(OFFSET_GRAIN_SIZE)
    .for_each(|(dst, src)| *dst = src + point_offset);

  if let Some(ids) = dst.ids {
    let stored_ids = info.stored_ids.as_ref().and_then(|ids| ids.typed::<i32>());
    create_result_ids(options.keep_original_ids, stored_ids, task.id, ids);
  }

  copy_generic_attributes_to_result(&info.attributes, &task.fallbacks, dst.attributes);
}

#[tracing::instrument(skip_all, name = "realize::execute_curves", fields(tasks = tasks.len()))]
pub(crate) fn execute_realize_curve_tasks(
  options: &RealizeInstancesOptions,
  all: &AllCurvesInfo,
  tasks: &[RealizeCurveTask],
  r_result: &mut GeometrySet,
) {
  let Some(last_task) = tasks.last() else {
    return;
  };
  let sources: Vec<&Curves> = tasks
    .iter()
    .map(|task| &*all.realize_info[task.info].curves)
    .collect();
  let mut totals = last_task.start_indices;
  if let Some(last_curves) = sources.last() {
    totals.advance(last_curves);
  }

  let mut type_counts = [0; CURVE_TYPES_NUM];
  for curves in &sources {
    for (total, count) in type_counts.iter_mut().zip(curves.curve_type_counts()) {
      *total += count;
    }
  }

  let mut dst_curves = Curves::new(totals.point, totals.curve);
  {
    let (dst_offsets, mut dst_attributes) = dst_curves.parts_for_write();

    let mut requests = vec![(
      AttributeId::from("position"),
      AttributeMetaData::new(Domain::Point, DataType::Float3),
    )];
    let mut push_fixed = |create: bool, name: &str, domain: Domain, data_type: DataType| {
      create.then(|| {
        requests.push((AttributeId::from(name), AttributeMetaData::new(domain, data_type)));
        requests.len() - 1
      })
    };
    let id_slot = push_fixed(all.create_id_attribute, "id", Domain::Point, DataType::Int32);
    let handles = all.create_handle_position_attributes;
    let handle_left_slot = push_fixed(handles, "handle_left", Domain::Point, DataType::Float3);
    let handle_right_slot = push_fixed(handles, "handle_right", Domain::Point, DataType::Float3);
    let radius_slot = push_fixed(all.create_radius_attribute, "radius", Domain::Point, DataType::Float);
    let resolution_slot = push_fixed(
      all.create_resolution_attribute,
      "resolution",
      Domain::Curve,
      DataType::Int32,
    );
    let fixed_num = requests.len();
    requests.extend(all.attributes.requests());

    let mut writers = dst_attributes.lookup_or_add_for_write_only_spans(&requests);
    let mut generic_writers = writers.split_off(fixed_num);
    let mut take = |slot: Option<usize>| slot.and_then(|slot| writers[slot].take());
    let mut positions_writer = take(Some(0));
    let mut ids_writer = take(id_slot);
    let mut handle_left_writer = take(handle_left_slot);
    let mut handle_right_writer = take(handle_right_slot);
    let mut radius_writer = take(radius_slot);
    let mut resolution_writer = take(resolution_slot);

    {
      let _span = tracing::info_span!("realize::curve_tasks").entered();
      let point_counts = || sources.iter().map(|curves| curves.points_num());
      let curve_counts = || sources.iter().map(|curves| curves.curves_num());

      // The final offset already holds the total point count.
      let (dst_offsets, _) = dst_offsets.split_at_mut(totals.curve);
      let mut offsets = split_lengths_mut(dst_offsets, curve_counts()).into_iter();
      let mut positions = split_optional(
        positions_writer.as_mut().and_then(|writer| writer.typed::<Vec3>()),
        point_counts(),
      )
      .into_iter();
      let mut handle_left = split_optional(
        handle_left_writer.as_mut().and_then(|writer| writer.typed::<Vec3>()),
        point_counts(),
      )
      .into_iter();
      let mut handle_right = split_optional(
        handle_right_writer.as_mut().and_then(|writer| writer.typed::<Vec3>()),
        point_counts(),
      )
      .into_iter();
      let mut radius = split_optional(
        radius_writer.as_mut().and_then(|writer| writer.typed::<f32>()),
        point_counts(),
      )
      .into_iter();
      let mut resolution = split_optional(
        resolution_writer.as_mut().and_then(|writer| writer.typed::<i32>()),
        curve_counts(),
      )
      .into_iter();
      let mut ids = split_optional(ids_writer.as_mut().and_then(|writer| writer.typed::<i32>()), point_counts())
        .into_iter();
      let mut attributes = split_generic_writers(&mut generic_writers, tasks.len(), |task, domain| {
        let curves = sources[task];
        match domain {
          Domain::Point => curves.points_num(),
          Domain::Curve => curves.curves_num(),
          _ => 0,
        }
      })
      .into_iter();

      let outputs: Vec<CurvesTaskOutput<'_>> = (0..tasks.len())
        .map(|_| CurvesTaskOutput {
          offsets: offsets.next().unwrap_or_default(),
          positions: positions.next().flatten(),
          handle_left: handle_left.next().flatten(),
          handle_right: handle_right.next().flatten(),
          radius: radius.next().flatten(),
          resolution: resolution.next().flatten(),
          ids: ids.next().flatten(),
          attributes: attributes.next().unwrap_or_default(),
        })
        .collect();

      tasks
        .par_iter()
        .zip(outputs)
        .with_min_len(TASK_GRAIN_SIZE)
        .for_each(|(task, output)| {
          execute_realize_curve_task(options, task, &all.realize_info[task.info], output);
        });
    }

    for writer in [
      positions_writer,
      ids_writer,
      handle_left_writer,
      handle_right_writer,
      radius_writer,
      resolution_writer,
    ]
    .into_iter()
    .flatten()
    {
      writer.finish();
    }
    generic_writers.into_iter().flatten().for_each(|writer| writer.finish());
  }

  // Finishing a `curve_type` writer drops the cache, so set it afterwards.
  dst_curves.set_curve_type_counts(type_counts);

  tracing::debug!(
    tasks = tasks.len(),
    points = totals.point,
    curves = totals.curve,
    "realized curves"
  );
  r_result.replace_curves(dst_curves);
}
