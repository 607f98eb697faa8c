//! Sequential walk of the instancing tree that turns every reachable
//! geometry into a task with its destination offset, transform, id and
//! attribute fallbacks.

use std::sync::Arc;

use glam::Mat4;

use super::curves::{AllCurvesInfo, CurvesElementStartIndices, RealizeCurveTask};
use super::mesh::{AllMeshesInfo, MeshElementStartIndices, RealizeMeshTask};
use super::ordered::{AttributeFallbacks, OrderedAttributes};
use super::pointcloud::{AllPointCloudsInfo, RealizePointCloudTask};
use crate::buffer::AttributeBuffer;
use crate::geometry::{GeometryEditData, GeometrySet, InstanceReference, Instances, Volume};
use crate::noise::hash2;
use crate::types::Domain;

/// Attribute fallbacks and id handed down to nested geometry.
#[derive(Clone, Debug)]
pub(crate) struct InstanceContext {
  pub pointclouds: AttributeFallbacks,
  pub meshes: AttributeFallbacks,
  pub curves: AttributeFallbacks,
  pub id: u32,
}

impl InstanceContext {
  pub fn new(gather_info: &GatherTasksInfo<'_>) -> Self {
    Self {
      pointclouds: gather_info.pointclouds.attributes.empty_fallbacks(),
      meshes: gather_info.meshes.attributes.empty_fallbacks(),
      curves: gather_info.curves.attributes.empty_fallbacks(),
      id: 0,
    }
  }
}

#[derive(Default)]
pub(crate) struct GatherTasks {
  pub pointcloud_tasks: Vec<RealizePointCloudTask>,
  pub mesh_tasks: Vec<RealizeMeshTask>,
  pub curve_tasks: Vec<RealizeCurveTask>,
  /// Only the first volume and edit data found anywhere are kept.
  pub first_volume: Option<Arc<Volume>>,
  pub first_edit_data: Option<Arc<GeometryEditData>>,
}

#[derive(Default)]
struct GatherOffsets {
  pointcloud: usize,
  mesh: MeshElementStartIndices,
  curves: CurvesElementStartIndices,
}

pub(crate) struct GatherTasksInfo<'a> {
  pub pointclouds: &'a AllPointCloudsInfo,
  pub meshes: &'a AllMeshesInfo,
  pub curves: &'a AllCurvesInfo,
  pub create_id_attribute_on_any_component: bool,
  r_offsets: GatherOffsets,
  pub r_tasks: GatherTasks,
}

impl<'a> GatherTasksInfo<'a> {
  pub fn new(
    pointclouds: &'a AllPointCloudsInfo,
    meshes: &'a AllMeshesInfo,
    curves: &'a AllCurvesInfo,
  ) -> Self {
    Self {
      pointclouds,
      meshes,
      curves,
      create_id_attribute_on_any_component: pointclouds.create_id_attribute
        || meshes.create_id_attribute
        || curves.create_id_attribute,
      r_offsets: GatherOffsets::default(),
      r_tasks: GatherTasks::default(),
    }
  }
}

/// Per-instance values of the instance attributes that also exist in
/// `ordered`, converted to the slot type.
fn prepare_attribute_fallbacks(
  instances: &Instances,
  ordered: &OrderedAttributes,
) -> Vec<(usize, Arc<AttributeBuffer>)> {
  let attributes = instances.attributes();
  let mut overrides = Vec::new();
  attributes.for_all(|id, meta| {
    if meta.domain != Domain::Instance {
      return true;
    }
    let Some(slot) = ordered.index_of(id) else {
      return true;
    };
    let expected_type = ordered.kinds[slot].data_type;
    match attributes.lookup_with(id, None, Some(expected_type)) {
      Some(varray) => overrides.push((slot, varray.into_shared_buffer())),
      None => tracing::debug!(
        attribute = %id,
        from = %meta.data_type,
        to = %expected_type,
        "instance attribute ignored, it cannot be converted"
      ),
    }
    true
  });
  overrides
}

/// Call `callback` for every geometry set `reference` places, with the
/// transform and id it is placed with.
fn foreach_geometry_in_reference(
  reference: &InstanceReference,
  base_transform: &Mat4,
  id: u32,
  callback: &mut dyn FnMut(&GeometrySet, &Mat4, u32),
) {
  match reference {
    InstanceReference::Object(object) => {
      callback(object.evaluated_geometry(), base_transform, id);
    }
    InstanceReference::Collection(collection) => {
      let offset = Mat4::from_translation(-collection.instance_offset);
      for (index, object) in collection.objects_recursive().iter().enumerate() {
        let transform = *base_transform * offset * object.transform;
        let sub_id = hash2(id, index as u32);
        callback(object.evaluated_geometry(), &transform, sub_id);
      }
    }
    InstanceReference::GeometrySet(geometry) => callback(geometry, base_transform, id),
    InstanceReference::None => {}
  }
}

fn gather_realize_tasks_for_instances(
  gather_info: &mut GatherTasksInfo<'_>,
  instances: &Instances,
  base_transform: &Mat4,
  base_instance_context: &InstanceContext,
) {
  let references = instances.references();
  let handles = instances.reference_handles();
  let transforms = instances.transforms();

  let stored_instance_ids = if gather_info.create_id_attribute_on_any_component {
    instances
      .attributes()
      .lookup("id")
      .filter(|reader| reader.domain == Domain::Instance)
      .map(|reader| reader.varray.into_shared_buffer())
  } else {
    None
  };
  let stored_instance_ids = stored_instance_ids.as_ref().and_then(|ids| ids.typed::<i32>());

  let pointcloud_overrides = prepare_attribute_fallbacks(instances, &gather_info.pointclouds.attributes);
  let mesh_overrides = prepare_attribute_fallbacks(instances, &gather_info.meshes.attributes);
  let curve_overrides = prepare_attribute_fallbacks(instances, &gather_info.curves.attributes);

  for (i, (&handle, transform)) in handles.iter().zip(transforms).enumerate() {
    let Some(reference) = references.get(handle) else {
      continue;
    };
    let new_base_transform = *base_transform * *transform;

    // Every instance starts from the parent context so overrides never leak
    // between siblings.
    let mut instance_context = base_instance_context.clone();
    for (slot, values) in &pointcloud_overrides {
      instance_context.pointclouds[*slot] = Some(values.get(i));
    }
    for (slot, values) in &mesh_overrides {
      instance_context.meshes[*slot] = Some(values.get(i));
    }
    for (slot, values) in &curve_overrides {
      instance_context.curves[*slot] = Some(values.get(i));
    }

    let local_instance_id = if gather_info.create_id_attribute_on_any_component {
      stored_instance_ids.map_or(i as u32, |ids| ids[i] as u32)
    } else {
      0
    };
    let instance_id = hash2(base_instance_context.id, local_instance_id);

    foreach_geometry_in_reference(
      reference,
      &new_base_transform,
      instance_id,
      &mut |geometry, transform, id| {
        instance_context.id = id;
        gather_realize_tasks_recursive(gather_info, geometry, transform, &instance_context);
      },
    );
  }
}

/// Append tasks for `geometry` and everything nested in it.
pub(crate) fn gather_realize_tasks_recursive(
  gather_info: &mut GatherTasksInfo<'_>,
  geometry: &GeometrySet,
  base_transform: &Mat4,
  base_instance_context: &InstanceContext,
) {
  if let Some(mesh) = geometry.mesh() {
    if mesh.verts_num() > 0 {
      if let Some(info) = gather_info.meshes.info_index(mesh) {
        let start_indices = gather_info.r_offsets.mesh;
        gather_info.r_offsets.mesh.advance(mesh);
        gather_info.r_tasks.mesh_tasks.push(RealizeMeshTask {
          start_indices,
          info,
          transform: *base_transform,
          fallbacks: base_instance_context.meshes.clone(),
          id: base_instance_context.id,
        });
      }
    }
  }

  if let Some(pointcloud) = geometry.pointcloud() {
    if pointcloud.points_num() > 0 {
      if let Some(info) = gather_info.pointclouds.info_index(pointcloud) {
        let start_index = gather_info.r_offsets.pointcloud;
        gather_info.r_offsets.pointcloud += pointcloud.points_num();
        gather_info.r_tasks.pointcloud_tasks.push(RealizePointCloudTask {
          start_index,
          info,
          transform: *base_transform,
          fallbacks: base_instance_context.pointclouds.clone(),
          id: base_instance_context.id,
        });
      }
    }
  }

  if let Some(instances) = geometry.instances() {
    gather_realize_tasks_for_instances(gather_info, instances, base_transform, base_instance_context);
  }

  if let Some(volume) = geometry.volume() {
    gather_info.r_tasks.first_volume.get_or_insert_with(|| volume.clone());
  }

  if let Some(curves) = geometry.curves() {
    if curves.curves_num() > 0 {
      if let Some(info) = gather_info.curves.info_index(curves) {
        let start_indices = gather_info.r_offsets.curves;
        gather_info.r_offsets.curves.advance(curves);
        gather_info.r_tasks.curve_tasks.push(RealizeCurveTask {
          start_indices,
          info,
          transform: *base_transform,
          fallbacks: base_instance_context.curves.clone(),
          id: base_instance_context.id,
        });
      }
    }
  }

  if let Some(edit_data) = geometry.edit_data() {
    gather_info.r_tasks.first_edit_data.get_or_insert_with(|| edit_data.clone());
  }
}
