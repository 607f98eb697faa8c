//! Mesh preprocessing and task execution.
//!
//! Besides the generic attributes, meshes carry connectivity that must be
//! shifted into the destination index space and material indices that are
//! remapped into one merged material table.

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
use crate::geometry::{
  ByAddress, GeometryComponentType, GeometrySet, Material, Mesh, MeshEdge, MeshLoop, MeshPoly,
};
use crate::threading::{
  copy_transformed_positions, parallel_copy, parallel_fill, split_lengths_mut, ELEMENT_GRAIN_SIZE,
  TASK_GRAIN_SIZE,
};
use crate::types::{AttributeMetaData, DataType, Domain};

/// Attributes written by the mesh pass itself rather than as generic slots.
const HANDLED_ATTRIBUTES: [&str; 5] = ["position", "normal", "material_index", "shade_smooth", "crease"];

pub(crate) struct MeshRealizeInfo {
  pub mesh: Arc<Mesh>,
  /// Source material slot to slot in the merged table.
  pub material_index_map: Vec<i32>,
  pub attributes: Vec<Option<Arc<AttributeBuffer>>>,
  pub stored_ids: Option<Arc<AttributeBuffer>>,
  pub material_indices: Option<Arc<AttributeBuffer>>,
  pub shade_smooth: Option<Arc<AttributeBuffer>>,
  pub crease: Option<Arc<AttributeBuffer>>,
}

#[derive(Default)]
pub(crate) struct AllMeshesInfo {
  pub attributes: OrderedAttributes,
  pub order: IndexSet<ByAddress<Mesh>>,
  pub realize_info: Vec<MeshRealizeInfo>,
  /// Union of every source material table, in first-seen order.
  pub materials: IndexSet<Option<ByAddress<Material>>>,
  pub create_id_attribute: bool,
  pub create_material_index_attribute: bool,
  pub create_shade_smooth_attribute: bool,
  pub create_crease_attribute: bool,
}

impl AllMeshesInfo {
  pub fn info_index(&self, mesh: &Arc<Mesh>) -> Option<usize> {
    self.order.get_index_of(&ByAddress(mesh.clone()))
  }
}

/// Where a task's elements start in the destination mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct MeshElementStartIndices {
  pub vertex: usize,
  pub edge: usize,
  pub poly: usize,
  pub loop_: usize,
}

impl MeshElementStartIndices {
  pub fn advance(&mut self, mesh: &Mesh) {
    self.vertex += mesh.verts_num();
    self.edge += mesh.edges_num();
    self.poly += mesh.polys_num();
    self.loop_ += mesh.loops_num();
  }
}

pub(crate) struct RealizeMeshTask {
  pub start_indices: MeshElementStartIndices,
  pub info: usize,
  pub transform: Mat4,
  pub fallbacks: AttributeFallbacks,
  pub id: u32,
}

#[tracing::instrument(skip_all, name = "realize::preprocess_meshes")]
pub(crate) fn preprocess_meshes(
  geometry: &GeometrySet,
  options: &RealizeInstancesOptions,
) -> AllMeshesInfo {
  let (attributes, create_id_attribute) = gather_generic_attributes(
    geometry,
    GeometryComponentType::Mesh,
    options.realize_instance_attributes,
    &options.propagation,
    &HANDLED_ATTRIBUTES,
  );

  let mut order = IndexSet::new();
  geometry.foreach_geometry_recursive(&mut |geometry| {
    if let Some(mesh) = geometry.mesh() {
      if mesh.verts_num() > 0 {
        order.insert(ByAddress(mesh.clone()));
      }
    }
  });

  let mut materials = IndexSet::new();
  let mut realize_info = Vec::with_capacity(order.len());
  for mesh in &order {
    let material_index_map = mesh
      .materials
      .iter()
      .map(|material| materials.insert_full(material.clone().map(ByAddress)).0 as i32)
      .collect();
    let src_attributes = mesh.attributes();
    realize_info.push(MeshRealizeInfo {
      mesh: mesh.0.clone(),
      material_index_map,
      attributes: resolve_source_attributes(src_attributes, &attributes),
      stored_ids: if create_id_attribute {
        resolve_builtin(src_attributes, "id", Domain::Point, DataType::Int32)
      } else {
        None
      },
      material_indices: resolve_builtin(src_attributes, "material_index", Domain::Face, DataType::Int32),
      shade_smooth: resolve_builtin(src_attributes, "shade_smooth", Domain::Face, DataType::Bool),
      crease: resolve_builtin(src_attributes, "crease", Domain::Edge, DataType::Float),
    });
  }

  let create_material_index_attribute =
    !materials.is_empty() || realize_info.iter().any(|info| info.material_indices.is_some());
  let create_shade_smooth_attribute = realize_info.iter().any(|info| info.shade_smooth.is_some());
  let create_crease_attribute = realize_info.iter().any(|info| info.crease.is_some());

  AllMeshesInfo {
    attributes,
    order,
    realize_info,
    materials,
    create_id_attribute,
    create_material_index_attribute,
    create_shade_smooth_attribute,
    create_crease_attribute,
  }
}

struct MeshTaskOutput<'a> {
  edges: &'a mut [MeshEdge],
  polys: &'a mut [MeshPoly],
  loops: &'a mut [MeshLoop],
  positions: Option<&'a mut [Vec3]>,
  ids: Option<&'a mut [i32]>,
  material_indices: Option<&'a mut [i32]>,
  shade_smooth: Option<&'a mut [bool]>,
  crease: Option<&'a mut [f32]>,
  attributes: Vec<Option<GMutableSpan<'a>>>,
}

fn execute_realize_mesh_task(
  options: &RealizeInstancesOptions,
  task: &RealizeMeshTask,
  info: &MeshRealizeInfo,
  dst: MeshTaskOutput<'_>,
) {
  let mesh = &*info.mesh;
  let start = task.start_indices;

  if let Some(positions) = dst.positions {
    copy_transformed_positions(mesh.positions(), &task.transform, positions);
  }

  let vertex_offset = start.vertex as u32;
  let edge_offset = start.edge as u32;
  let loop_offset = start.loop_ as u32;
  dst
    .edges
    .par_iter_mut()
    .zip(mesh.edges.par_iter())
    .with_min_len(ELEMENT_GRAIN_SIZE)
    .for_each(|(dst, src)| {
      *dst = MeshEdge {
        v1: src.v1 + vertex_offset,
        v2: src.v2 + vertex_offset,
      };
    });
  dst
    .loops
    .par_iter_mut()
    .zip(mesh.loops.par_iter())
    .with_min_len(ELEMENT_GRAIN_SIZE)
    .for_each(|(dst, src)| {
      *dst = MeshLoop {
        v: src.v + vertex_offset,
        e: src.e + edge_offset,
      };
    });
  dst
    .polys
    .par_iter_mut()
    .zip(mesh.polys.par_iter())
    .with_min_len(ELEMENT_GRAIN_SIZE)
    .for_each(|(dst, src)| {
      *dst = MeshPoly::new(src.loop_start + loop_offset, src.loop_count);
    });

  if let Some(material_indices) = dst.material_indices {
    let src_indices = info.material_indices.as_ref().and_then(|buffer| buffer.typed::<i32>());
    let map = &info.material_index_map;
    material_indices
      .par_iter_mut()
      .enumerate()
      .with_min_len(ELEMENT_GRAIN_SIZE)
      .for_each(|(poly, dst)| {
        let src_index = src_indices.map_or(0, |indices| indices[poly]);
        // Out of range indices are invalid input, fall back to the first slot.
        *dst = usize::try_from(src_index)
          .ok()
          .and_then(|index| map.get(index))
          .copied()
          .unwrap_or(0);
      });
  }

  if let Some(shade_smooth) = dst.shade_smooth {
    match info.shade_smooth.as_ref().and_then(|buffer| buffer.typed::<bool>()) {
      Some(src) => parallel_copy(src, shade_smooth),
      None => parallel_fill(false, shade_smooth),
    }
  }
  if let Some(crease) = dst.crease {
    match info.crease.as_ref().and_then(|buffer| buffer.typed::<f32>()) {
      Some(src) => parallel_copy(src, crease),
      None => parallel_fill(0.0, crease),
    }
  }

  if let Some(ids) = dst.ids {
    let stored_ids = info.stored_ids.as_ref().and_then(|ids| ids.typed::<i32>());
    create_result_ids(options.keep_original_ids, stored_ids, task.id, ids);
  }

  copy_generic_attributes_to_result(&info.attributes, &task.fallbacks, dst.attributes);
}

#[tracing::instrument(skip_all, name = "realize::execute_meshes", fields(tasks = tasks.len()))]
pub(crate) fn execute_realize_mesh_tasks(
  options: &RealizeInstancesOptions,
  all: &AllMeshesInfo,
  tasks: &[RealizeMeshTask],
  r_result: &mut GeometrySet,
) {
  let Some(last_task) = tasks.last() else {
    return;
  };
  let meshes: Vec<&Mesh> = tasks
    .iter()
    .map(|task| &*all.realize_info[task.info].mesh)
    .collect();
  let mut totals = last_task.start_indices;
  if let Some(last_mesh) = meshes.last() {
    totals.advance(last_mesh);
  }

  let mut dst_mesh = Mesh::new(totals.vertex, totals.edge, totals.poly, totals.loop_);
  dst_mesh.materials = all
    .materials
    .iter()
    .map(|material| material.as_ref().map(|material| material.0.clone()))
    .collect();

  {
    let (dst_edges, dst_polys, dst_loops, mut dst_attributes) = dst_mesh.parts_for_write();

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
    let material_index_slot = push_fixed(
      all.create_material_index_attribute,
      "material_index",
      Domain::Face,
      DataType::Int32,
    );
    let shade_smooth_slot = push_fixed(
      all.create_shade_smooth_attribute,
      "shade_smooth",
      Domain::Face,
      DataType::Bool,
    );
    let crease_slot = push_fixed(all.create_crease_attribute, "crease", Domain::Edge, DataType::Float);
    let fixed_num = requests.len();
    requests.extend(all.attributes.requests());

    let mut writers = dst_attributes.lookup_or_add_for_write_only_spans(&requests);
    let mut generic_writers = writers.split_off(fixed_num);
    let mut take = |slot: Option<usize>| slot.and_then(|slot| writers[slot].take());
    let mut positions_writer = take(Some(0));
    let mut ids_writer = take(id_slot);
    let mut material_index_writer = take(material_index_slot);
    let mut shade_smooth_writer = take(shade_smooth_slot);
    let mut crease_writer = take(crease_slot);

    {
      let _span = tracing::info_span!("realize::mesh_tasks").entered();
      let vert_counts = || meshes.iter().map(|mesh| mesh.verts_num());
      let edge_counts = || meshes.iter().map(|mesh| mesh.edges_num());
      let poly_counts = || meshes.iter().map(|mesh| mesh.polys_num());
      let loop_counts = || meshes.iter().map(|mesh| mesh.loops_num());

      let edges = split_lengths_mut(dst_edges, edge_counts());
      let polys = split_lengths_mut(dst_polys, poly_counts());
      let loops = split_lengths_mut(dst_loops, loop_counts());
      let positions = split_optional(
        positions_writer.as_mut().and_then(|writer| writer.typed::<Vec3>()),
        vert_counts(),
      );
      let ids = split_optional(ids_writer.as_mut().and_then(|writer| writer.typed::<i32>()), vert_counts());
      let material_indices = split_optional(
        material_index_writer.as_mut().and_then(|writer| writer.typed::<i32>()),
        poly_counts(),
      );
      let shade_smooth = split_optional(
        shade_smooth_writer.as_mut().and_then(|writer| writer.typed::<bool>()),
        poly_counts(),
      );
      let crease = split_optional(
        crease_writer.as_mut().and_then(|writer| writer.typed::<f32>()),
        edge_counts(),
      );
      let attributes = split_generic_writers(&mut generic_writers, tasks.len(), |task, domain| {
        let mesh = meshes[task];
        match domain {
          Domain::Point => mesh.verts_num(),
          Domain::Edge => mesh.edges_num(),
          Domain::Face => mesh.polys_num(),
          Domain::Corner => mesh.loops_num(),
          Domain::Curve | Domain::Instance => 0,
        }
      });

      let mut edges = edges.into_iter();
      let mut polys = polys.into_iter();
      let mut loops = loops.into_iter();
      let mut positions = positions.into_iter();
      let mut ids = ids.into_iter();
      let mut material_indices = material_indices.into_iter();
      let mut shade_smooth = shade_smooth.into_iter();
      let mut crease = crease.into_iter();
      let mut attributes = attributes.into_iter();
      let outputs: Vec<MeshTaskOutput<'_>> = (0..tasks.len())
        .map(|_| MeshTaskOutput {
          edges: edges.next().unwrap_or_default(),
          polys: polys.next().unwrap_or_default(),
          loops: loops.next().unwrap_or_default(),
          positions: positions.next().flatten(),
          ids: ids.next().flatten(),
          material_indices: material_indices.next().flatten(),
          shade_smooth: shade_smooth.next().flatten(),
          crease: crease.next().flatten(),
          attributes: attributes.next().unwrap_or_default(),
        })
        .collect();

      tasks
        .par_iter()
        .zip(outputs)
        .with_min_len(TASK_GRAIN_SIZE)
        .for_each(|(task, output)| {
          execute_realize_mesh_task(options, task, &all.realize_info[task.info], output);
        });
    }

    for writer in [
      positions_writer,
      ids_writer,
      material_index_writer,
      shade_smooth_writer,
      crease_writer,
    ]
    .into_iter()
    .flatten()
    {
      writer.finish();
    }
    generic_writers.into_iter().flatten().for_each(|writer| writer.finish());
  }

  tracing::debug!(
    tasks = tasks.len(),
    vertices = totals.vertex,
    edges = totals.edge,
    faces = totals.poly,
    corners = totals.loop_,
    materials = all.materials.len(),
    "realized meshes"
  );
  r_result.replace_mesh(dst_mesh);
}
