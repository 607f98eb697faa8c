//! Polygon mesh with vertex, edge, face and corner domains.

use std::ops::Range;
use std::sync::Arc;

use glam::Vec3;

use super::runtime::GeometryRuntime;
use super::Material;
use crate::attributes::interpolate::{adapt_mesh_domain, MeshTopology};
use crate::attributes::{
  AttributeAccessor, AttributeLayer, AttributeOwner, AttributeProviders, AttributeStorage,
  AttributeUpdate, BuiltinAttribute, DomainSizes, MutableAttributeAccessor,
};
use crate::buffer::AttributeBuffer;
use crate::gvarray::GVArray;
use crate::types::{DataType, Domain};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshEdge {
  pub v1: u32,
  pub v2: u32,
}

/// Face corner: the vertex it sits on and the edge to the next corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshLoop {
  pub v: u32,
  pub e: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshPoly {
  pub loop_start: u32,
  pub loop_count: u32,
}

impl MeshPoly {
  pub fn new(loop_start: u32, loop_count: u32) -> Self {
    Self {
      loop_start,
      loop_count,
    }
  }

  #[inline]
  pub fn corners(&self) -> Range<usize> {
    let start = self.loop_start as usize;
    start..start + self.loop_count as usize
  }

  /// Corner after `corner` in this face, wrapping around.
  #[inline]
  pub fn next_corner(&self, corner: usize) -> usize {
    let start = self.loop_start as usize;
    start + (corner - start + 1) % self.loop_count as usize
  }

  /// Corner before `corner` in this face, wrapping around.
  #[inline]
  pub fn previous_corner(&self, corner: usize) -> usize {
    let start = self.loop_start as usize;
    let count = self.loop_count as usize;
    start + (corner - start + count - 1) % count
  }
}

static MESH_BUILTINS: [BuiltinAttribute; 5] = [
  BuiltinAttribute::new("position", Domain::Point, DataType::Float3)
    .required()
    .with_update(AttributeUpdate::Positions),
  BuiltinAttribute::new("id", Domain::Point, DataType::Int32),
  BuiltinAttribute::new("material_index", Domain::Face, DataType::Int32),
  BuiltinAttribute::new("shade_smooth", Domain::Face, DataType::Bool),
  BuiltinAttribute::new("crease", Domain::Edge, DataType::Float),
];

pub static MESH_PROVIDERS: AttributeProviders = AttributeProviders {
  builtins: &MESH_BUILTINS,
  domains: &[Domain::Point, Domain::Edge, Domain::Face, Domain::Corner],
};

#[derive(Clone, Debug)]
pub struct Mesh {
  verts_num: usize,
  pub edges: Vec<MeshEdge>,
  pub polys: Vec<MeshPoly>,
  pub loops: Vec<MeshLoop>,
  /// Material slots, indexed by the `material_index` attribute.
  pub materials: Vec<Option<Arc<Material>>>,
  attributes: AttributeStorage,
  runtime: GeometryRuntime,
}

impl Mesh {
  /// Mesh with zeroed positions and default connectivity.
  pub fn new(verts_num: usize, edges_num: usize, polys_num: usize, loops_num: usize) -> Self {
    let mut attributes = AttributeStorage::new();
    attributes.insert(
      "position".into(),
      AttributeLayer::new(
        Domain::Point,
        AttributeBuffer::new_default(DataType::Float3, verts_num),
      ),
    );
    Self {
      verts_num,
      edges: vec![MeshEdge::default(); edges_num],
      polys: vec![MeshPoly::default(); polys_num],
      loops: vec![MeshLoop::default(); loops_num],
      materials: Vec::new(),
      attributes,
      runtime: GeometryRuntime::default(),
    }
  }

  pub fn from_parts(
    positions: Vec<Vec3>,
    edges: Vec<MeshEdge>,
    polys: Vec<MeshPoly>,
    loops: Vec<MeshLoop>,
  ) -> Self {
    let mut mesh = Self::new(positions.len(), 0, 0, 0);
    mesh.edges = edges;
    mesh.polys = polys;
    mesh.loops = loops;
    if let Some(layer) = mesh.attributes.get_mut("position".into()) {
      *layer = AttributeLayer::new(Domain::Point, AttributeBuffer::from_vec(positions));
    }
    mesh
  }

  #[inline]
  pub fn verts_num(&self) -> usize {
    self.verts_num
  }

  #[inline]
  pub fn edges_num(&self) -> usize {
    self.edges.len()
  }

  #[inline]
  pub fn polys_num(&self) -> usize {
    self.polys.len()
  }

  #[inline]
  pub fn loops_num(&self) -> usize {
    self.loops.len()
  }

  pub fn positions(&self) -> &[Vec3] {
    self
      .attributes
      .get("position".into())
      .and_then(|layer| layer.data.typed::<Vec3>())
      .unwrap_or(&[])
  }

  pub(crate) fn topology(&self) -> MeshTopology<'_> {
    MeshTopology {
      verts_num: self.verts_num,
      edges: &self.edges,
      polys: &self.polys,
      loops: &self.loops,
    }
  }

  /// Area weighted vertex normals, cached until positions are written.
  pub fn vertex_normals(&self) -> Arc<[Vec3]> {
    self.runtime.vertex_normals_or_init(|| {
      let positions = self.positions();
      let mut normals = vec![Vec3::ZERO; self.verts_num];
      for poly in &self.polys {
        // Newell's method, robust for non-planar faces.
        let mut face_normal = Vec3::ZERO;
        for corner in poly.corners() {
          let a = positions[self.loops[corner].v as usize];
          let b = positions[self.loops[poly.next_corner(corner)].v as usize];
          face_normal += Vec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
          );
        }
        for corner in poly.corners() {
          normals[self.loops[corner].v as usize] += face_normal;
        }
      }
      normals.iter_mut().for_each(|n| *n = n.normalize_or_zero());
      normals.into()
    })
  }

  pub fn runtime(&self) -> &GeometryRuntime {
    &self.runtime
  }

  #[inline]
  pub fn attributes(&self) -> AttributeAccessor<'_> {
    AttributeAccessor::new(self)
  }

  pub fn attributes_for_write(&mut self) -> MutableAttributeAccessor<'_> {
    let sizes = DomainSizes::from_owner(&*self);
    MutableAttributeAccessor::new(&mut self.attributes, &self.runtime, &MESH_PROVIDERS, sizes)
  }

  /// Connectivity and attributes borrowed separately, for filling a new mesh.
  pub fn parts_for_write(
    &mut self,
  ) -> (
    &mut [MeshEdge],
    &mut [MeshPoly],
    &mut [MeshLoop],
    MutableAttributeAccessor<'_>,
  ) {
    let sizes = DomainSizes::from_owner(&*self);
    (
      &mut self.edges,
      &mut self.polys,
      &mut self.loops,
      MutableAttributeAccessor::new(&mut self.attributes, &self.runtime, &MESH_PROVIDERS, sizes),
    )
  }
}

impl AttributeOwner for Mesh {
  fn attribute_storage(&self) -> &AttributeStorage {
    &self.attributes
  }

  fn attribute_providers(&self) -> &'static AttributeProviders {
    &MESH_PROVIDERS
  }

  fn domain_size(&self, domain: Domain) -> usize {
    match domain {
      Domain::Point => self.verts_num,
      Domain::Edge => self.edges.len(),
      Domain::Face => self.polys.len(),
      Domain::Corner => self.loops.len(),
      Domain::Curve | Domain::Instance => 0,
    }
  }

  fn adapt_domain(&self, varray: GVArray, from: Domain, to: Domain) -> Option<GVArray> {
    adapt_mesh_domain(self.topology(), varray, from, to)
  }
}
