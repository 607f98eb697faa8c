//! Geometry fixtures shared by realize tests.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::attributes::AttributeInit;
use crate::buffer::AttributeBuffer;
use crate::geometry::{
  Curves, GeometrySet, InstanceReference, Instances, Material, Mesh, MeshEdge, MeshLoop, MeshPoly,
  PointCloud,
};
use crate::types::{DataType, Domain};

/// Points along the x axis at 0, 1, 2, ...
pub fn pointcloud_line(points_num: usize) -> PointCloud {
  PointCloud::from_positions((0..points_num).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect())
}

/// Add a point attribute filled from `values`.
pub fn with_point_attribute(mut pointcloud: PointCloud, name: &str, values: AttributeBuffer) -> PointCloud {
  let data_type = values.data_type();
  pointcloud
    .attributes_for_write()
    .add(name, Domain::Point, data_type, AttributeInit::MoveArray(values))
    .expect("fixture attribute");
  pointcloud
}

/// A single triangle.
pub fn triangle() -> Mesh {
  Mesh::from_parts(
    vec![Vec3::ZERO, Vec3::X, Vec3::Y],
    vec![
      MeshEdge { v1: 0, v2: 1 },
      MeshEdge { v1: 1, v2: 2 },
      MeshEdge { v1: 2, v2: 0 },
    ],
    vec![MeshPoly::new(0, 3)],
    vec![
      MeshLoop { v: 0, e: 0 },
      MeshLoop { v: 1, e: 1 },
      MeshLoop { v: 2, e: 2 },
    ],
  )
}

/// A triangle whose only face uses `material`.
pub fn triangle_with_material(material: Arc<Material>) -> Mesh {
  let mut mesh = triangle();
  mesh.materials = vec![Some(material)];
  mesh
    .attributes_for_write()
    .add(
      "material_index",
      Domain::Face,
      DataType::Int32,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![0i32])),
    )
    .expect("fixture material index");
  mesh
}

/// Two curves with two and three points.
pub fn two_curves() -> Curves {
  Curves::from_point_counts(
    vec![
      Vec3::ZERO,
      Vec3::X,
      Vec3::new(0.0, 1.0, 0.0),
      Vec3::new(1.0, 1.0, 0.0),
      Vec3::new(2.0, 1.0, 0.0),
    ],
    &[2, 3],
  )
}

/// Instances placing `geometry` once per transform.
pub fn instance_geometry(geometry: GeometrySet, transforms: &[Mat4]) -> Instances {
  let mut instances = Instances::new();
  let handle = instances.add_reference(InstanceReference::from(geometry));
  for transform in transforms {
    instances.add_instance(handle, *transform);
  }
  instances
}

/// Add an instance attribute filled from `values`.
pub fn with_instance_attribute(mut instances: Instances, name: &str, values: AttributeBuffer) -> Instances {
  let data_type = values.data_type();
  instances
    .attributes_for_write()
    .add(name, Domain::Instance, data_type, AttributeInit::MoveArray(values))
    .expect("fixture instance attribute");
  instances
}

pub fn translate(x: f32, y: f32, z: f32) -> Mat4 {
  Mat4::from_translation(Vec3::new(x, y, z))
}
