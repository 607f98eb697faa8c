use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::test_utils::*;
use super::*;
use crate::attributes::AnonymousAttributeId;
use crate::buffer::AttributeBuffer;
use crate::geometry::{
  Collection, CurveType, GeometryEditData, InstanceReference, Instances, Material, MeshEdge,
  MeshLoop, Object, PointCloud, Volume,
};
use crate::noise::hash2;
use crate::types::{DataType, Domain};

fn realize(geometry: GeometrySet) -> GeometrySet {
  realize_instances(geometry, &RealizeInstancesOptions::default())
}

fn point_values<T: crate::value::AttributeType>(geometry: &GeometrySet, name: &str) -> Option<Vec<T>> {
  let pointcloud = geometry.pointcloud()?;
  Some(pointcloud.attributes().lookup_typed::<T>(name, Domain::Point)?.to_vec())
}

#[test]
fn test_options_builder() {
  let options = RealizeInstancesOptions::new()
    .with_keep_original_ids(true)
    .with_realize_instance_attributes(false);

  assert!(options.keep_original_ids);
  assert!(!options.realize_instance_attributes);
  assert!(options.propagation.propagate_all);

  let defaults = RealizeInstancesOptions::default();
  assert!(!defaults.keep_original_ids);
  assert!(defaults.realize_instance_attributes);
}

#[test]
fn test_without_instances_returns_input() {
  let geometry = GeometrySet::from_pointcloud(pointcloud_line(3));
  let pointcloud = geometry.pointcloud().cloned();

  let result = realize(geometry);

  assert!(Arc::ptr_eq(
    result.pointcloud().expect("point cloud"),
    pointcloud.as_ref().expect("point cloud"),
  ));
}

#[test]
fn test_pointcloud_instances_are_transformed() {
  let source = GeometrySet::from_pointcloud(pointcloud_line(3));
  let instances = instance_geometry(source, &[translate(10.0, 0.0, 0.0), translate(20.0, 0.0, 0.0)]);

  let result = realize(GeometrySet::from_instances(instances));

  assert!(!result.has_instances());
  let pointcloud = result.pointcloud().expect("point cloud");
  assert_eq!(pointcloud.points_num(), 6);
  let xs: Vec<f32> = pointcloud.positions().iter().map(|p| p.x).collect();
  assert_eq!(xs, vec![10.0, 11.0, 12.0, 20.0, 21.0, 22.0]);
}

#[test]
fn test_top_level_geometry_is_kept_next_to_instances() {
  let mut geometry = GeometrySet::from_pointcloud(pointcloud_line(2));
  geometry.replace_instances(instance_geometry(
    GeometrySet::from_pointcloud(pointcloud_line(1)),
    &[translate(0.0, 5.0, 0.0)],
  ));

  let result = realize(geometry);

  let positions = result.pointcloud().expect("point cloud").positions().to_vec();
  assert_eq!(positions, vec![Vec3::ZERO, Vec3::X, Vec3::new(0.0, 5.0, 0.0)]);
}

#[test]
fn test_missing_attribute_falls_back_to_default() {
  let a = with_point_attribute(
    pointcloud_line(2),
    "w",
    AttributeBuffer::from_vec(vec![1.0f32, 2.0]),
  );
  let b = pointcloud_line(1);
  let mut instances = Instances::new();
  let a = instances.add_reference(GeometrySet::from_pointcloud(a));
  let b = instances.add_reference(GeometrySet::from_pointcloud(b));
  instances.add_instance(a, Mat4::IDENTITY);
  instances.add_instance(b, Mat4::IDENTITY);

  let options = RealizeInstancesOptions::new().with_keep_original_ids(true);
  let result = realize_instances(GeometrySet::from_instances(instances), &options);

  let pointcloud = result.pointcloud().expect("point cloud");
  assert_eq!(pointcloud.points_num(), 3);
  assert_eq!(point_values::<f32>(&result, "w"), Some(vec![1.0, 2.0, 0.0]));
  let ids = pointcloud
    .attributes()
    .lookup_or_default_typed("id", Domain::Point, 0i32)
    .to_vec();
  assert_eq!(ids, vec![0, 0, 0]);
}

#[test]
fn test_instance_attribute_is_broadcast() {
  let source = GeometrySet::from_pointcloud(pointcloud_line(2));
  let instances = with_instance_attribute(
    instance_geometry(source, &[Mat4::IDENTITY, Mat4::IDENTITY]),
    "foo",
    AttributeBuffer::from_vec(vec![3.0f32, 4.0]),
  );

  let result = realize(GeometrySet::from_instances(instances.clone()));
  assert_eq!(point_values::<f32>(&result, "foo"), Some(vec![3.0, 3.0, 4.0, 4.0]));

  let options = RealizeInstancesOptions::new().with_realize_instance_attributes(false);
  let result = realize_instances(GeometrySet::from_instances(instances), &options);
  assert!(!result.pointcloud().expect("point cloud").attributes().contains("foo"));
}

#[test]
fn test_source_value_wins_over_instance_value() {
  let source = with_point_attribute(
    pointcloud_line(2),
    "foo",
    AttributeBuffer::from_vec(vec![7.0f32, 8.0]),
  );
  let instances = with_instance_attribute(
    instance_geometry(GeometrySet::from_pointcloud(source), &[Mat4::IDENTITY]),
    "foo",
    AttributeBuffer::from_vec(vec![3.0f32]),
  );

  let result = realize(GeometrySet::from_instances(instances));

  assert_eq!(point_values::<f32>(&result, "foo"), Some(vec![7.0, 8.0]));
}

#[test]
fn test_instance_attribute_is_converted_to_point_type() {
  let source = with_point_attribute(
    pointcloud_line(1),
    "foo",
    AttributeBuffer::from_vec(vec![Vec3::ONE]),
  );
  let other = GeometrySet::from_pointcloud(pointcloud_line(1));
  let mut instances = Instances::new();
  let a = instances.add_reference(GeometrySet::from_pointcloud(source));
  let b = instances.add_reference(other);
  instances.add_instance(a, Mat4::IDENTITY);
  instances.add_instance(b, Mat4::IDENTITY);
  let instances = with_instance_attribute(instances, "foo", AttributeBuffer::from_vec(vec![0i32, 5]));

  let result = realize(GeometrySet::from_instances(instances));

  let pointcloud = result.pointcloud().expect("point cloud");
  assert_eq!(
    pointcloud.attributes().lookup_meta_data("foo").map(|meta| meta.data_type),
    Some(DataType::Float3)
  );
  assert_eq!(
    point_values::<Vec3>(&result, "foo"),
    Some(vec![Vec3::ONE, Vec3::splat(5.0)])
  );
}

#[test]
fn test_mixed_types_merge_to_most_complex() {
  let a = with_point_attribute(pointcloud_line(1), "m", AttributeBuffer::from_vec(vec![2i32]));
  let b = with_point_attribute(pointcloud_line(1), "m", AttributeBuffer::from_vec(vec![0.5f32]));
  let mut instances = Instances::new();
  let a = instances.add_reference(GeometrySet::from_pointcloud(a));
  let b = instances.add_reference(GeometrySet::from_pointcloud(b));
  instances.add_instance(a, Mat4::IDENTITY);
  instances.add_instance(b, Mat4::IDENTITY);

  let result = realize(GeometrySet::from_instances(instances));

  assert_eq!(point_values::<f32>(&result, "m"), Some(vec![2.0, 0.5]));
}

#[test]
fn test_regenerated_ids_are_unique_and_deterministic() {
  let source = with_point_attribute(
    pointcloud_line(2),
    "id",
    AttributeBuffer::from_vec(vec![0i32, 1]),
  );
  let instances = instance_geometry(
    GeometrySet::from_pointcloud(source),
    &[Mat4::IDENTITY, Mat4::IDENTITY],
  );
  let geometry = GeometrySet::from_instances(instances);

  let first = point_values::<i32>(&realize(geometry.clone()), "id").expect("ids");
  let second = point_values::<i32>(&realize(geometry), "id").expect("ids");

  assert_eq!(first, second);
  assert_ne!(first[0..2], first[2..4]);
  let instance_id = hash2(0, 0);
  assert_eq!(first[0], hash2(instance_id, 0) as i32);
  assert_eq!(first[1], hash2(instance_id, 1) as i32);
}

#[test]
fn test_keep_original_ids_copies_stored_ids() {
  let source = with_point_attribute(
    pointcloud_line(2),
    "id",
    AttributeBuffer::from_vec(vec![40i32, 41]),
  );
  let instances = with_instance_attribute(
    instance_geometry(GeometrySet::from_pointcloud(source), &[Mat4::IDENTITY, Mat4::IDENTITY]),
    "id",
    AttributeBuffer::from_vec(vec![7i32, 8]),
  );

  let options = RealizeInstancesOptions::new().with_keep_original_ids(true);
  let result = realize_instances(GeometrySet::from_instances(instances), &options);

  assert_eq!(point_values::<i32>(&result, "id"), Some(vec![40, 41, 40, 41]));
}

#[test]
fn test_mesh_connectivity_is_shifted() {
  let instances = instance_geometry(
    GeometrySet::from_mesh(triangle()),
    &[Mat4::IDENTITY, translate(0.0, 0.0, 1.0)],
  );

  let result = realize(GeometrySet::from_instances(instances));

  let mesh = result.mesh().expect("mesh");
  assert_eq!(mesh.verts_num(), 6);
  assert_eq!(mesh.edges_num(), 6);
  assert_eq!(mesh.polys_num(), 2);
  assert_eq!(mesh.loops_num(), 6);
  assert_eq!(mesh.edges[3], MeshEdge { v1: 3, v2: 4 });
  assert_eq!(mesh.loops[5], MeshLoop { v: 5, e: 5 });
  assert_eq!(mesh.polys[1].loop_start, 3);
  assert_eq!(mesh.positions()[3], Vec3::new(0.0, 0.0, 1.0));
}

#[test]
fn test_mesh_materials_are_merged() {
  let m1 = Material::new("M1");
  let m2 = Material::new("M2");
  let mut instances = Instances::new();
  let a = instances.add_reference(GeometrySet::from_mesh(triangle_with_material(m1.clone())));
  let b = instances.add_reference(GeometrySet::from_mesh(triangle_with_material(m2.clone())));
  instances.add_instance(a, Mat4::IDENTITY);
  instances.add_instance(b, Mat4::IDENTITY);
  instances.add_instance(a, Mat4::IDENTITY);

  let result = realize(GeometrySet::from_instances(instances));

  let mesh = result.mesh().expect("mesh");
  assert_eq!(mesh.materials.len(), 2);
  assert!(Arc::ptr_eq(mesh.materials[0].as_ref().expect("M1"), &m1));
  assert!(Arc::ptr_eq(mesh.materials[1].as_ref().expect("M2"), &m2));
  let indices = mesh
    .attributes()
    .lookup_typed::<i32>("material_index", Domain::Face)
    .expect("material index")
    .to_vec();
  assert_eq!(indices, vec![0, 1, 0]);
}

#[test]
fn test_mesh_shade_smooth_defaults_where_missing() {
  let mut smooth = triangle();
  smooth
    .attributes_for_write()
    .add(
      "shade_smooth",
      Domain::Face,
      DataType::Bool,
      crate::attributes::AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![true])),
    )
    .expect("shade smooth");
  let mut instances = Instances::new();
  let a = instances.add_reference(GeometrySet::from_mesh(smooth));
  let b = instances.add_reference(GeometrySet::from_mesh(triangle()));
  instances.add_instance(a, Mat4::IDENTITY);
  instances.add_instance(b, Mat4::IDENTITY);

  let result = realize(GeometrySet::from_instances(instances));

  let mesh = result.mesh().expect("mesh");
  let smooth = mesh
    .attributes()
    .lookup_typed::<bool>("shade_smooth", Domain::Face)
    .expect("shade smooth")
    .to_vec();
  assert_eq!(smooth, vec![true, false]);
  assert!(!mesh.attributes().contains("crease"));
}

#[test]
fn test_curves_offsets_and_defaults() {
  let mut with_radius = two_curves();
  with_radius
    .attributes_for_write()
    .add(
      "radius",
      Domain::Point,
      DataType::Float,
      crate::attributes::AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![0.5f32; 5])),
    )
    .expect("radius");
  let mut instances = Instances::new();
  let a = instances.add_reference(GeometrySet::from_curves(with_radius));
  let b = instances.add_reference(GeometrySet::from_curves(two_curves()));
  instances.add_instance(a, Mat4::IDENTITY);
  instances.add_instance(b, translate(0.0, 0.0, 2.0));

  let result = realize(GeometrySet::from_instances(instances));

  let curves = result.curves().expect("curves");
  assert_eq!(curves.points_num(), 10);
  assert_eq!(curves.curves_num(), 4);
  assert_eq!(curves.offsets(), &[0, 2, 5, 7, 10]);
  let radius = curves
    .attributes()
    .lookup_typed::<f32>("radius", Domain::Point)
    .expect("radius")
    .to_vec();
  assert_eq!(&radius[..5], &[0.5; 5]);
  assert_eq!(&radius[5..], &[1.0; 5]);
  assert_eq!(curves.positions()[5], Vec3::new(0.0, 0.0, 2.0));
  assert!(!curves.attributes().contains("handle_left"));
  assert!(!curves.attributes().contains("resolution"));
}

#[test]
fn test_curves_handles_and_type_counts() {
  let mut bezier = two_curves();
  {
    let mut attributes = bezier.attributes_for_write();
    for name in ["handle_left", "handle_right"] {
      attributes
        .add(
          name,
          Domain::Point,
          DataType::Float3,
          crate::attributes::AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![Vec3::ONE; 5])),
        )
        .expect("handle");
    }
    attributes
      .add(
        "curve_type",
        Domain::Curve,
        DataType::Int8,
        crate::attributes::AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![
          CurveType::Bezier as i8,
          CurveType::Poly as i8,
        ])),
      )
      .expect("curve type");
  }
  let mut instances = Instances::new();
  let a = instances.add_reference(GeometrySet::from_curves(bezier));
  let b = instances.add_reference(GeometrySet::from_curves(two_curves()));
  instances.add_instance(a, translate(1.0, 0.0, 0.0));
  instances.add_instance(b, Mat4::IDENTITY);

  let result = realize(GeometrySet::from_instances(instances));

  let curves = result.curves().expect("curves");
  let handles = curves
    .attributes()
    .lookup_typed::<Vec3>("handle_right", Domain::Point)
    .expect("handles")
    .to_vec();
  assert_eq!(handles[0], Vec3::new(2.0, 1.0, 1.0));
  assert_eq!(handles[9], Vec3::ZERO);

  let mut expected = [0; crate::geometry::CURVE_TYPES_NUM];
  expected[CurveType::Bezier as usize] = 1;
  expected[CurveType::Poly as usize] = 1;
  expected[CurveType::CatmullRom as usize] = 2;
  assert_eq!(curves.curve_type_counts(), expected);
}

#[test]
fn test_collection_instance_offset() {
  let object_a = Object::new(
    "a",
    translate(0.0, 1.0, 0.0),
    GeometrySet::from_pointcloud(pointcloud_line(1)),
  );
  let object_b = Object::new(
    "b",
    translate(0.0, 2.0, 0.0),
    GeometrySet::from_pointcloud(pointcloud_line(1)),
  );
  let collection = Arc::new(Collection {
    name: "c".into(),
    instance_offset: Vec3::new(1.0, 0.0, 0.0),
    objects: vec![object_a, object_b],
    children: Vec::new(),
  });
  let mut instances = Instances::new();
  let handle = instances.add_reference(InstanceReference::Collection(collection));
  instances.add_instance(handle, translate(5.0, 0.0, 0.0));

  let result = realize(GeometrySet::from_instances(instances));

  let positions = result.pointcloud().expect("point cloud").positions().to_vec();
  assert_eq!(positions, vec![Vec3::new(4.0, 1.0, 0.0), Vec3::new(4.0, 2.0, 0.0)]);
}

#[test]
fn test_nested_instances_compose_transforms() {
  let inner = instance_geometry(
    GeometrySet::from_pointcloud(pointcloud_line(1)),
    &[translate(0.0, 1.0, 0.0)],
  );
  let outer = instance_geometry(
    GeometrySet::from_instances(inner),
    &[translate(10.0, 0.0, 0.0), translate(20.0, 0.0, 0.0)],
  );

  let result = realize(GeometrySet::from_instances(outer));

  let positions = result.pointcloud().expect("point cloud").positions().to_vec();
  assert_eq!(positions, vec![Vec3::new(10.0, 1.0, 0.0), Vec3::new(20.0, 1.0, 0.0)]);
}

#[test]
fn test_only_first_volume_and_edit_data_are_kept() {
  let mut first = GeometrySet::new();
  first.replace_volume(Volume { name: "first".into() });
  first.replace_edit_data(GeometryEditData { name: "first".into() });
  let mut second = GeometrySet::new();
  second.replace_volume(Volume { name: "second".into() });
  let mut instances = Instances::new();
  let a = instances.add_reference(first);
  let b = instances.add_reference(second);
  instances.add_instance(a, Mat4::IDENTITY);
  instances.add_instance(b, Mat4::IDENTITY);

  let result = realize(GeometrySet::from_instances(instances));

  assert_eq!(result.volume().map(|volume| volume.name.as_str()), Some("first"));
  assert_eq!(result.edit_data().map(|edit| edit.name.as_str()), Some("first"));
  assert!(result.pointcloud().is_none());
}

#[test]
fn test_anonymous_attributes_follow_propagation() {
  let kept = AnonymousAttributeId::new("kept");
  let dropped = AnonymousAttributeId::new("dropped");
  let mut pointcloud = pointcloud_line(1);
  for id in [&kept, &dropped] {
    pointcloud
      .attributes_for_write()
      .add(
        id,
        Domain::Point,
        DataType::Float,
        crate::attributes::AttributeInit::DefaultValue,
      )
      .expect("anonymous attribute");
  }
  let instances = instance_geometry(GeometrySet::from_pointcloud(pointcloud), &[Mat4::IDENTITY]);

  let options = RealizeInstancesOptions::new().with_propagation(AttributePropagation::only([kept.clone()]));
  let result = realize_instances(GeometrySet::from_instances(instances), &options);

  let attributes = result.pointcloud().expect("point cloud").attributes();
  assert!(attributes.contains(&kept));
  assert!(!attributes.contains(&dropped));
}

#[test]
fn test_timed_reports_task_counts() {
  let mut source = GeometrySet::from_pointcloud(pointcloud_line(2));
  source.replace_mesh(triangle());
  let instances = instance_geometry(source, &[Mat4::IDENTITY; 3]);

  let (result, stats) =
    realize_instances_timed(GeometrySet::from_instances(instances), &RealizeInstancesOptions::default());

  assert_eq!(stats.pointcloud_tasks, 3);
  assert_eq!(stats.mesh_tasks, 3);
  assert_eq!(stats.curve_tasks, 0);
  assert!(stats.total_us >= stats.execute_us);
  assert_eq!(result.pointcloud().map(|p| p.points_num()), Some(6));
  assert!(result.curves().is_none());
}

#[test]
fn test_empty_sources_produce_no_geometry() {
  let instances = instance_geometry(
    GeometrySet::from_pointcloud(PointCloud::new(0)),
    &[Mat4::IDENTITY],
  );

  let result = realize(GeometrySet::from_instances(instances));

  assert!(result.pointcloud().is_none());
  assert!(result.is_empty());
}
