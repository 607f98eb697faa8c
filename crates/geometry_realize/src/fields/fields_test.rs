use glam::Vec3;

use super::*;
use crate::attributes::AttributeInit;
use crate::buffer::AttributeBuffer;
use crate::conversions::get_implicit_type_conversions;
use crate::geometry::PointCloud;
use crate::realize::test_utils::{pointcloud_line, triangle, two_curves, with_point_attribute};
use crate::types::Domain;

fn evaluate_on<'a>(context: impl Into<FieldContext<'a>>, field: &Field, size: usize) -> GVArray {
  field.evaluate(&context.into(), &IndexMask::full(size))
}

#[test]
fn test_constant_is_single() {
  let pointcloud = pointcloud_line(4);
  let field = Field::constant(AttributeValue::Float(1.5));
  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 4);
  assert_eq!(result.len(), 4);
  assert_eq!(result.as_single(), Some(AttributeValue::Float(1.5)));
  assert!(field.field_inputs().is_empty());
}

#[test]
fn test_index_input() {
  let pointcloud = pointcloud_line(3);
  let field = Field::from_input(IndexFieldInput);
  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 3);
  assert_eq!(result.typed::<i32>().unwrap().to_vec(), vec![0, 1, 2]);
}

#[test]
fn test_attribute_input_reads_requested_type() {
  let pointcloud = with_point_attribute(
    pointcloud_line(2),
    "count",
    AttributeBuffer::from_vec(vec![2i32, 5]),
  );
  let field = Field::from_input(AttributeFieldInput::new("count", DataType::Float));
  assert_eq!(field.data_type(), DataType::Float);

  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 2);
  assert_eq!(result.typed::<f32>().unwrap().to_vec(), vec![2.0, 5.0]);
}

#[test]
fn test_missing_attribute_is_default() {
  let pointcloud = pointcloud_line(2);
  let field = Field::from_input(AttributeFieldInput::new("missing", DataType::Float3));
  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 2);
  assert_eq!(result.as_single(), Some(AttributeValue::Float3(Vec3::ZERO)));
}

#[test]
fn test_converted_field() {
  let pointcloud = pointcloud_line(3);
  let field = get_implicit_type_conversions()
    .try_convert_field(Field::from_input(IndexFieldInput), DataType::Float3)
    .unwrap();
  assert_eq!(field.data_type(), DataType::Float3);
  assert_eq!(field.field_inputs().len(), 1);

  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 3);
  assert_eq!(result.get(2), AttributeValue::Float3(Vec3::splat(2.0)));
  assert_eq!(format!("{field:?}"), "Field(Field(Index) as float3)");
}

#[test]
fn test_converted_constant_stays_single() {
  let pointcloud = pointcloud_line(2);
  let field = get_implicit_type_conversions()
    .try_convert_field(Field::constant(AttributeValue::Int32(3)), DataType::Float)
    .unwrap();
  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 2);
  assert_eq!(result.as_single(), Some(AttributeValue::Float(3.0)));
}

#[test]
fn test_mesh_input_in_geometry_context() {
  let mesh = triangle();
  let field = Field::from_input(FaceCornerCountFieldInput);

  let context = GeometryFieldContext::new(GeometryRef::Mesh(&mesh), Domain::Corner);
  let result = evaluate_on(context, &field, 3);
  assert_eq!(result.typed::<i32>().unwrap().to_vec(), vec![3, 3, 3]);

  // A mesh input has nothing to read from a point cloud.
  let pointcloud = pointcloud_line(2);
  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 2);
  assert_eq!(result.as_single(), Some(AttributeValue::Int32(0)));
}

#[test]
fn test_curve_point_count_on_points() {
  let curves = two_curves();
  let field = Field::from_input(CurvePointCountFieldInput);
  let result = evaluate_on(CurvesFieldContext::new(&curves, Domain::Point), &field, 5);
  assert_eq!(result.typed::<i32>().unwrap().to_vec(), vec![2, 2, 3, 3, 3]);
}

#[test]
fn test_id_or_index() {
  let field = Field::from_input(IdOrIndexFieldInput);

  let pointcloud = pointcloud_line(3);
  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 3);
  assert_eq!(result.typed::<i32>().unwrap().to_vec(), vec![0, 1, 2]);

  let mut pointcloud = PointCloud::new(2);
  pointcloud
    .attributes_for_write()
    .add(
      "id",
      Domain::Point,
      DataType::Int32,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![10i32, 20])),
    )
    .unwrap();
  let result = evaluate_on(PointCloudFieldContext::new(&pointcloud), &field, 2);
  assert_eq!(result.typed::<i32>().unwrap().to_vec(), vec![10, 20]);
}

#[test]
fn test_equal_inputs() {
  let a = AttributeFieldInput::new("weight", DataType::Float);
  let b = AttributeFieldInput::new("weight", DataType::Float);
  let c = AttributeFieldInput::new("weight", DataType::Int32);
  assert!(a.is_equal_to(&b));
  assert!(!a.is_equal_to(&c));
  assert!(!a.is_equal_to(&IndexFieldInput));
}
