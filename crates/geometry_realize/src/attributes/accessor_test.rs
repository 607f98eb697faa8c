use std::sync::{Arc, Mutex};

use glam::Vec3;

use super::*;
use crate::attributes::AnonymousAttributeId;
use crate::geometry::{Mesh, PointCloud};
use crate::realize::test_utils::triangle;

fn pointcloud_with(name: &str, values: Vec<f32>) -> PointCloud {
  let mut pointcloud = PointCloud::new(values.len());
  pointcloud
    .attributes_for_write()
    .add(
      name,
      Domain::Point,
      DataType::Float,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(values)),
    )
    .unwrap();
  pointcloud
}

#[test]
fn test_add_then_lookup() {
  let pointcloud = pointcloud_with("weight", vec![0.5, 1.5]);
  let attributes = pointcloud.attributes();

  let reader = attributes.lookup("weight").unwrap();
  assert_eq!(reader.domain, Domain::Point);
  assert_eq!(reader.varray.typed::<f32>().unwrap().to_vec(), vec![0.5, 1.5]);
  assert_eq!(
    attributes.lookup_meta_data("weight"),
    Some(AttributeMetaData::new(Domain::Point, DataType::Float))
  );
  assert!(attributes.contains("weight"));
  assert!(!attributes.contains("missing"));
  assert!(attributes.is_builtin("position"));
  assert!(!attributes.is_builtin("weight"));
}

#[test]
fn test_add_rejects_invalid_requests() {
  let mut pointcloud = pointcloud_with("weight", vec![0.0; 3]);
  let mut attributes = pointcloud.attributes_for_write();

  assert_eq!(
    attributes.add("weight", Domain::Point, DataType::Float, AttributeInit::Construct),
    Err(AttributeError::AlreadyExists("weight".to_string()))
  );
  assert_eq!(
    attributes.add("", Domain::Point, DataType::Float, AttributeInit::Construct),
    Err(AttributeError::EmptyName)
  );
  assert!(matches!(
    attributes.add("radius", Domain::Point, DataType::Int32, AttributeInit::Construct),
    Err(AttributeError::BuiltinMismatch { .. })
  ));
  assert_eq!(
    attributes.add("face_value", Domain::Face, DataType::Float, AttributeInit::Construct),
    Err(AttributeError::UnsupportedDomain(Domain::Face))
  );
  assert_eq!(
    attributes.add(
      "short",
      Domain::Point,
      DataType::Float,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![1.0f32])),
    ),
    Err(AttributeError::SizeMismatch {
      expected: 3,
      actual: 1
    })
  );
  assert_eq!(
    attributes.add(
      "wrong_type",
      Domain::Point,
      DataType::Float,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![1i32, 2, 3])),
    ),
    Err(AttributeError::TypeMismatch {
      expected: DataType::Float,
      actual: DataType::Int32
    })
  );
}

#[test]
fn test_add_converts_varray_init() {
  let mut pointcloud = PointCloud::new(2);
  pointcloud
    .attributes_for_write()
    .add(
      "offset",
      Domain::Point,
      DataType::Float3,
      AttributeInit::VArray(GVArray::from_vec(vec![1i32, 2])),
    )
    .unwrap();

  let offsets = pointcloud.attributes().lookup_typed::<Vec3>("offset", Domain::Point).unwrap();
  assert_eq!(offsets.to_vec(), vec![Vec3::ONE, Vec3::splat(2.0)]);
}

#[test]
fn test_remove() {
  let mut pointcloud = pointcloud_with("weight", vec![0.0; 2]);
  let mut attributes = pointcloud.attributes_for_write();

  assert_eq!(
    attributes.remove("position"),
    Err(AttributeError::RequiredBuiltin("position".to_string()))
  );
  assert_eq!(attributes.remove("missing"), Ok(false));
  assert_eq!(attributes.remove("weight"), Ok(true));
  assert!(!attributes.contains("weight"));
}

#[test]
fn test_remove_anonymous() {
  let mut pointcloud = pointcloud_with("weight", vec![0.0; 2]);
  let anonymous = AnonymousAttributeId::new("mask");
  let mut attributes = pointcloud.attributes_for_write();
  attributes
    .add(&anonymous, Domain::Point, DataType::Bool, AttributeInit::DefaultValue)
    .unwrap();

  assert_eq!(attributes.remove_anonymous(), 1);
  assert!(attributes.contains("weight"));
  assert!(!attributes.contains(&anonymous));
}

#[test]
fn test_lookup_with_converts_type() {
  let mut pointcloud = PointCloud::new(2);
  pointcloud
    .attributes_for_write()
    .add(
      "count",
      Domain::Point,
      DataType::Int32,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![3i32, 4])),
    )
    .unwrap();
  let attributes = pointcloud.attributes();

  let floats = attributes.lookup_typed::<f32>("count", Domain::Point).unwrap();
  assert_eq!(floats.to_vec(), vec![3.0, 4.0]);
  // Point clouds have a single domain.
  assert!(attributes.lookup_with("count", Some(Domain::Face), None).is_none());
}

#[test]
fn test_lookup_or_default() {
  let pointcloud = PointCloud::new(3);
  let attributes = pointcloud.attributes();

  let varray = attributes.lookup_or_default(
    "missing",
    Domain::Point,
    DataType::Float,
    Some(AttributeValue::Float(2.0)),
  );
  assert_eq!(varray.len(), 3);
  assert_eq!(varray.as_single(), Some(AttributeValue::Float(2.0)));

  // A default of the wrong type falls back to the type default.
  let varray = attributes.lookup_or_default(
    "missing",
    Domain::Point,
    DataType::Float,
    Some(AttributeValue::Int32(2)),
  );
  assert_eq!(varray.as_single(), Some(AttributeValue::Float(0.0)));

  let typed = attributes.lookup_or_default_typed("missing", Domain::Point, 7i32);
  assert_eq!(typed.to_vec(), vec![7, 7, 7]);
}

#[test]
fn test_mesh_lookup_adapts_domain() {
  let mut mesh = triangle();
  mesh
    .attributes_for_write()
    .add(
      "smooth",
      Domain::Face,
      DataType::Float,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![0.25f32])),
    )
    .unwrap();

  let corners = mesh.attributes().lookup_typed::<f32>("smooth", Domain::Corner).unwrap();
  assert_eq!(corners.to_vec(), vec![0.25; 3]);
}

#[test]
fn test_position_writer_clears_normals() {
  let mut mesh = triangle();
  assert_eq!(mesh.vertex_normals()[0], Vec3::Z);
  assert!(mesh.runtime().has_vertex_normals());

  let mut attributes = mesh.attributes_for_write();
  let mut writer = attributes.lookup_for_write_span("position").unwrap();
  writer.typed::<Vec3>().unwrap()[1] = Vec3::new(0.0, 0.0, 1.0);
  writer.finish();

  assert!(!mesh.runtime().has_vertex_normals());
  assert_eq!(mesh.runtime().change_count(), 1);
}

#[test]
fn test_write_as_converts_back() {
  let mut pointcloud = PointCloud::new(2);
  let mut attributes = pointcloud.attributes_for_write();
  attributes
    .add("count", Domain::Point, DataType::Int32, AttributeInit::DefaultValue)
    .unwrap();

  let mut writer = attributes.lookup_for_write_as("count", DataType::Float).unwrap();
  writer.varray.set_by_move(1, AttributeValue::Float(2.7)).unwrap();
  assert_eq!(writer.varray.get(1), AttributeValue::Float(2.0));
  writer.finish();

  let stored = pointcloud.attributes().lookup("count").unwrap().varray;
  assert_eq!(stored.typed::<i32>().unwrap().to_vec(), vec![0, 2]);
}

#[test]
fn test_lookup_or_add_for_write_requires_matching_meta() {
  let mut pointcloud = pointcloud_with("weight", vec![0.0; 2]);
  let mut attributes = pointcloud.attributes_for_write();

  assert!(attributes
    .lookup_or_add_for_write("weight", Domain::Point, DataType::Int32, AttributeInit::Construct)
    .is_none());

  let writer = attributes
    .lookup_or_add_for_write("fresh", Domain::Point, DataType::Bool, AttributeInit::Construct)
    .unwrap();
  assert_eq!(writer.varray.len(), 2);
  writer.finish();
}

#[test]
fn test_write_only_spans_in_request_order() {
  let mut pointcloud = pointcloud_with("weight", vec![0.0; 2]);
  let mut attributes = pointcloud.attributes_for_write();

  let requests = vec![
    (AttributeId::from("b"), AttributeMetaData::new(Domain::Point, DataType::Int32)),
    (AttributeId::from("weight"), AttributeMetaData::new(Domain::Point, DataType::Bool)),
    (AttributeId::from("a"), AttributeMetaData::new(Domain::Point, DataType::Float)),
    (AttributeId::from("b"), AttributeMetaData::new(Domain::Point, DataType::Int32)),
  ];
  let mut writers = attributes.lookup_or_add_for_write_only_spans(&requests);
  assert_eq!(writers.len(), 4);
  assert!(writers[1].is_none());
  assert!(writers[3].is_none());

  let mut b = writers[0].take().unwrap();
  let mut a = writers[2].take().unwrap();
  b.typed::<i32>().unwrap().copy_from_slice(&[1, 2]);
  a.typed::<f32>().unwrap().copy_from_slice(&[0.5, 0.25]);
  b.finish();
  a.finish();
  drop(writers);

  let attributes = pointcloud.attributes();
  assert_eq!(attributes.lookup_typed::<i32>("b", Domain::Point).unwrap().to_vec(), vec![1, 2]);
  assert_eq!(
    attributes.lookup_typed::<f32>("a", Domain::Point).unwrap().to_vec(),
    vec![0.5, 0.25]
  );
}

#[test]
fn test_for_all_stops_early() {
  let pointcloud = pointcloud_with("weight", vec![0.0; 2]);
  let mut visited = 0;
  let finished = pointcloud.attributes().for_all(|_, _| {
    visited += 1;
    false
  });
  assert!(!finished);
  assert_eq!(visited, 1);
}

#[test]
fn test_domain_sizes() {
  let mesh: Mesh = triangle();
  let sizes = DomainSizes::from_owner(&mesh);
  assert_eq!(sizes.get(Domain::Point), 3);
  assert_eq!(sizes.get(Domain::Corner), 3);
  assert_eq!(sizes.get(Domain::Face), 1);
  assert_eq!(sizes.get(Domain::Curve), 0);
  assert_eq!(sizes.with(Domain::Curve, 4).get(Domain::Curve), 4);
}

#[test]
fn test_all_ids_in_insertion_order() {
  let anonymous = AnonymousAttributeId::new("selection");
  let mut pointcloud = pointcloud_with("weight", vec![1.0, 2.0]);
  {
    let mut attributes = pointcloud.attributes_for_write();
    attributes
      .add(&anonymous, Domain::Point, DataType::Bool, AttributeInit::DefaultValue)
      .unwrap();
    attributes
      .add("radius", Domain::Point, DataType::Float, AttributeInit::DefaultValue)
      .unwrap();

    let ids: Vec<AttributeId> = attributes.all_ids().into_iter().collect();
    assert_eq!(
      ids,
      vec![
        AttributeId::from("position"),
        AttributeId::from("weight"),
        AttributeId::from(&anonymous),
        AttributeId::from("radius"),
      ]
    );
  }

  let ids = pointcloud.attributes().all_ids();
  assert_eq!(ids.len(), 4);
  assert_eq!(ids.get_index_of(&AttributeId::from(&anonymous)), Some(2));
  assert!(!ids.contains(&AttributeId::from(&AnonymousAttributeId::new("selection"))));

  pointcloud.attributes_for_write().remove_anonymous();
  let ids = pointcloud.attributes().all_ids();
  assert_eq!(ids.len(), 3);
  assert!(!ids.contains(&AttributeId::from(&anonymous)));
}

/// Captures formatted tracing output.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
  fn contents(&self) -> String {
    String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
  }
}

impl std::io::Write for CapturedLogs {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

#[test]
fn test_unfinished_writer_is_reported() {
  let logs = CapturedLogs::default();
  let writer = logs.clone();
  let subscriber = tracing_subscriber::fmt()
    .with_writer(move || writer.clone())
    .with_ansi(false)
    .finish();

  let mut pointcloud = pointcloud_with("weight", vec![1.0, 2.0]);
  tracing::subscriber::with_default(subscriber, || {
    let mut attributes = pointcloud.attributes_for_write();
    let writer = attributes.lookup_for_write("weight").unwrap();
    drop(writer);
  });

  // Dropping without finish() reports but does not tag the geometry.
  assert_eq!(pointcloud.runtime().change_count(), 0);
  if cfg!(debug_assertions) {
    let output = logs.contents();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("dropped without calling finish()"), "{output}");
    assert!(output.contains("weight"), "{output}");
  }
}

#[test]
fn test_finish_tags_exactly_once() {
  let logs = CapturedLogs::default();
  let writer = logs.clone();
  let subscriber = tracing_subscriber::fmt()
    .with_writer(move || writer.clone())
    .with_ansi(false)
    .finish();

  let mut pointcloud = pointcloud_with("weight", vec![1.0, 2.0]);
  tracing::subscriber::with_default(subscriber, || {
    let mut attributes = pointcloud.attributes_for_write();
    drop(attributes.lookup_for_write("weight").unwrap());

    let mut writer = attributes.lookup_for_write("weight").unwrap();
    writer.varray.set_by_move(0, AttributeValue::Float(5.0)).unwrap();
    writer.finish();

    attributes.lookup_for_write_span("weight").unwrap().finish();
  });

  // One drop without finish, then two finished writers.
  assert_eq!(pointcloud.runtime().change_count(), 2);
  assert_eq!(
    pointcloud.attributes().lookup_typed::<f32>("weight", Domain::Point).unwrap().to_vec(),
    vec![5.0, 2.0]
  );
  if cfg!(debug_assertions) {
    assert_eq!(logs.contents().matches("dropped without calling finish()").count(), 1);
  }
}
