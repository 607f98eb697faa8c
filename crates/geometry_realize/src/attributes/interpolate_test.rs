use super::*;
use crate::value::AttributeValue;

/// Two triangles sharing the edge 0-2.
struct Quad {
  edges: Vec<MeshEdge>,
  polys: Vec<MeshPoly>,
  loops: Vec<MeshLoop>,
}

impl Quad {
  fn new() -> Self {
    Self {
      edges: vec![
        MeshEdge { v1: 0, v2: 1 },
        MeshEdge { v1: 1, v2: 2 },
        MeshEdge { v1: 2, v2: 0 },
        MeshEdge { v1: 2, v2: 3 },
        MeshEdge { v1: 3, v2: 0 },
      ],
      polys: vec![MeshPoly::new(0, 3), MeshPoly::new(3, 3)],
      loops: vec![
        MeshLoop { v: 0, e: 0 },
        MeshLoop { v: 1, e: 1 },
        MeshLoop { v: 2, e: 2 },
        MeshLoop { v: 0, e: 2 },
        MeshLoop { v: 2, e: 3 },
        MeshLoop { v: 3, e: 4 },
      ],
    }
  }

  fn topology(&self) -> MeshTopology<'_> {
    MeshTopology {
      verts_num: 4,
      edges: &self.edges,
      polys: &self.polys,
      loops: &self.loops,
    }
  }
}

fn floats(varray: GVArray) -> Vec<f32> {
  varray.typed::<f32>().expect("float result").to_vec()
}

fn bools(varray: GVArray) -> Vec<bool> {
  varray.typed::<bool>().expect("bool result").to_vec()
}

#[test]
fn test_face_to_point_averages() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![2.0f32, 4.0]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Face, Domain::Point).unwrap();
  assert_eq!(floats(result), vec![3.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_face_to_point_bool_is_any() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![true, false]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Face, Domain::Point).unwrap();
  assert_eq!(bools(result), vec![true, true, true, false]);

  let src = GVArray::from_vec(vec![true, false]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Face, Domain::Edge).unwrap();
  // Edge 2 is shared and touches a true face.
  assert_eq!(bools(result), vec![true, true, true, false, false]);
}

#[test]
fn test_point_to_face_bool_is_all() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![true, true, true, false]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Point, Domain::Face).unwrap();
  assert_eq!(bools(result), vec![true, false]);
}

#[test]
fn test_point_to_edge_averages_endpoints() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![0.0f32, 1.0, 2.0, 3.0]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Point, Domain::Edge).unwrap();
  assert_eq!(floats(result), vec![0.5, 1.5, 1.0, 2.5, 1.5]);
}

#[test]
fn test_face_to_corner_broadcasts() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![2i32, 4]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Face, Domain::Corner).unwrap();
  assert_eq!(result.typed::<i32>().unwrap().to_vec(), vec![2, 2, 2, 4, 4, 4]);
}

#[test]
fn test_int_mean_rounds() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![1i32, 2, 0, 0]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Point, Domain::Edge).unwrap();
  assert_eq!(result.typed::<i32>().unwrap().get(0), 2);
}

#[test]
fn test_single_value_stays_single() {
  let quad = Quad::new();
  let src = GVArray::from_single(AttributeValue::Float(7.0), 4);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Point, Domain::Corner).unwrap();
  assert_eq!(result.len(), 6);
  assert_eq!(result.as_single(), Some(AttributeValue::Float(7.0)));
}

#[test]
fn test_mesh_rejects_wrong_size_and_foreign_domain() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![1.0f32, 2.0, 3.0]);
  assert!(adapt_mesh_domain(quad.topology(), src, Domain::Point, Domain::Edge).is_none());

  let src = GVArray::from_vec(vec![1.0f32; 4]);
  assert!(adapt_mesh_domain(quad.topology(), src, Domain::Point, Domain::Curve).is_none());
}

#[test]
fn test_same_domain_is_identity() {
  let quad = Quad::new();
  let src = GVArray::from_vec(vec![1.0f32; 5]);
  let result = adapt_mesh_domain(quad.topology(), src, Domain::Edge, Domain::Edge).unwrap();
  assert_eq!(floats(result), vec![1.0; 5]);
}

#[test]
fn test_curve_point_to_curve_averages() {
  let offsets = [0, 2, 5];
  let src = GVArray::from_vec(vec![1.0f32, 3.0, 2.0, 4.0, 6.0]);
  let result = adapt_curve_domain(&offsets, 5, src, Domain::Point, Domain::Curve).unwrap();
  assert_eq!(floats(result), vec![2.0, 4.0]);

  let src = GVArray::from_vec(vec![true, true, true, false, true]);
  let result = adapt_curve_domain(&offsets, 5, src, Domain::Point, Domain::Curve).unwrap();
  assert_eq!(bools(result), vec![true, false]);
}

#[test]
fn test_curve_to_point_broadcasts() {
  let offsets = [0, 2, 5];
  let src = GVArray::from_vec(vec![7i32, 9]);
  let result = adapt_curve_domain(&offsets, 5, src, Domain::Curve, Domain::Point).unwrap();
  assert_eq!(result.typed::<i32>().unwrap().to_vec(), vec![7, 7, 9, 9, 9]);
}

#[test]
fn test_curve_rejects_mesh_domains() {
  let offsets = [0, 2];
  let src = GVArray::from_vec(vec![1.0f32, 2.0]);
  assert!(adapt_curve_domain(&offsets, 2, src, Domain::Point, Domain::Face).is_none());
}
