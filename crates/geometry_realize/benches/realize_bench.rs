//! Realize-instances benchmarks.
//!
//! Workloads:
//! - **pointcloud_grid**: one shared point cloud instanced on a grid
//! - **mesh_grid**: a small quad grid mesh instanced on a grid, with a
//!   material and a generic face attribute
//! - **nested**: two levels of instancing with instance attributes
//!
//! Each workload runs with regenerated ids and with original ids kept.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geometry_realize::geometry::{MeshEdge, MeshLoop, MeshPoly};
use geometry_realize::{
  realize_instances, AttributeBuffer, AttributeInit, DataType, Domain, GeometrySet,
  InstanceReference, Instances, Material, Mesh, PointCloud, RealizeInstancesOptions,
};
use glam::{Mat4, Vec3};

const POINTS_PER_CLOUD: usize = 1024;
const GRID_SIDE: usize = 8;

// =============================================================================
// Fixtures
// =============================================================================

fn grid_transforms(side: usize, spacing: f32) -> Vec<Mat4> {
  (0..side * side)
    .map(|i| {
      let x = (i % side) as f32 * spacing;
      let y = (i / side) as f32 * spacing;
      Mat4::from_translation(Vec3::new(x, y, 0.0))
    })
    .collect()
}

fn instance_on_grid(geometry: GeometrySet, side: usize, spacing: f32) -> Instances {
  let mut instances = Instances::new();
  let handle = instances.add_reference(InstanceReference::from(geometry));
  for transform in grid_transforms(side, spacing) {
    instances.add_instance(handle, transform);
  }
  instances
}

fn pointcloud(points_num: usize) -> PointCloud {
  let positions = (0..points_num)
    .map(|i| Vec3::new(i as f32 * 0.01, (i % 7) as f32, 0.0))
    .collect();
  let mut pointcloud = PointCloud::from_positions(positions);
  let weights: Vec<f32> = (0..points_num).map(|i| i as f32 / points_num as f32).collect();
  pointcloud
    .attributes_for_write()
    .add(
      "weight",
      Domain::Point,
      DataType::Float,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(weights)),
    )
    .ok();
  pointcloud
}

/// A `side` x `side` grid of quads.
fn quad_grid(side: usize) -> Mesh {
  let verts_side = side + 1;
  let positions: Vec<Vec3> = (0..verts_side * verts_side)
    .map(|i| Vec3::new((i % verts_side) as f32, (i / verts_side) as f32, 0.0))
    .collect();

  let mut edges = Vec::new();
  let mut polys = Vec::new();
  let mut loops = Vec::new();
  for y in 0..side {
    for x in 0..side {
      let v0 = (y * verts_side + x) as u32;
      let v1 = v0 + 1;
      let v2 = v1 + verts_side as u32;
      let v3 = v0 + verts_side as u32;
      let corners = [v0, v1, v2, v3];
      polys.push(MeshPoly::new(loops.len() as u32, 4));
      for (i, &v) in corners.iter().enumerate() {
        // Edges are not shared between quads, good enough for timing.
        edges.push(MeshEdge { v1: v, v2: corners[(i + 1) % 4] });
        loops.push(MeshLoop { v, e: (edges.len() - 1) as u32 });
      }
    }
  }

  let polys_num = polys.len();
  let mut mesh = Mesh::from_parts(positions, edges, polys, loops);
  mesh.materials = vec![Some(Material::new("grid"))];
  let mut attributes = mesh.attributes_for_write();
  attributes
    .add("material_index", Domain::Face, DataType::Int32, AttributeInit::DefaultValue)
    .ok();
  attributes
    .add(
      "face_value",
      Domain::Face,
      DataType::Float,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(vec![0.5f32; polys_num])),
    )
    .ok();
  mesh
}

fn options(keep_original_ids: bool) -> RealizeInstancesOptions {
  RealizeInstancesOptions::new().with_keep_original_ids(keep_original_ids)
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_pointcloud_grid(c: &mut Criterion) {
  let mut group = c.benchmark_group("realize_pointcloud_grid");
  group.throughput(Throughput::Elements(
    (POINTS_PER_CLOUD * GRID_SIDE * GRID_SIDE) as u64,
  ));

  let geometry = GeometrySet::from_instances(instance_on_grid(
    GeometrySet::from_pointcloud(pointcloud(POINTS_PER_CLOUD)),
    GRID_SIDE,
    20.0,
  ));

  for keep in [false, true] {
    group.bench_with_input(BenchmarkId::new("keep_original_ids", keep), &keep, |b, &keep| {
      let options = options(keep);
      b.iter(|| black_box(realize_instances(geometry.clone(), &options)))
    });
  }

  group.finish();
}

fn bench_mesh_grid(c: &mut Criterion) {
  let mut group = c.benchmark_group("realize_mesh_grid");

  for side in [4, 16, 32] {
    let geometry = GeometrySet::from_instances(instance_on_grid(
      GeometrySet::from_mesh(quad_grid(side)),
      GRID_SIDE,
      side as f32 + 1.0,
    ));
    group.throughput(Throughput::Elements((side * side * GRID_SIDE * GRID_SIDE) as u64));
    group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, _| {
      let options = options(false);
      b.iter(|| black_box(realize_instances(geometry.clone(), &options)))
    });
  }

  group.finish();
}

fn bench_nested(c: &mut Criterion) {
  let mut group = c.benchmark_group("realize_nested");

  let inner = instance_on_grid(
    GeometrySet::from_pointcloud(pointcloud(POINTS_PER_CLOUD / 4)),
    4,
    5.0,
  );
  let mut outer = instance_on_grid(GeometrySet::from_instances(inner), GRID_SIDE, 30.0);
  let scales: Vec<f32> = (0..outer.instances_num()).map(|i| i as f32).collect();
  outer
    .attributes_for_write()
    .add(
      "scale",
      Domain::Instance,
      DataType::Float,
      AttributeInit::MoveArray(AttributeBuffer::from_vec(scales)),
    )
    .ok();
  let geometry = GeometrySet::from_instances(outer);

  for realize_instance_attributes in [false, true] {
    group.bench_with_input(
      BenchmarkId::new("instance_attributes", realize_instance_attributes),
      &realize_instance_attributes,
      |b, &realize| {
        let options = options(false).with_realize_instance_attributes(realize);
        b.iter(|| black_box(realize_instances(geometry.clone(), &options)))
      },
    );
  }

  group.finish();
}

criterion_group!(benches, bench_pointcloud_grid, bench_mesh_grid, bench_nested);
criterion_main!(benches);
