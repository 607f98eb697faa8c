//! Moving attribute values between domains.
//!
//! Reductions average the contributing values. Booleans reduce as "all true",
//! except face to point and face to edge, which use "any true".

use crate::geometry::mesh::{MeshEdge, MeshLoop, MeshPoly};
use crate::gvarray::{GVArray, VArray};
use crate::types::{DataType, Domain};
use crate::value::AttributeType;

/// Borrowed mesh connectivity.
#[derive(Clone, Copy)]
pub(crate) struct MeshTopology<'a> {
  pub verts_num: usize,
  pub edges: &'a [MeshEdge],
  pub polys: &'a [MeshPoly],
  pub loops: &'a [MeshLoop],
}

/// Mean of all contributions per destination element.
fn mix<T: AttributeType>(dst_len: usize, contributions: impl Iterator<Item = (usize, T)>) -> Vec<T> {
  let mut accumulators = vec![T::Accumulator::default(); dst_len];
  let mut counts = vec![0usize; dst_len];
  for (dst, value) in contributions {
    T::mix_add(&mut accumulators[dst], value);
    counts[dst] += 1;
  }
  accumulators
    .into_iter()
    .zip(counts)
    .map(|(accumulator, count)| T::mix_finish(accumulator, count))
    .collect()
}

fn mix_any(dst_len: usize, contributions: impl Iterator<Item = (usize, bool)>) -> Vec<bool> {
  let mut result = vec![false; dst_len];
  for (dst, value) in contributions {
    result[dst] |= value;
  }
  result
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Reduction {
  Mean,
  /// "any" for booleans, mean for everything else.
  AnyOrMean,
}

/// Corner ranges of every polygon, with the polygon index.
fn poly_corners(polys: &[MeshPoly]) -> impl Iterator<Item = (usize, usize)> + '_ {
  polys
    .iter()
    .enumerate()
    .flat_map(|(poly_index, poly)| poly.corners().map(move |corner| (poly_index, corner)))
}

fn adapt_mesh_typed<T: AttributeType>(
  topology: MeshTopology<'_>,
  src: &[T],
  from: Domain,
  to: Domain,
) -> Option<Vec<T>> {
  let MeshTopology {
    verts_num,
    edges,
    polys,
    loops,
  } = topology;
  let result = match (from, to) {
    (Domain::Corner, Domain::Point) => mix(
      verts_num,
      loops.iter().enumerate().map(|(corner, l)| (l.v as usize, src[corner])),
    ),
    (Domain::Point, Domain::Corner) => loops.iter().map(|l| src[l.v as usize]).collect(),
    (Domain::Corner, Domain::Face) => mix(
      polys.len(),
      poly_corners(polys).map(|(poly, corner)| (poly, src[corner])),
    ),
    (Domain::Face, Domain::Corner) => {
      let mut result = vec![T::default(); loops.len()];
      for (poly, corner) in poly_corners(polys) {
        result[corner] = src[poly];
      }
      result
    }
    (Domain::Corner, Domain::Edge) => mix(
      edges.len(),
      polys.iter().flat_map(|poly| {
        poly.corners().flat_map(move |corner| {
          let edge = loops[corner].e as usize;
          [(edge, src[corner]), (edge, src[poly.next_corner(corner)])]
        })
      }),
    ),
    (Domain::Edge, Domain::Corner) => mix(
      loops.len(),
      polys.iter().flat_map(|poly| {
        poly.corners().flat_map(move |corner| {
          let previous = poly.previous_corner(corner);
          [
            (corner, src[loops[corner].e as usize]),
            (corner, src[loops[previous].e as usize]),
          ]
        })
      }),
    ),
    (Domain::Point, Domain::Edge) => mix(
      edges.len(),
      edges.iter().enumerate().flat_map(|(edge, e)| {
        [(edge, src[e.v1 as usize]), (edge, src[e.v2 as usize])]
      }),
    ),
    (Domain::Edge, Domain::Point) => mix(
      verts_num,
      edges
        .iter()
        .enumerate()
        .flat_map(|(edge, e)| [(e.v1 as usize, src[edge]), (e.v2 as usize, src[edge])]),
    ),
    (Domain::Point, Domain::Face) => mix(
      polys.len(),
      poly_corners(polys).map(|(poly, corner)| (poly, src[loops[corner].v as usize])),
    ),
    (Domain::Face, Domain::Point) => mix(
      verts_num,
      poly_corners(polys).map(|(poly, corner)| (loops[corner].v as usize, src[poly])),
    ),
    (Domain::Edge, Domain::Face) => mix(
      polys.len(),
      poly_corners(polys).map(|(poly, corner)| (poly, src[loops[corner].e as usize])),
    ),
    (Domain::Face, Domain::Edge) => mix(
      edges.len(),
      poly_corners(polys).map(|(poly, corner)| (loops[corner].e as usize, src[poly])),
    ),
    _ => return None,
  };
  Some(result)
}

fn adapt_mesh_bool_any(topology: MeshTopology<'_>, src: &[bool], to: Domain) -> Option<Vec<bool>> {
  let MeshTopology {
    verts_num,
    edges,
    polys,
    loops,
  } = topology;
  let result = match to {
    Domain::Point => mix_any(
      verts_num,
      poly_corners(polys).map(|(poly, corner)| (loops[corner].v as usize, src[poly])),
    ),
    Domain::Edge => mix_any(
      edges.len(),
      poly_corners(polys).map(|(poly, corner)| (loops[corner].e as usize, src[poly])),
    ),
    _ => return None,
  };
  Some(result)
}

fn reduction(from: Domain, to: Domain) -> Reduction {
  match (from, to) {
    (Domain::Face, Domain::Point) | (Domain::Face, Domain::Edge) => Reduction::AnyOrMean,
    _ => Reduction::Mean,
  }
}

fn mesh_domain_size(topology: &MeshTopology<'_>, domain: Domain) -> Option<usize> {
  match domain {
    Domain::Point => Some(topology.verts_num),
    Domain::Edge => Some(topology.edges.len()),
    Domain::Face => Some(topology.polys.len()),
    Domain::Corner => Some(topology.loops.len()),
    _ => None,
  }
}

pub(crate) fn adapt_mesh_domain(
  topology: MeshTopology<'_>,
  varray: GVArray,
  from: Domain,
  to: Domain,
) -> Option<GVArray> {
  if from == to {
    return Some(varray);
  }
  let from_size = mesh_domain_size(&topology, from)?;
  if varray.len() != from_size || mesh_domain_size(&topology, to).is_none() {
    return None;
  }

  // A single value stays single, only the size changes.
  if let Some(value) = varray.as_single() {
    let size = mesh_domain_size(&topology, to)?;
    return Some(GVArray::from_single(value, size));
  }

  if varray.data_type() == DataType::Bool && reduction(from, to) == Reduction::AnyOrMean {
    let src = varray.typed::<bool>()?.to_vec();
    return adapt_mesh_bool_any(topology, &src, to).map(GVArray::from_vec);
  }

  crate::with_attribute_type!(varray.data_type(), T => {
    let src = VArray::<T>::from_gvarray(varray)?.to_vec();
    adapt_mesh_typed(topology, &src, from, to).map(GVArray::from_vec)
  })
}

pub(crate) fn adapt_curve_domain(
  offsets: &[i32],
  points_num: usize,
  varray: GVArray,
  from: Domain,
  to: Domain,
) -> Option<GVArray> {
  if from == to {
    return Some(varray);
  }
  let curves_num = offsets.len().saturating_sub(1);
  let curve_points = |curve: usize| offsets[curve] as usize..offsets[curve + 1] as usize;

  match (from, to) {
    (Domain::Point, Domain::Curve) if varray.len() == points_num => {
      if let Some(value) = varray.as_single() {
        return Some(GVArray::from_single(value, curves_num));
      }
      crate::with_attribute_type!(varray.data_type(), T => {
        let src = VArray::<T>::from_gvarray(varray)?.to_vec();
        let result = mix(
          curves_num,
          (0..curves_num).flat_map(|curve| curve_points(curve).map(move |point| (curve, point)))
            .map(|(curve, point)| (curve, src[point])),
        );
        Some(GVArray::from_vec(result))
      })
    }
    (Domain::Curve, Domain::Point) if varray.len() == curves_num => {
      if let Some(value) = varray.as_single() {
        return Some(GVArray::from_single(value, points_num));
      }
      crate::with_attribute_type!(varray.data_type(), T => {
        let src = VArray::<T>::from_gvarray(varray)?.to_vec();
        let mut result = vec![T::default(); points_num];
        for curve in 0..curves_num {
          result[curve_points(curve)].fill(src[curve]);
        }
        Some(GVArray::from_vec(result))
      })
    }
    _ => None,
  }
}

#[cfg(test)]
#[path = "interpolate_test.rs"]
mod interpolate_test;
