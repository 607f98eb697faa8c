//! geometry_realize - type-erased geometry attributes and instance realization
//!
//! This crate models geometry the way a node-based procedural modeler sees
//! it: meshes, curves, point clouds and instances, each carrying named
//! attribute columns of a handful of element types over a handful of
//! domains. On top of that it provides implicit type conversions, lazily
//! evaluated fields and a parallel pass that flattens nested instances into
//! plain geometry.
//!
//! # Features
//!
//! - **Type-erased arrays**: [`GVArray`] wraps dense, single-value,
//!   computed and converted columns behind one read interface
//! - **Implicit conversions**: a process-wide registry of pairwise type
//!   conversions applied on read and write
//! - **Attribute accessors**: lookup with domain interpolation and type
//!   conversion, typed writers with a `finish()` protocol
//! - **Fields**: small input graphs evaluated per element, with domain
//!   detection and capture into attributes
//! - **Realize instances**: parallel flattening of instance trees with
//!   attribute propagation, material merging and stable ids
//!
//! # Example
//!
//! ```ignore
//! use geometry_realize::{realize_instances, GeometrySet, RealizeInstancesOptions};
//!
//! let geometry: GeometrySet = build_scene();
//! let realized = realize_instances(geometry, &RealizeInstancesOptions::default());
//!
//! if let Some(mesh) = realized.mesh() {
//!   println!("{} vertices", mesh.verts_num());
//! }
//! ```

pub mod color;
pub mod error;
pub mod types;
pub mod value;

pub mod buffer;
pub mod conversions;
pub mod gvarray;
pub mod index_mask;

// Attribute storage and access
pub mod attributes;
pub mod geometry;

// Lazily evaluated per-element inputs
pub mod fields;

pub mod noise;
pub mod threading;

// Instance realization
pub mod realize;

// Re-export commonly used items
pub use attributes::{
  gather_attributes_for_propagation, AnonymousAttributeId, AttributeAccessor, AttributeId,
  AttributeIdRef, AttributeInit, AttributePropagation, GAttributeReader, GAttributeWriter,
  GSpanAttributeWriter, MutableAttributeAccessor,
};
pub use buffer::{AttributeBuffer, GMutableSpan, GSpan};
pub use color::{ColorGeometry4b, ColorGeometry4f};
pub use conversions::{get_implicit_type_conversions, ConversionFunctions, DataTypeConversions};
pub use error::AttributeError;
pub use fields::{Field, FieldContext, FieldInput};
pub use geometry::{
  Collection, CurveType, Curves, GeometryComponentType, GeometryEditData, GeometrySet,
  InstanceReference, Instances, Material, Mesh, Object, PointCloud, Volume,
};
pub use gvarray::{GVArray, GVMutableArray, VArray};
pub use index_mask::IndexMask;
pub use realize::{realize_instances, realize_instances_timed, RealizeInstancesOptions, RealizeStats};
pub use types::{AttributeKind, AttributeMetaData, DataType, Domain};
pub use value::{AttributeType, AttributeValue};
