//! Named, typed and domained attribute columns on geometry.
//!
//! Every geometry kind stores its columns in an [`AttributeStorage`] and
//! exposes them through [`AttributeAccessor`] and
//! [`MutableAttributeAccessor`]. Writers must be finished after mutation.

pub mod accessor;
pub mod id;
pub mod init;
pub(crate) mod interpolate;
pub mod propagation;
pub mod storage;
pub mod writer;

pub use accessor::{
  AttributeAccessor, AttributeOwner, DomainSizes, GAttributeReader, MutableAttributeAccessor,
};
pub use id::{AnonymousAttributeId, AttributeId, AttributeIdRef};
pub use init::AttributeInit;
pub use propagation::{
  copy_attribute_domain, gather_attributes_for_propagation, retrieve_attributes_for_transfer,
  AttributePropagation, AttributeTransferData,
};
pub use storage::{
  AttributeLayer, AttributeProviders, AttributeStorage, AttributeUpdate, BuiltinAttribute,
};
pub use writer::{GAttributeWriter, GSpanAttributeWriter};
