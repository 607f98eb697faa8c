use crate::buffer::AttributeBuffer;
use crate::gvarray::GVArray;

/// How the values of a newly added attribute are initialized.
#[derive(Clone, Debug)]
pub enum AttributeInit {
  /// Caller fills every value right after adding. Storage starts out with
  /// type defaults, Rust has no uninitialized columns.
  Construct,
  /// Every value is the type default.
  DefaultValue,
  /// Copy from an array of the domain size.
  VArray(GVArray),
  /// Take ownership of a buffer of the domain size.
  MoveArray(AttributeBuffer),
}
