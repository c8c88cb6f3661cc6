//! The two wire formats an instruction can be encoded in.

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

/**
  Selects which wire format an operation reads or writes. Addresses, record sizes, and
  relative branch offsets are all format specific, so most program level operations take
  one of these.
*/
#[derive(
StrumDisplay, EnumString, IntoStaticStr,
Clone,        Copy,       Eq,            PartialEq, Debug, Hash
)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
  /// Fixed 8 byte records (16 for the double-width loads).
  Canonical,
  /// Variable length records, 2 to 10 bytes depending on the instruction family.
  Compressed,
}

impl Format {
  /// The format an image in this format is converted into.
  pub fn other(&self) -> Format {
    match self {
      Format::Canonical  => Format::Compressed,
      Format::Compressed => Format::Canonical
    }
  }
}
