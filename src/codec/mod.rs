//! Bidirectional JSON codec between wire documents and attribute value trees.
//!
//! Both directions are guided by the [`SchemaRegistry`](crate::schema::SchemaRegistry):
//! the decoder converts each member to its declared data type and the encoder
//! walks attributes in schema declaration order, honoring return visibility.
//! `dateTime` values use the single profile in
//! [`DATE_TIME_FORMAT`](crate::attribute::DATE_TIME_FORMAT) in both directions.

pub mod decoder;
pub mod encoder;

pub use decoder::JsonDecoder;
pub use encoder::JsonEncoder;
