//! Binary serialization of tables.
//!
//! A serialized table is a 32-byte header followed by a Postcard-encoded
//! payload. Dictionaries, descriptors and storage backends can also be
//! encoded on their own, without framing, via [`encode`] and [`decode`].

pub mod native;

pub use native::{
    decode, encode, DeserializeError, FormatFlags, FormatHeader, SerializeError, TableCodec,
    CURRENT_VERSION_MAJOR, CURRENT_VERSION_MINOR, HEADER_SIZE, MAGIC,
};
