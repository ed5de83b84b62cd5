#![warn(missing_docs)]

//! Morphstore transformation engine: pluggable forward/inverse codecs with a
//! policy table deciding which pipeline participant (client, transport, server)
//! transforms in which direction.
//!
//! Write path: caller data → forward codec → stored/wire form
//! Read path:  stored/wire form → inverse codec → caller data

pub mod codec;
pub mod engine;
pub mod error;

pub use engine::{
    apply, apply_into, Applied, Caller, Transformation, TransformationMode, TransformationType,
    TransformedBuf,
};
pub use error::TransformError;
