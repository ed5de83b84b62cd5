//! Transformation descriptors and the participate/direction policy.
//!
//! A [`Transformation`] pairs a codec with a mode saying which pipeline
//! participant must apply it. Every read/write call site passes a [`Caller`]
//! tag; the policy table resolves that into "do nothing", "run the forward
//! codec" or "run the inverse codec".

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec;
use crate::error::TransformError;

/// Which codec a transformation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransformationType {
    /// No transformation (passthrough fast path)
    #[default]
    None,
    /// XOR every byte with 0xFF; self-inverse, supports partial access
    Xor,
    /// Run-length encoding; whole-object only
    Rle,
    /// LZ4 block compression; whole-object only
    Lz4,
}

impl TransformationType {
    /// Whether the codec can operate on a sub-range of an object.
    ///
    /// False for variable-length encodings, whose encoded offsets do not map
    /// linearly onto decoded offsets.
    pub fn partial_access(self) -> bool {
        match self {
            TransformationType::None | TransformationType::Xor => true,
            TransformationType::Rle | TransformationType::Lz4 => false,
        }
    }
}

/// Which participant(s) in the client/transport/server pipeline apply the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransformationMode {
    /// Only the client transforms; servers store the transformed form
    #[default]
    Client,
    /// Both ends transform; the wire carries the transformed form, servers
    /// store the original form
    Transport,
    /// Only the server transforms; the wire carries the original form
    Server,
}

/// The pipeline edge invoking the engine. Passed per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// Client-side read path
    ClientRead,
    /// Client-side write path
    ClientWrite,
    /// Server-side read path
    ServerRead,
    /// Server-side write path
    ServerWrite,
}

/// An immutable transformation descriptor, shared via [`Arc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    kind: TransformationType,
    mode: TransformationMode,
    partial_access: bool,
}

impl Transformation {
    /// Creates a descriptor; `partial_access` is derived from the type.
    pub fn new(kind: TransformationType, mode: TransformationMode) -> Self {
        Self {
            kind,
            mode,
            partial_access: kind.partial_access(),
        }
    }

    /// Creates a descriptor for shared, reference-counted ownership.
    pub fn shared(kind: TransformationType, mode: TransformationMode) -> Arc<Self> {
        Arc::new(Self::new(kind, mode))
    }

    /// The transformation type.
    pub fn kind(&self) -> TransformationType {
        self.kind
    }

    /// The transformation mode.
    pub fn mode(&self) -> TransformationMode {
        self.mode
    }

    /// Whether the codec supports sub-range access.
    pub fn partial_access(&self) -> bool {
        self.partial_access
    }

    /// Whether this participant must apply the transform at all.
    pub fn participates(&self, caller: Caller) -> bool {
        if self.kind == TransformationType::None {
            return false;
        }
        match self.mode {
            TransformationMode::Client => {
                matches!(caller, Caller::ClientRead | Caller::ClientWrite)
            }
            TransformationMode::Transport => true,
            TransformationMode::Server => {
                matches!(caller, Caller::ServerRead | Caller::ServerWrite)
            }
        }
    }

    /// Whether the inverse codec runs at this edge. Meaningful only when
    /// [`participates`](Self::participates) is true.
    pub fn is_inverse(&self, caller: Caller) -> bool {
        match self.mode {
            TransformationMode::Client => caller == Caller::ClientRead,
            TransformationMode::Transport => {
                matches!(caller, Caller::ClientRead | Caller::ServerWrite)
            }
            TransformationMode::Server => caller == Caller::ServerRead,
        }
    }

    /// Whether this edge must supply and receive the entire object.
    pub fn needs_whole_object(&self, caller: Caller) -> bool {
        self.participates(caller) && !self.partial_access
    }
}

/// A transformed buffer. Ownership is structural: passthrough borrows the
/// input, a codec run owns its output. Nothing to clean up either way.
#[derive(Debug)]
pub enum TransformedBuf<'a> {
    /// Zero-copy passthrough of the input
    Borrowed(&'a [u8]),
    /// Codec output owned by the holder
    Owned(Vec<u8>),
}

impl TransformedBuf<'_> {
    /// View the transformed bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            TransformedBuf::Borrowed(s) => s,
            TransformedBuf::Owned(v) => v,
        }
    }

    /// Length of the transformed bytes.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True when no bytes are present.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Take the bytes, copying only in the passthrough case.
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            TransformedBuf::Borrowed(s) => s.to_vec(),
            TransformedBuf::Owned(v) => v,
        }
    }
}

/// Result of [`apply`]: the transformed bytes plus the logical offset they
/// start at.
#[derive(Debug)]
pub struct Applied<'a> {
    /// The transformed (or passed-through) bytes
    pub data: TransformedBuf<'a>,
    /// Logical offset of `data`; forced to 0 for whole-object codecs
    pub offset: u64,
}

/// Run the transformation for one pipeline edge over the full input buffer.
///
/// Absent descriptors and non-participating edges pass the input through
/// unchanged, offset included. Otherwise the forward or inverse codec runs per
/// the policy table, and the returned offset is forced to 0 when the codec
/// requires whole-object access.
pub fn apply<'a>(
    trafo: Option<&Transformation>,
    input: &'a [u8],
    offset: u64,
    caller: Caller,
) -> Applied<'a> {
    let trafo = match trafo {
        Some(t) if t.participates(caller) => t,
        _ => {
            return Applied {
                data: TransformedBuf::Borrowed(input),
                offset,
            }
        }
    };

    let inverse = trafo.is_inverse(caller);
    trace!(
        kind = ?trafo.kind(),
        mode = ?trafo.mode(),
        ?caller,
        inverse,
        len = input.len(),
        "applying transformation"
    );

    let out = match (trafo.kind(), inverse) {
        (TransformationType::None, _) => {
            return Applied {
                data: TransformedBuf::Borrowed(input),
                offset,
            }
        }
        (TransformationType::Xor, _) => codec::xor_bytes(input),
        (TransformationType::Rle, false) => codec::rle_encode(input),
        (TransformationType::Rle, true) => codec::rle_decode(input),
        (TransformationType::Lz4, false) => codec::lz4_compress(input),
        (TransformationType::Lz4, true) => codec::lz4_decompress(input),
    };

    // Whole-object codecs anchor their output at the object start; the caller
    // supplied the complete object.
    let offset = if trafo.partial_access() { offset } else { 0 };

    Applied {
        data: TransformedBuf::Owned(out),
        offset,
    }
}

/// Client-read variant of [`apply`] for a pre-supplied caller buffer.
///
/// Runs the transformation, then copies only the `dst_offset..dst_offset +
/// dst.len()` slice of the result into `dst`. The intermediate buffer is
/// dropped here; the caller never owns it.
pub fn apply_into(
    trafo: Option<&Transformation>,
    input: &[u8],
    offset: u64,
    dst: &mut [u8],
    dst_offset: u64,
) -> Result<(), TransformError> {
    let applied = apply(trafo, input, offset, Caller::ClientRead);
    let data = applied.data.as_slice();

    let out_of_bounds = TransformError::RangeOutOfBounds {
        offset: dst_offset,
        length: dst.len() as u64,
        available: data.len() as u64,
    };

    let start = dst_offset
        .checked_sub(applied.offset)
        .ok_or(out_of_bounds)? as usize;
    let end = start + dst.len();
    if end > data.len() {
        return Err(TransformError::RangeOutOfBounds {
            offset: dst_offset,
            length: dst.len() as u64,
            available: data.len() as u64,
        });
    }

    dst.copy_from_slice(&data[start..end]);
    Ok(())
}
