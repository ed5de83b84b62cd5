//! Per-chunk transformation-aware object.
//!
//! A [`TransformObject`] stores one physically-backed object whose bytes may
//! be transformed on their way to and from the backend. Both client and
//! server pipeline legs run here at the appropriate call sites; whether a leg
//! actually transforms is decided by the descriptor's policy table.
//!
//! Codecs without partial access force whole-object semantics: reads fetch
//! the entire stored object and decode it before slicing, writes
//! read-modify-write the full object and re-encode it.

use std::sync::Arc;

use tracing::debug;

use morphstore_transform::{
    apply, apply_into, Caller, Transformation, TransformationMode, TransformationType,
    TransformedBuf,
};

use crate::backend::ObjectBackend;
use crate::context::StoreContext;
use crate::error::ObjectError;
use crate::kv::KvStore;
use crate::metadata::ObjectMetadata;
use crate::routing::route_index;

/// Status of a per-chunk object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformObjectStatus {
    /// Last modification, microseconds since the Unix epoch
    pub modification_time: i64,
    /// Size in the untransformed state
    pub original_size: u64,
    /// Size as stored
    pub transformed_size: u64,
    /// Codec applied to the object
    pub transformation_type: TransformationType,
}

/// One transformation-aware backend object.
///
/// Mutable size bookkeeping is refreshed from persisted metadata before each
/// access and rewritten after each mutation.
pub struct TransformObject {
    ctx: StoreContext,
    index: u32,
    namespace: String,
    name: String,
    transformation: Option<Arc<Transformation>>,
    original_size: u64,
    transformed_size: u64,
}

impl TransformObject {
    /// Creates a handle; the server index is derived from the name and fixed
    /// for the handle's lifetime.
    pub fn new(ctx: StoreContext, namespace: &str, name: &str) -> Result<Self, ObjectError> {
        if ctx.config.object_server_count == 0 {
            return Err(ObjectError::InvalidArgument("object_server_count is zero"));
        }
        let index = route_index(name, ctx.config.object_server_count);
        Ok(Self {
            ctx,
            index,
            namespace: namespace.to_string(),
            name: name.to_string(),
            transformation: None,
            original_size: 0,
            transformed_size: 0,
        })
    }

    /// Creates a handle routed to an explicit server index.
    pub fn new_for_index(
        ctx: StoreContext,
        index: u32,
        namespace: &str,
        name: &str,
    ) -> Result<Self, ObjectError> {
        if index >= ctx.config.object_server_count {
            return Err(ObjectError::InvalidArgument(
                "index exceeds object_server_count",
            ));
        }
        Ok(Self {
            ctx,
            index,
            namespace: namespace.to_string(),
            name: name.to_string(),
            transformation: None,
            original_size: 0,
            transformed_size: 0,
        })
    }

    /// The fixed routing index.
    pub fn server_index(&self) -> u32 {
        self.index
    }

    /// The object's namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The object's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Codec type, `None` until created or loaded.
    pub fn transformation_type(&self) -> TransformationType {
        self.transformation
            .as_deref()
            .map_or(TransformationType::None, Transformation::kind)
    }

    /// Transformation mode, `Client` until created or loaded.
    pub fn transformation_mode(&self) -> TransformationMode {
        self.transformation
            .as_deref()
            .map_or(TransformationMode::Client, Transformation::mode)
    }

    /// Creates the backend object and persists its metadata record.
    pub fn create(
        &mut self,
        kind: TransformationType,
        mode: TransformationMode,
    ) -> Result<(), ObjectError> {
        debug!(namespace = %self.namespace, name = %self.name, ?kind, ?mode, "create object");
        self.ctx.backend.create(&self.namespace, &self.name)?;
        self.transformation = Some(Arc::new(Transformation::new(kind, mode)));
        self.original_size = 0;
        self.transformed_size = 0;
        self.store_metadata()
    }

    /// Deletes the backend object and its metadata record.
    ///
    /// Metadata deletion proceeds even when the backend delete fails; the
    /// first error is reported.
    pub fn delete(&mut self) -> Result<(), ObjectError> {
        debug!(namespace = %self.namespace, name = %self.name, "delete object");
        let backend_result = self.ctx.backend.delete(&self.namespace, &self.name);
        self.ctx.kv.delete(&self.namespace, &self.name)?;
        backend_result
    }

    /// Reloads transformation parameters and size bookkeeping from the
    /// persisted record.
    pub fn load_metadata(&mut self) -> Result<(), ObjectError> {
        let bytes = self
            .ctx
            .kv
            .get(&self.namespace, &self.name)?
            .ok_or_else(|| ObjectError::MetadataMissing {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
            })?;
        let record = ObjectMetadata::decode(&bytes)?;
        self.transformation = Some(Arc::new(Transformation::new(
            record.transformation_type,
            record.transformation_mode,
        )));
        self.original_size = record.original_size;
        self.transformed_size = record.transformed_size;
        Ok(())
    }

    fn store_metadata(&self) -> Result<(), ObjectError> {
        let record = ObjectMetadata {
            transformation_type: self.transformation_type(),
            transformation_mode: self.transformation_mode(),
            original_size: self.original_size,
            transformed_size: self.transformed_size,
        };
        self.ctx
            .kv
            .put(&self.namespace, &self.name, record.encode()?)
    }

    fn needs_whole_object(&self) -> bool {
        self.transformation
            .as_deref()
            .map_or(false, |t| !t.partial_access())
    }

    /// Reads into `buf` starting at the logical offset, running the inverse
    /// pipeline legs. Returns the number of bytes read.
    pub fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<u64, ObjectError> {
        self.load_metadata()?;
        let trafo = self.transformation.clone();

        if self.needs_whole_object() {
            // The encoded form has no per-range meaning; fetch everything,
            // decode, then slice.
            if offset >= self.original_size {
                return Ok(0);
            }
            let n = (buf.len() as u64).min(self.original_size - offset) as usize;

            let mut stored = vec![0u8; self.transformed_size as usize];
            let got = self
                .ctx
                .backend
                .read(&self.namespace, &self.name, &mut stored, 0)?;
            stored.truncate(got as usize);

            let served = apply(trafo.as_deref(), &stored, 0, Caller::ServerRead);
            apply_into(
                trafo.as_deref(),
                served.data.as_slice(),
                served.offset,
                &mut buf[..n],
                offset,
            )?;
            debug!(namespace = %self.namespace, name = %self.name, offset, n, "whole-object read");
            return Ok(n as u64);
        }

        let n = self
            .ctx
            .backend
            .read(&self.namespace, &self.name, buf, offset)? as usize;
        transform_in_place(trafo.as_deref(), &mut buf[..n], offset, Caller::ServerRead);
        transform_in_place(trafo.as_deref(), &mut buf[..n], offset, Caller::ClientRead);
        Ok(n as u64)
    }

    /// Writes `data` at the logical offset, running the forward pipeline
    /// legs, and re-persists size bookkeeping. Returns the number of logical
    /// bytes written.
    pub fn write(&mut self, data: &[u8], offset: u64) -> Result<u64, ObjectError> {
        self.load_metadata()?;
        let trafo = self.transformation.clone();

        if self.needs_whole_object() {
            // Read-modify-write: reconstruct the original, splice the write
            // in, re-encode the whole object.
            let new_size = self.original_size.max(offset + data.len() as u64);
            let mut whole = vec![0u8; new_size as usize];
            if self.original_size > 0 {
                let prefix = self.original_size as usize;
                self.read(&mut whole[..prefix], 0)?;
            }
            let start = offset as usize;
            whole[start..start + data.len()].copy_from_slice(data);

            let stored = {
                let client = apply(trafo.as_deref(), &whole, 0, Caller::ClientWrite);
                let server = apply(
                    trafo.as_deref(),
                    client.data.as_slice(),
                    client.offset,
                    Caller::ServerWrite,
                );
                server.data.into_vec()
            };

            self.original_size = new_size;
            self.transformed_size = stored.len() as u64;
            self.ctx
                .backend
                .write(&self.namespace, &self.name, &stored, 0)?;
            self.store_metadata()?;
            debug!(
                namespace = %self.namespace, name = %self.name, offset,
                original_size = self.original_size,
                transformed_size = self.transformed_size,
                "whole-object write"
            );
            return Ok(data.len() as u64);
        }

        // Partial-access codecs are size-preserving; the range writes through.
        let (stored, stored_offset) = {
            let client = apply(trafo.as_deref(), data, offset, Caller::ClientWrite);
            let server = apply(
                trafo.as_deref(),
                client.data.as_slice(),
                client.offset,
                Caller::ServerWrite,
            );
            (server.data.into_vec(), server.offset)
        };
        let nbytes = self
            .ctx
            .backend
            .write(&self.namespace, &self.name, &stored, stored_offset)?;

        self.original_size = self.original_size.max(offset + data.len() as u64);
        self.transformed_size = self.original_size;
        self.store_metadata()?;
        Ok(nbytes)
    }

    /// Reloads metadata and reports status.
    pub fn status(&mut self) -> Result<TransformObjectStatus, ObjectError> {
        self.load_metadata()?;
        let backend = self.ctx.backend.status(&self.namespace, &self.name)?;
        Ok(TransformObjectStatus {
            modification_time: backend.modification_time,
            original_size: self.original_size,
            transformed_size: self.transformed_size,
            transformation_type: self.transformation_type(),
        })
    }
}

/// Runs one pipeline leg over `buf` and writes the result back in place.
/// Passthrough legs leave the buffer untouched. Only valid for size-preserving
/// (partial-access) codecs.
fn transform_in_place(trafo: Option<&Transformation>, buf: &mut [u8], offset: u64, caller: Caller) {
    let transformed = match apply(trafo, buf, offset, caller).data {
        TransformedBuf::Owned(v) => Some(v),
        TransformedBuf::Borrowed(_) => None,
    };
    if let Some(v) = transformed {
        buf.copy_from_slice(&v);
    }
}
