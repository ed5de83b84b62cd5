//! Chunked transformation objects.
//!
//! A logical object identified by (namespace, name), physically realized as
//! one or more transformation-aware chunk objects named `"{name}_{id}"` plus
//! a persisted metadata record. All five operations are deferred: queuing
//! performs no I/O, effects happen during batch execution. Result slots are
//! zeroed at queue time and only hold real values once the batch has
//! executed.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use morphstore_transform::{TransformationMode, TransformationType};

use crate::batch::{Batch, Operation, Semantics};
use crate::context::StoreContext;
use crate::error::ObjectError;
use crate::kv::KvStore;
use crate::metadata::ChunkedMetadata;
use crate::object::TransformObject;
use crate::routing::route_index;

/// Deferred result slot: holds the zero sentinel from queue time until batch
/// execution fills it.
#[derive(Debug, Default)]
pub struct OutCell<T>(Arc<Mutex<T>>);

impl<T> Clone for OutCell<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> OutCell<T> {
    /// Creates a slot holding the zero sentinel.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(T::default())))
    }
}

impl<T: Clone> OutCell<T> {
    /// Current value; only meaningful after the batch executed successfully.
    pub fn get(&self) -> T {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> OutCell<T> {
    pub(crate) fn set(&self, value: T) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// Caller-owned read destination shared with the deferred operation.
#[derive(Debug, Clone)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    /// A zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self(Arc::new(Mutex::new(vec![0u8; len])))
    }

    /// Wraps an existing buffer.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self(Arc::new(Mutex::new(data)))
    }

    /// Buffer length in bytes.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the buffer contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Aggregated status of a chunked object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectStatus {
    /// Latest chunk modification, microseconds since the Unix epoch
    pub modification_time: i64,
    /// Total size in the untransformed state
    pub original_size: u64,
    /// Total size as stored
    pub transformed_size: u64,
    /// Codec applied to every chunk
    pub transformation_type: TransformationType,
    /// Number of chunk objects; 0 until the chunk status pass succeeds
    pub chunk_count: u64,
    /// Maximum original bytes per chunk; 0 until the chunk status pass succeeds
    pub chunk_size: u64,
}

/// A chunked logical object's bookkeeping.
///
/// `index` is fixed at construction; the size/chunk fields are refreshed from
/// persisted metadata before each access and rewritten after mutation, only
/// ever during the handle's own batch execution.
pub struct ChunkedObject {
    ctx: StoreContext,
    index: u32,
    namespace: String,
    name: String,
    transformation_type: TransformationType,
    transformation_mode: TransformationMode,
    chunk_count: u64,
    chunk_size: u64,
}

/// Shared, reference-counted handle to a [`ChunkedObject`]. Multiple queued
/// operations may reference the same handle.
#[derive(Clone)]
pub struct ChunkedObjectHandle(Arc<Mutex<ChunkedObject>>);

impl ChunkedObject {
    /// Creates a handle; the server index is `hash(name) % server_count`,
    /// fixed for the object's lifetime.
    pub fn new(
        ctx: StoreContext,
        namespace: &str,
        name: &str,
    ) -> Result<ChunkedObjectHandle, ObjectError> {
        if ctx.config.object_server_count == 0 {
            return Err(ObjectError::InvalidArgument("object_server_count is zero"));
        }
        let index = route_index(name, ctx.config.object_server_count);
        Ok(Self::build(ctx, index, namespace, name))
    }

    /// Creates a handle routed to an explicit server index.
    pub fn new_for_index(
        ctx: StoreContext,
        index: u32,
        namespace: &str,
        name: &str,
    ) -> Result<ChunkedObjectHandle, ObjectError> {
        if index >= ctx.config.object_server_count {
            return Err(ObjectError::InvalidArgument(
                "index exceeds object_server_count",
            ));
        }
        Ok(Self::build(ctx, index, namespace, name))
    }

    fn build(ctx: StoreContext, index: u32, namespace: &str, name: &str) -> ChunkedObjectHandle {
        ChunkedObjectHandle(Arc::new(Mutex::new(Self {
            ctx,
            index,
            namespace: namespace.to_string(),
            name: name.to_string(),
            transformation_type: TransformationType::None,
            transformation_mode: TransformationMode::Client,
            chunk_count: 0,
            chunk_size: 0,
        })))
    }

    fn chunk_name(&self, id: u64) -> String {
        format!("{}_{}", self.name, id)
    }

    fn chunk(&self, id: u64) -> Result<TransformObject, ObjectError> {
        TransformObject::new(self.ctx.clone(), &self.namespace, &self.chunk_name(id))
    }

    fn load_metadata(&mut self) -> Result<(), ObjectError> {
        let bytes = self
            .ctx
            .kv
            .get(&self.namespace, &self.name)?
            .ok_or_else(|| ObjectError::MetadataMissing {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
            })?;
        let record = ChunkedMetadata::decode(&bytes)?;
        self.transformation_type = record.transformation_type;
        self.transformation_mode = record.transformation_mode;
        self.chunk_count = record.chunk_count;
        self.chunk_size = record.chunk_size;
        Ok(())
    }

    fn store_metadata(&self) -> Result<(), ObjectError> {
        let record = ChunkedMetadata {
            transformation_type: self.transformation_type,
            transformation_mode: self.transformation_mode,
            chunk_count: self.chunk_count,
            chunk_size: self.chunk_size,
        };
        self.ctx
            .kv
            .put(&self.namespace, &self.name, record.encode()?)
    }
}

impl ChunkedObjectHandle {
    fn lock(&self) -> std::sync::MutexGuard<'_, ChunkedObject> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The fixed routing index.
    pub fn server_index(&self) -> u32 {
        self.lock().index
    }

    /// The object's namespace.
    pub fn namespace(&self) -> String {
        self.lock().namespace.clone()
    }

    /// The object's name.
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    /// Queues a Create operation: the first chunk object is allocated and the
    /// metadata record persisted when the batch executes.
    pub fn create(
        &self,
        kind: TransformationType,
        mode: TransformationMode,
        chunk_size: u64,
        batch: &mut Batch,
    ) -> Result<(), ObjectError> {
        if chunk_size == 0 {
            return Err(ObjectError::InvalidArgument("chunk_size is zero"));
        }
        {
            let mut object = self.lock();
            object.transformation_type = kind;
            object.transformation_mode = mode;
            object.chunk_size = chunk_size;
        }
        batch.add(Operation::Create(CreateOp {
            object: self.clone(),
        }));
        Ok(())
    }

    /// Queues a Delete operation: chunk objects and the metadata record are
    /// removed when the batch executes.
    pub fn delete(&self, batch: &mut Batch) {
        batch.add(Operation::Delete(DeleteOp {
            object: self.clone(),
        }));
    }

    /// Queues a Read of `length` bytes at `offset` into `data`.
    ///
    /// The returned slot reads 0 until the batch executes.
    pub fn read(
        &self,
        data: SharedBuf,
        length: u64,
        offset: u64,
        batch: &mut Batch,
    ) -> Result<OutCell<u64>, ObjectError> {
        if length == 0 {
            return Err(ObjectError::InvalidArgument("zero-length read"));
        }
        if (data.len() as u64) < length {
            return Err(ObjectError::InvalidArgument("read buffer shorter than length"));
        }
        let bytes_read = OutCell::new();
        batch.add(Operation::Read(ReadOp {
            object: self.clone(),
            data,
            length,
            offset,
            bytes_read: bytes_read.clone(),
        }));
        Ok(bytes_read)
    }

    /// Queues a Write of `data` at `offset`.
    ///
    /// The returned slot reads 0 until the batch executes.
    pub fn write(
        &self,
        data: &[u8],
        offset: u64,
        batch: &mut Batch,
    ) -> Result<OutCell<u64>, ObjectError> {
        if data.is_empty() {
            return Err(ObjectError::InvalidArgument("zero-length write"));
        }
        let bytes_written = OutCell::new();
        batch.add(Operation::Write(WriteOp {
            object: self.clone(),
            data: data.to_vec(),
            offset,
            bytes_written: bytes_written.clone(),
        }));
        Ok(bytes_written)
    }

    /// Queues a Status query. The returned slot holds zeroes until the batch
    /// executes.
    pub fn status(&self, batch: &mut Batch) -> OutCell<ObjectStatus> {
        let out = OutCell::new();
        batch.add(Operation::Status(StatusOp {
            object: self.clone(),
            out: out.clone(),
        }));
        out
    }
}

/// Queued Create operation.
pub struct CreateOp {
    object: ChunkedObjectHandle,
}

/// Queued Delete operation.
pub struct DeleteOp {
    object: ChunkedObjectHandle,
}

/// Queued Read operation.
pub struct ReadOp {
    object: ChunkedObjectHandle,
    data: SharedBuf,
    length: u64,
    offset: u64,
    bytes_read: OutCell<u64>,
}

/// Queued Write operation.
pub struct WriteOp {
    object: ChunkedObjectHandle,
    data: Vec<u8>,
    offset: u64,
    bytes_written: OutCell<u64>,
}

/// Queued Status operation.
pub struct StatusOp {
    object: ChunkedObjectHandle,
    out: OutCell<ObjectStatus>,
}

pub(crate) fn create_exec(ops: &[CreateOp], _semantics: &Semantics) -> bool {
    let mut ok = true;
    for op in ops {
        let mut object = op.object.lock();
        let created = object.chunk(0).and_then(|mut chunk| {
            chunk.create(object.transformation_type, object.transformation_mode)
        });
        match created {
            Ok(()) => {
                object.chunk_count = 1;
                if let Err(e) = object.store_metadata() {
                    warn!(namespace = %object.namespace, name = %object.name, error = %e, "create: metadata store failed");
                    ok = false;
                }
            }
            Err(e) => {
                // No metadata on failure: the logical object is not created.
                warn!(namespace = %object.namespace, name = %object.name, error = %e, "create: chunk creation failed");
                ok = false;
            }
        }
    }
    ok
}

pub(crate) fn delete_exec(ops: &[DeleteOp], _semantics: &Semantics) -> bool {
    let mut ok = true;
    for op in ops {
        let mut object = op.object.lock();
        // The object may never have been created; chunk_count stays 0 then.
        let _ = object.load_metadata();

        for id in 0..object.chunk_count {
            let deleted = object.chunk(id).and_then(|mut chunk| chunk.delete());
            if let Err(e) = deleted {
                warn!(namespace = %object.namespace, name = %object.name, chunk = id, error = %e, "delete: chunk removal failed");
                ok = false;
            }
        }

        // Metadata removal proceeds regardless of chunk failures: no orphaned
        // logical records, at the risk of orphaned chunk data.
        if let Err(e) = object.ctx.kv.delete(&object.namespace, &object.name) {
            warn!(namespace = %object.namespace, name = %object.name, error = %e, "delete: metadata removal failed");
            ok = false;
        }
    }
    ok
}

pub(crate) fn read_exec(ops: &[ReadOp], _semantics: &Semantics) -> bool {
    let mut ok = true;
    for op in ops {
        let mut object = op.object.lock();
        if let Err(e) = object.load_metadata() {
            warn!(namespace = %object.namespace, name = %object.name, error = %e, "read: metadata load failed");
            ok = false;
            continue;
        }
        if object.chunk_size == 0 {
            ok = false;
            continue;
        }

        let chunk_size = object.chunk_size;
        let mut remaining = op.length;
        let mut offset = op.offset;
        let mut pos = 0usize;
        let mut total = 0u64;

        while remaining > 0 {
            let chunk_id = offset / chunk_size;
            if chunk_id >= object.chunk_count {
                break;
            }
            let local_offset = offset % chunk_size;
            let local_length = (chunk_size - local_offset).min(remaining);

            let read = object.chunk(chunk_id).and_then(|mut chunk| {
                op.data.with_mut(|buf| {
                    chunk.read(&mut buf[pos..pos + local_length as usize], local_offset)
                })
            });
            match read {
                Ok(n) => total += n,
                Err(e) => {
                    warn!(namespace = %object.namespace, name = %object.name, chunk = chunk_id, error = %e, "read: chunk read failed");
                    ok = false;
                    break;
                }
            }

            pos += local_length as usize;
            remaining -= local_length;
            offset += local_length;
        }

        op.bytes_read.set(total);
    }
    ok
}

pub(crate) fn write_exec(ops: &[WriteOp], _semantics: &Semantics) -> bool {
    let mut ok = true;
    for op in ops {
        let mut object = op.object.lock();
        if let Err(e) = object.load_metadata() {
            warn!(namespace = %object.namespace, name = %object.name, error = %e, "write: metadata load failed");
            ok = false;
            continue;
        }
        if object.chunk_size == 0 {
            ok = false;
            continue;
        }

        let chunk_size = object.chunk_size;
        let mut remaining = op.data.len() as u64;
        let mut offset = op.offset;
        let mut pos = 0usize;
        let mut total = 0u64;
        let mut op_ok = true;

        while remaining > 0 {
            let chunk_id = offset / chunk_size;
            let local_offset = offset % chunk_size;
            let local_length = (chunk_size - local_offset).min(remaining);

            // Grow the chunk set when the write extends past the last chunk.
            while object.chunk_count <= chunk_id {
                let next = object.chunk_count;
                let created = object.chunk(next).and_then(|mut chunk| {
                    chunk.create(object.transformation_type, object.transformation_mode)
                });
                if let Err(e) = created {
                    warn!(namespace = %object.namespace, name = %object.name, chunk = next, error = %e, "write: chunk creation failed");
                    op_ok = false;
                    break;
                }
                object.chunk_count += 1;
            }
            if !op_ok {
                break;
            }

            let written = object.chunk(chunk_id).and_then(|mut chunk| {
                chunk.write(&op.data[pos..pos + local_length as usize], local_offset)
            });
            match written {
                Ok(n) => total += n,
                Err(e) => {
                    warn!(namespace = %object.namespace, name = %object.name, chunk = chunk_id, error = %e, "write: chunk write failed");
                    op_ok = false;
                    break;
                }
            }

            pos += local_length as usize;
            remaining -= local_length;
            offset += local_length;
        }

        op.bytes_written.set(total);

        // Size/chunk bookkeeping stays current even after partial failure.
        if let Err(e) = object.store_metadata() {
            warn!(namespace = %object.namespace, name = %object.name, error = %e, "write: metadata store failed");
            op_ok = false;
        }
        ok &= op_ok;
    }
    ok
}

pub(crate) fn status_exec(ops: &[StatusOp], _semantics: &Semantics) -> bool {
    let mut ok = true;
    for op in ops {
        let mut object = op.object.lock();
        if let Err(e) = object.load_metadata() {
            warn!(namespace = %object.namespace, name = %object.name, error = %e, "status: metadata load failed");
            ok = false;
            continue;
        }

        let mut status = ObjectStatus {
            transformation_type: object.transformation_type,
            ..ObjectStatus::default()
        };
        let mut chunks_ok = true;

        for id in 0..object.chunk_count {
            match object.chunk(id).and_then(|mut chunk| chunk.status()) {
                Ok(chunk_status) => {
                    status.original_size += chunk_status.original_size;
                    status.transformed_size += chunk_status.transformed_size;
                    status.modification_time =
                        status.modification_time.max(chunk_status.modification_time);
                }
                Err(e) => {
                    warn!(namespace = %object.namespace, name = %object.name, chunk = id, error = %e, "status: chunk status failed");
                    chunks_ok = false;
                }
            }
        }

        // chunk bookkeeping is only trustworthy when every chunk answered
        if chunks_ok {
            status.chunk_count = object.chunk_count;
            status.chunk_size = object.chunk_size;
        }
        op.out.set(status);
        ok &= chunks_ok;
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;

    fn ctx() -> StoreContext {
        StoreContext::in_memory(ClusterConfig {
            object_server_count: 4,
        })
    }

    #[test]
    fn test_queue_rejects_caller_bugs() {
        let object = ChunkedObject::new(ctx(), "t", "o").unwrap();
        let mut batch = Batch::new(Semantics::default());

        assert!(matches!(
            object.read(SharedBuf::zeroed(4), 0, 0, &mut batch),
            Err(ObjectError::InvalidArgument(_))
        ));
        assert!(matches!(
            object.read(SharedBuf::zeroed(2), 8, 0, &mut batch),
            Err(ObjectError::InvalidArgument(_))
        ));
        assert!(matches!(
            object.write(b"", 0, &mut batch),
            Err(ObjectError::InvalidArgument(_))
        ));
        assert!(matches!(
            object.create(
                TransformationType::Xor,
                TransformationMode::Client,
                0,
                &mut batch
            ),
            Err(ObjectError::InvalidArgument(_))
        ));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_outputs_stay_zero_until_execution() {
        let object = ChunkedObject::new(ctx(), "t", "o").unwrap();
        let mut batch = Batch::new(Semantics::default());
        object
            .create(
                TransformationType::Xor,
                TransformationMode::Client,
                4096,
                &mut batch,
            )
            .unwrap();
        let written = object.write(b"hello", 0, &mut batch).unwrap();
        let status = object.status(&mut batch);

        assert_eq!(written.get(), 0);
        assert_eq!(status.get(), ObjectStatus::default());

        assert!(batch.execute());
        assert_eq!(written.get(), 5);
        assert_eq!(status.get().original_size, 5);
    }

    #[test]
    fn test_queuing_alone_performs_no_io() {
        let context = ctx();
        let object = ChunkedObject::new(context.clone(), "t", "o").unwrap();
        let mut batch = Batch::new(Semantics::default());
        object
            .create(
                TransformationType::Xor,
                TransformationMode::Client,
                4096,
                &mut batch,
            )
            .unwrap();
        object.write(b"data", 0, &mut batch).unwrap();

        // Nothing persisted until execute.
        assert_eq!(context.kv.get("t", "o").unwrap(), None);
        assert!(batch.execute());
        assert!(context.kv.get("t", "o").unwrap().is_some());
    }

    #[test]
    fn test_index_is_stable_and_bounded() {
        let object = ChunkedObject::new(ctx(), "t", "o").unwrap();
        let index = object.server_index();
        assert!(index < 4);
        assert_eq!(object.server_index(), index);

        let pinned = ChunkedObject::new_for_index(ctx(), 2, "t", "o").unwrap();
        assert_eq!(pinned.server_index(), 2);
        assert!(ChunkedObject::new_for_index(ctx(), 9, "t", "o").is_err());
    }
}
