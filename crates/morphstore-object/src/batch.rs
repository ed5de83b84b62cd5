//! Deferred operation batches.
//!
//! Operations queue without performing I/O; `execute` runs them and blocks
//! until everything queued has completed. Consecutive runs of same-kind
//! operations execute as one pass, in queue order. A single operation's
//! failure does not stop its siblings; the batch reports one coarse success
//! flag.

use std::mem::discriminant;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::chunked::{self, CreateOp, DeleteOp, ReadOp, StatusOp, WriteOp};

/// How strongly operations in a batch are isolated from concurrent access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Atomicity {
    /// No isolation; callers serialize conflicting access themselves
    #[default]
    None,
    /// Individual operations are isolated
    Operation,
    /// The whole batch is isolated
    Batch,
}

/// Consistency semantics a batch executes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Semantics {
    /// Isolation level for the batch's operations
    pub atomicity: Atomicity,
}

/// A queued, deferred unit of work.
pub enum Operation {
    /// Create a chunked object
    Create(CreateOp),
    /// Delete a chunked object
    Delete(DeleteOp),
    /// Read from a chunked object
    Read(ReadOp),
    /// Write to a chunked object
    Write(WriteOp),
    /// Query a chunked object's status
    Status(StatusOp),
}

/// A collection of queued operations executed together.
pub struct Batch {
    semantics: Semantics,
    ops: Vec<Operation>,
}

impl Batch {
    /// Creates an empty batch with the given semantics.
    pub fn new(semantics: Semantics) -> Self {
        Self {
            semantics,
            ops: Vec::new(),
        }
    }

    /// The batch's consistency semantics.
    pub fn semantics(&self) -> Semantics {
        self.semantics
    }

    /// Queues an operation. No I/O happens here.
    pub fn add(&mut self, operation: Operation) {
        self.ops.push(operation);
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Executes everything queued, blocking until done. Drains the batch.
    ///
    /// Returns false when any operation's execution pass reported failure;
    /// which one failed is not distinguished.
    #[instrument(skip(self), fields(ops = self.ops.len()))]
    pub fn execute(&mut self) -> bool {
        let ops = std::mem::take(&mut self.ops);
        let mut ok = true;

        let mut run: Vec<Operation> = Vec::new();
        for op in ops {
            if let Some(first) = run.first() {
                if discriminant(first) != discriminant(&op) {
                    ok &= dispatch(std::mem::take(&mut run), &self.semantics);
                }
            }
            run.push(op);
        }
        if !run.is_empty() {
            ok &= dispatch(run, &self.semantics);
        }
        ok
    }
}

/// Executes one same-kind run of operations.
fn dispatch(run: Vec<Operation>, semantics: &Semantics) -> bool {
    let mut creates = Vec::new();
    let mut deletes = Vec::new();
    let mut reads = Vec::new();
    let mut writes = Vec::new();
    let mut statuses = Vec::new();

    for op in run {
        match op {
            Operation::Create(op) => creates.push(op),
            Operation::Delete(op) => deletes.push(op),
            Operation::Read(op) => reads.push(op),
            Operation::Write(op) => writes.push(op),
            Operation::Status(op) => statuses.push(op),
        }
    }

    let mut ok = true;
    if !creates.is_empty() {
        ok &= chunked::create_exec(&creates, semantics);
    }
    if !deletes.is_empty() {
        ok &= chunked::delete_exec(&deletes, semantics);
    }
    if !reads.is_empty() {
        ok &= chunked::read_exec(&reads, semantics);
    }
    if !writes.is_empty() {
        ok &= chunked::write_exec(&writes, semantics);
    }
    if !statuses.is_empty() {
        ok &= chunked::status_exec(&statuses, semantics);
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked::{ChunkedObject, SharedBuf};
    use crate::config::ClusterConfig;
    use crate::context::StoreContext;
    use morphstore_transform::{TransformationMode, TransformationType};

    fn ctx() -> StoreContext {
        StoreContext::in_memory(ClusterConfig::default())
    }

    #[test]
    fn test_empty_batch_succeeds() {
        let mut batch = Batch::new(Semantics::default());
        assert!(batch.is_empty());
        assert!(batch.execute());
    }

    #[test]
    fn test_execute_drains_the_batch() {
        let object = ChunkedObject::new(ctx(), "t", "o").unwrap();
        let mut batch = Batch::new(Semantics::default());
        object
            .create(
                TransformationType::None,
                TransformationMode::Client,
                1024,
                &mut batch,
            )
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.execute());
        assert!(batch.is_empty());
    }

    #[test]
    fn test_mixed_kinds_execute_in_queue_order() {
        let object = ChunkedObject::new(ctx(), "t", "o").unwrap();
        let mut batch = Batch::new(Semantics::default());
        object
            .create(
                TransformationType::Xor,
                TransformationMode::Client,
                1024,
                &mut batch,
            )
            .unwrap();
        let written = object.write(b"abc", 0, &mut batch).unwrap();
        let buf = SharedBuf::zeroed(3);
        let read = object.read(buf.clone(), 3, 0, &mut batch).unwrap();

        assert!(batch.execute());
        assert_eq!(written.get(), 3);
        assert_eq!(read.get(), 3);
        assert_eq!(buf.to_vec(), b"abc");
    }

    #[test]
    fn test_failed_operation_flags_batch_but_runs_siblings() {
        let created = ChunkedObject::new(ctx(), "t", "good").unwrap();
        let mut batch = Batch::new(Semantics::default());
        created
            .create(
                TransformationType::Xor,
                TransformationMode::Client,
                1024,
                &mut batch,
            )
            .unwrap();
        assert!(batch.execute());

        // A read of a never-created object fails its pass; the sibling write
        // to the created object still runs.
        let missing = ChunkedObject::new(ctx(), "t", "missing").unwrap();
        let mut batch = Batch::new(Semantics::default());
        let read = missing
            .read(SharedBuf::zeroed(4), 4, 0, &mut batch)
            .unwrap();
        let written = created.write(b"data", 0, &mut batch).unwrap();

        assert!(!batch.execute());
        assert_eq!(read.get(), 0);
        assert_eq!(written.get(), 4);
    }
}
