// ResourceArc wrappers for reader and writer sessions
//
// This allows session state to persist across NIF calls. Each session is
// owned by one Mutex; the BEAM may call in from any scheduler thread.

use crate::core::Dialect;
use crate::strategy::StreamingParser;
use crate::writer::Writer;
use rustler::{Error, NifResult, ResourceArc};
use std::sync::{Mutex, MutexGuard};

/// Push-driven reader session fed by the host
pub struct ReaderResource {
    pub inner: Mutex<StreamingParser>,
}

impl ReaderResource {
    pub fn new(dialect: Dialect) -> Self {
        ReaderResource {
            inner: Mutex::new(StreamingParser::new(dialect)),
        }
    }

    pub fn lock(&self) -> NifResult<MutexGuard<'_, StreamingParser>> {
        self.inner
            .lock()
            .map_err(|_| Error::RaiseAtom("session_poisoned"))
    }
}

/// Writer session staging output in memory until the host takes it
pub struct WriterResource {
    pub inner: Mutex<Writer<Vec<u8>>>,
}

impl WriterResource {
    pub fn new(dialect: Dialect) -> Self {
        WriterResource {
            inner: Mutex::new(Writer::open(Vec::new(), dialect)),
        }
    }

    pub fn lock(&self) -> NifResult<MutexGuard<'_, Writer<Vec<u8>>>> {
        self.inner
            .lock()
            .map_err(|_| Error::RaiseAtom("session_poisoned"))
    }
}

pub type ReaderRef = ResourceArc<ReaderResource>;
pub type WriterRef = ResourceArc<WriterResource>;
