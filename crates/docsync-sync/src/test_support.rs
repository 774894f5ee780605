//! In-memory remote used by the sync tests

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docsync_core::domain::newtypes::{Checksum, RemoteId};
use docsync_core::ports::remote_sync::{
    DuplicateCheck, IRemoteSyncClient, UploadRequest, UploadResult,
};

use crate::checksum::ChecksumCache;
use crate::state::SyncStateStore;
use crate::task::{RetryPolicy, UploadTask};

/// Scriptable remote that records every call
#[derive(Default)]
pub(crate) struct MockRemote {
    known: Mutex<HashMap<Checksum, Option<String>>>,
    check_error: Mutex<Option<String>>,
    scripted_uploads: Mutex<VecDeque<UploadResult>>,
    rejected_files: Mutex<HashMap<String, String>>,
    upload_delay: Mutex<Option<Duration>>,
    panic_on_upload: AtomicBool,
    uploaded: Mutex<Vec<String>>,
    check_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_duplicate(self, checksum: Checksum, label: Option<&str>) -> Self {
        self.known
            .lock()
            .unwrap()
            .insert(checksum, label.map(str::to_string));
        self
    }

    pub fn with_check_error(self, message: &str) -> Self {
        *self.check_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Results returned by the next uploads, in order; afterwards uploads succeed
    pub fn with_upload_results(self, results: Vec<UploadResult>) -> Self {
        self.scripted_uploads.lock().unwrap().extend(results);
        self
    }

    pub fn with_rejected_file(self, file_name: &str, message: &str) -> Self {
        self.rejected_files
            .lock()
            .unwrap()
            .insert(file_name.to_string(), message.to_string());
        self
    }

    pub fn with_upload_delay(self, delay: Duration) -> Self {
        *self.upload_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_panicking_upload(self) -> Self {
        self.panic_on_upload.store(true, Ordering::SeqCst);
        self
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_uploads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl IRemoteSyncClient for MockRemote {
    async fn check_duplicate(&self, checksum: &Checksum) -> DuplicateCheck {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.check_error.lock().unwrap().clone() {
            return DuplicateCheck::TransientError(message);
        }
        match self.known.lock().unwrap().get(checksum) {
            Some(label) => DuplicateCheck::Exists {
                label: label.clone(),
            },
            None => DuplicateCheck::NotFound,
        }
    }

    async fn upload(&self, request: &UploadRequest) -> UploadResult {
        let call = self.upload_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.panic_on_upload.load(Ordering::SeqCst) {
            panic!("mock remote panicked on upload of {}", request.file_name);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.upload_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.uploaded.lock().unwrap().push(request.file_name.clone());

        if let Some(message) = self.rejected_files.lock().unwrap().get(&request.file_name) {
            return UploadResult::PermanentError(message.clone());
        }
        if let Some(result) = self.scripted_uploads.lock().unwrap().pop_front() {
            return result;
        }
        UploadResult::Success(RemoteId::new(format!("remote-{call}")).unwrap())
    }
}

/// Shared wiring for task and coordinator tests
pub(crate) struct Harness {
    pub cache: Arc<ChecksumCache>,
    pub state: Arc<SyncStateStore>,
    pub remote: Arc<MockRemote>,
}

impl Harness {
    pub fn new(state_path: &Path, remote: MockRemote) -> Self {
        Self {
            cache: Arc::new(ChecksumCache::new()),
            state: Arc::new(SyncStateStore::new(state_path.to_path_buf(), 10)),
            remote: Arc::new(remote),
        }
    }

    pub fn task(&self, retry: RetryPolicy) -> UploadTask {
        UploadTask::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.state),
            self.remote.clone(),
            retry,
        )
    }
}

/// Writes `content` to `dir/name`, creating parent folders
pub(crate) fn write_file(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
