//! Handing captured images off the session's critical path
//!
//! The session pushes each payload onto a queue and moves on. A worker task
//! drains the queue and runs the [`Sink`] on the blocking pool, so decoding
//! and disk writes never delay the next reset or scan.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use image::ImageFormat;
use pbtscan_types::ImagePayload;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Errors raised while storing an image. Logged, never returned to the session.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Image decode failed ({source}); raw bytes kept at {}", .raw.display())]
    Decode {
        #[source]
        source: image::ImageError,
        raw: PathBuf,
    },

    #[error("Image encode failed: {0}")]
    Encode(image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Destination for captured images
#[cfg_attr(test, mockall::automock)]
pub trait Sink: Send + Sync + 'static {
    /// Store `payload` under a name derived from `label`, returning the path written
    fn save(&self, payload: ImagePayload, label: &str) -> Result<PathBuf, PersistenceError>;
}

/// Payload and barcode label travelling to the sink
#[derive(Debug)]
pub struct Capture {
    pub payload: ImagePayload,
    pub label: String,
}

/// Queue in front of a background [`Sink`]
pub struct Persistence {
    tx: Option<mpsc::UnboundedSender<Capture>>,
    worker: Option<JoinHandle<()>>,
}

impl Persistence {
    /// Start the worker task
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<S: Sink>(sink: S) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::new(sink), rx));

        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Queue a capture without waiting for it to be stored
    ///
    /// Returns false if the worker has already stopped.
    pub fn dispatch(&self, payload: ImagePayload, label: String) -> bool {
        match &self.tx {
            Some(tx) => tx.send(Capture { payload, label }).is_ok(),
            None => false,
        }
    }

    /// Stop accepting captures and wait for queued ones to be stored
    pub async fn finish(&mut self) {
        self.tx.take();

        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                warn!("Persistence worker aborted: {}", e);
            }
        }
    }
}

async fn run_worker<S: Sink>(sink: Arc<S>, mut rx: mpsc::UnboundedReceiver<Capture>) {
    while let Some(Capture { payload, label }) = rx.recv().await {
        let sink = Arc::clone(&sink);
        let name = label.clone();

        match tokio::task::spawn_blocking(move || sink.save(payload, &label)).await {
            Ok(Ok(path)) => info!("Image saved: {}", path.display()),
            Ok(Err(e)) => error!("Failed to save image for {:?}: {}", name, e),
            Err(e) => error!("Save task for {:?} failed: {}", name, e),
        }
    }

    debug!("Persistence worker stopped");
}

/// Writes images into a directory as `<barcode>_<timestamp>.jpeg`
#[derive(Debug, Clone)]
pub struct ImageFileSink {
    dir: PathBuf,
}

impl ImageFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_path(&self, stem: &str, ext: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{stem}.{ext}"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}-{n}.{ext}"));
            n += 1;
        }
        path
    }
}

impl Sink for ImageFileSink {
    fn save(&self, payload: ImagePayload, label: &str) -> Result<PathBuf, PersistenceError> {
        let stem = file_stem(label, Local::now());

        if payload.is_truncated() {
            warn!(
                "Saving truncated image for {:?} ({}/{} bytes)",
                label,
                payload.len(),
                payload.declared_len()
            );
        }

        match image::load_from_memory(payload.data()) {
            Ok(decoded) => {
                let path = self.unique_path(&stem, "jpeg");
                decoded
                    .into_rgb8()
                    .save_with_format(&path, ImageFormat::Jpeg)
                    .map_err(PersistenceError::Encode)?;
                Ok(path)
            }
            Err(source) => {
                let raw = self.unique_path(&stem, "raw");
                std::fs::write(&raw, payload.data())?;
                Err(PersistenceError::Decode { source, raw })
            }
        }
    }
}

/// File name stem: the barcode reduced to `[A-Za-z0-9_-]` plus a timestamp
fn file_stem(label: &str, now: DateTime<Local>) -> String {
    let mut name: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() {
        name.push_str("scan");
    }
    format!("{}_{}", name, now.format("%Y-%m-%d_%Hh%Mm%Ss"))
}
