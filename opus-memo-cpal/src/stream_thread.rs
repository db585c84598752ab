//! Dedicated thread owning one cpal stream.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream is built,
//! played and dropped on the same thread. The opener gets back whatever the
//! build step shares with the callbacks; dropping the `StreamThread` stops
//! the stream and joins the thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use opus_memo_core::AudioError;

use crate::error::CpalError;

const PARK_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct StreamThread {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StreamThread {
    /// Run `open` on a new thread and wait for it to report back.
    ///
    /// The stream stays alive until the returned `StreamThread` is dropped.
    pub(crate) fn spawn<T, F>(name: &str, open: F) -> Result<(Self, T), AudioError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<(cpal::Stream, T), CpalError> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<Result<T, CpalError>>(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let (stream, shared) = match open() {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        return;
                    }
                };
                if tx.send(Ok(shared)).is_err() {
                    return;
                }
                while !flag.load(Ordering::SeqCst) {
                    thread::park_timeout(PARK_INTERVAL);
                }
                drop(stream);
                log::debug!("Stream thread exiting");
            })
            .map_err(|e| AudioError::DeviceUnavailable(format!("failed to spawn stream thread: {}", e)))?;

        match rx.recv() {
            Ok(Ok(shared)) => Ok((
                Self {
                    shutdown,
                    handle: Some(handle),
                },
                shared,
            )),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e.into())
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::DeviceUnavailable("stream thread exited before opening".into()))
            }
        }
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}
