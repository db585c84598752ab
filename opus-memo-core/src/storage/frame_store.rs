use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::codec::frame::CompressedFrame;

#[derive(Debug, Default)]
struct StoreInner {
    frames: Vec<CompressedFrame>,
    total_bytes: usize,
}

/// Ordered in-memory sequence of compressed frames for one recording cycle.
///
/// Append order is capture order, and readers only ever fetch by index, so
/// a playback run that overlaps a capture run sees a consistent prefix.
/// Appends hold the write lock for a single push.
///
/// Share as `Arc<FrameStore>`: the session controller owns it, the capture
/// pipeline appends, the playback pipeline reads.
#[derive(Debug, Default)]
pub struct FrameStore {
    inner: RwLock<StoreInner>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one frame; returns its index.
    pub fn append(&self, frame: CompressedFrame) -> usize {
        let mut inner = self.inner.write();
        inner.total_bytes += frame.len();
        inner.frames.push(frame);
        inner.frames.len() - 1
    }

    /// Frame at `index`, if present.
    pub fn get(&self, index: usize) -> Option<CompressedFrame> {
        self.inner.read().frames.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().frames.is_empty()
    }

    /// Total encoded bytes held, headers included.
    pub fn total_bytes(&self) -> usize {
        self.inner.read().total_bytes
    }

    /// Drop every frame.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.frames.clear();
        inner.total_bytes = 0;
    }

    /// Copy of the current frame list (frames themselves are shared).
    pub fn snapshot(&self) -> Vec<CompressedFrame> {
        self.inner.read().frames.clone()
    }

    /// Hex SHA-256 over every frame in order.
    pub fn checksum(&self) -> String {
        let inner = self.inner.read();
        let mut hasher = Sha256::new();
        for frame in &inner.frames {
            hasher.update(frame.as_bytes());
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn frame(tag: u8) -> CompressedFrame {
        CompressedFrame::from_packet(&[tag; 4]).unwrap()
    }

    #[test]
    fn append_preserves_order() {
        let store = FrameStore::new();
        for tag in 0..5 {
            assert_eq!(store.append(frame(tag)), tag as usize);
        }

        assert_eq!(store.len(), 5);
        assert_eq!(store.total_bytes(), 5 * 6);
        for tag in 0..5u8 {
            assert_eq!(store.get(tag as usize).unwrap(), frame(tag));
        }
        assert!(store.get(5).is_none());
    }

    #[test]
    fn clear_empties_store() {
        let store = FrameStore::new();
        store.append(frame(1));
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
        assert!(store.get(0).is_none());
    }

    #[test]
    fn checksum_tracks_content_and_order() {
        let a = FrameStore::new();
        a.append(frame(1));
        a.append(frame(2));

        let b = FrameStore::new();
        b.append(frame(2));
        b.append(frame(1));

        assert_eq!(a.checksum().len(), 64);
        assert_ne!(a.checksum(), b.checksum());
        assert_eq!(
            FrameStore::new().checksum(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn reader_sees_consistent_prefix_while_writer_appends() {
        let store = Arc::new(FrameStore::new());
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for tag in 0..200u8 {
                    store.append(frame(tag));
                }
            })
        };

        let mut seen = 0;
        while seen < 200 {
            if let Some(f) = store.get(seen) {
                assert_eq!(f, frame(seen as u8));
                seen += 1;
            } else {
                thread::yield_now();
            }
        }
        writer.join().unwrap();
        assert_eq!(store.len(), 200);
    }
}
