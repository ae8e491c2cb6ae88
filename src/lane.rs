//! Lane handles and lane descriptors.
//!
//! A [`LaneHandle`] owns one unit of a stream lane's peer count: cloning a
//! handle increments the count, dropping one decrements it, and the last
//! drop breaks the lane and drains everything parked on the stream. A
//! [`LaneDescriptor`] wraps a handle so a lane can itself be transferred
//! across another stream.

use alloc::sync::Arc;

use crate::item::Item;
use crate::stream::Stream;

/// Owned endpoint of a stream.
pub struct LaneHandle {
    stream: Arc<Stream>,
    lane: usize,
}

impl LaneHandle {
    /// Take ownership of one pre-counted peer unit on `lane`.
    pub(crate) fn adopt(stream: Arc<Stream>, lane: usize) -> LaneHandle {
        LaneHandle { stream, lane }
    }

    /// Get the lane index (0 or 1).
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Get the underlying stream.
    pub fn stream(&self) -> &Arc<Stream> {
        &self.stream
    }

    /// Submit an item on this lane.
    ///
    /// # Returns
    ///
    /// A descriptor for the submitter's side of a conversation when the item
    /// is an offer or accept; `None` otherwise.
    pub fn submit(&self, item: Item) -> Option<LaneDescriptor> {
        self.stream.submit(self.lane, item)
    }
}

impl Clone for LaneHandle {
    fn clone(&self) -> LaneHandle {
        self.stream.increment_peers(self.lane);
        LaneHandle {
            stream: self.stream.clone(),
            lane: self.lane,
        }
    }
}

impl Drop for LaneHandle {
    fn drop(&mut self) {
        self.stream.decrement_peers(self.lane);
    }
}

/// A lane usable as a transferable descriptor.
#[derive(Clone)]
pub struct LaneDescriptor(LaneHandle);

impl LaneDescriptor {
    /// Wrap a handle.
    pub fn new(handle: LaneHandle) -> LaneDescriptor {
        LaneDescriptor(handle)
    }

    /// Get the wrapped handle.
    pub fn handle(&self) -> &LaneHandle {
        &self.0
    }

    /// Unwrap into the handle.
    pub fn into_handle(self) -> LaneHandle {
        self.0
    }

    /// Submit an item on the wrapped lane.
    pub fn submit(&self, item: Item) -> Option<LaneDescriptor> {
        self.0.submit(item)
    }
}

impl core::fmt::Debug for LaneDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LaneDescriptor")
            .field("lane", &self.0.lane)
            .finish()
    }
}

impl PartialEq for LaneDescriptor {
    fn eq(&self, other: &LaneDescriptor) -> bool {
        Arc::ptr_eq(&self.0.stream, &other.0.stream) && self.0.lane == other.0.lane
    }
}

/// Construct a top-level stream, returning handles for lanes 0 and 1.
pub fn stream_pair() -> (LaneHandle, LaneHandle) {
    let stream = Stream::top_level();
    (
        LaneHandle::adopt(stream.clone(), 0),
        LaneHandle::adopt(stream, 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_lanes_are_numbered() {
        let (lane0, lane1) = stream_pair();
        assert_eq!(lane0.lane(), 0);
        assert_eq!(lane1.lane(), 1);
        assert!(Arc::ptr_eq(lane0.stream(), lane1.stream()));
    }

    #[test]
    fn test_clone_and_drop_track_peers() {
        let (lane0, _lane1) = stream_pair();
        assert_eq!(lane0.stream().peer_count(0), 1);

        let extra = lane0.clone();
        assert_eq!(lane0.stream().peer_count(0), 2);

        drop(extra);
        assert_eq!(lane0.stream().peer_count(0), 1);
    }

    #[test]
    fn test_descriptor_equality_is_by_endpoint() {
        let (lane0, lane1) = stream_pair();
        let d0 = LaneDescriptor::new(lane0.clone());
        let d0b = LaneDescriptor::new(lane0);
        let d1 = LaneDescriptor::new(lane1);

        assert_eq!(d0, d0b);
        assert_ne!(d0, d1);
    }
}
