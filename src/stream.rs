//! Stream core: rendezvous matching across two lanes.
//!
//! A [`Stream`] exposes two symmetric lanes, numbered 0 and 1. An item
//! submitted on one lane either pairs immediately with the oldest compatible
//! item parked on the other lane, or parks until a partner arrives or the
//! other lane breaks. Offer/accept pairs additionally spawn a child stream
//! (a conversation) whose lane handles are handed to both sides.
//!
//! The per-stream mutex guards both queues, the conversation FIFO, and the
//! broken flags. It is held only to move items in and out; transfers and
//! completions always run after it is released, because a completion may
//! re-enter `submit` on this or another stream. The two peer counts live
//! outside the mutex as atomics.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{fence, AtomicUsize, Ordering};

use spin::Mutex;

use crate::descriptor::AnyDescriptor;
use crate::error::Error;
use crate::item::{
    AcceptItem, Item, OfferItem, PullDescriptorItem, PushDescriptorItem, RecvBufferItem,
    SendBufferItem,
};
use crate::lane::{LaneDescriptor, LaneHandle};
use crate::stream_log;

/// Number of lanes per stream.
pub const LANE_COUNT: usize = 2;

struct StreamInner {
    /// Parked items, one FIFO per lane.
    queues: [VecDeque<Item>; LANE_COUNT],

    /// Child streams awaiting pickup, one per parked offer/accept, in the
    /// same order as those items.
    conversations: VecDeque<Arc<Stream>>,

    /// Lanes whose peer count has dropped to zero.
    broken: [bool; LANE_COUNT],
}

/// A two-lane rendezvous stream.
pub struct Stream {
    inner: Mutex<StreamInner>,

    /// Outstanding handles per lane.
    peers: [AtomicUsize; LANE_COUNT],
}

/// What a submit decided under the stream mutex; carried out after the
/// mutex is released.
enum SubmitAction {
    /// Complete the submitted item with an error.
    Fail(Item, Error),
    /// The item was parked; for a handshake, the submitter's conversation
    /// descriptor.
    Parked(Option<LaneDescriptor>),
    /// Pair the submitted item with a popped partner.
    Transfer(Item, Item, Option<Arc<Stream>>),
}

impl Stream {
    fn with_peers(count: usize) -> Arc<Stream> {
        Arc::new(Stream {
            inner: Mutex::new(StreamInner {
                queues: [VecDeque::new(), VecDeque::new()],
                conversations: VecDeque::new(),
                broken: [false, false],
            }),
            peers: [AtomicUsize::new(count), AtomicUsize::new(count)],
        })
    }

    /// Create a top-level stream. One handle per lane is adopted by the
    /// caller (see [`stream_pair`](crate::lane::stream_pair)).
    pub(crate) fn top_level() -> Arc<Stream> {
        Stream::with_peers(1)
    }

    /// Create a conversation. Exactly two handles per lane will be adopted:
    /// one for the submitter on each side, one handed over by the matcher.
    fn conversation() -> Arc<Stream> {
        Stream::with_peers(2)
    }

    /// Number of outstanding handles on `lane`.
    pub fn peer_count(&self, lane: usize) -> usize {
        self.peers[lane].load(Ordering::Relaxed)
    }

    pub(crate) fn increment_peers(&self, lane: usize) {
        let count = self.peers[lane].fetch_add(1, Ordering::Relaxed);
        debug_assert!(count != 0, "cloned a handle to a broken lane");
    }

    pub(crate) fn decrement_peers(self: &Arc<Self>, lane: usize) {
        if self.peers[lane].fetch_sub(1, Ordering::Release) > 1 {
            return;
        }
        fence(Ordering::Acquire);
        self.close_lane(lane);
    }

    /// Submit `item` on lane `p`.
    ///
    /// # Returns
    ///
    /// A descriptor for the submitter's side of the conversation when `item`
    /// is an offer or accept; `None` otherwise.
    pub fn submit(self: &Arc<Self>, p: usize, item: Item) -> Option<LaneDescriptor> {
        assert!(p < LANE_COUNT, "lane index out of range");
        let q = 1 - p;

        // Items popped from the far queue whose consumer has gone away; they
        // are discarded without pairing, outside the lock.
        let mut abandoned: Vec<(Item, Option<Arc<Stream>>)> = Vec::new();
        let action;

        {
            let mut inner = self.inner.lock();
            if inner.broken[p] {
                debug_assert!(false, "submit on a locally closed lane");
                action = SubmitAction::Fail(item, Error::ClosedLocally);
            } else {
                let mut partner = None;
                while let Some(candidate) = inner.queues[q].pop_front() {
                    // A parked offer/accept owns the conversation created
                    // with it.
                    let conversation = if candidate.is_handshake() {
                        inner.conversations.pop_front()
                    } else {
                        None
                    };
                    if candidate.is_abandoned() {
                        abandoned.push((candidate, conversation));
                        continue;
                    }
                    partner = Some((candidate, conversation));
                    break;
                }

                action = match partner {
                    Some((v, conversation)) => SubmitAction::Transfer(item, v, conversation),
                    None if inner.broken[q] => SubmitAction::Fail(item, Error::ClosedRemotely),
                    None if item.is_handshake() => {
                        let conversation = Stream::conversation();
                        inner.conversations.push_back(conversation.clone());
                        inner.queues[p].push_back(item);
                        SubmitAction::Parked(Some(LaneDescriptor::new(LaneHandle::adopt(
                            conversation,
                            p,
                        ))))
                    }
                    None => {
                        inner.queues[p].push_back(item);
                        SubmitAction::Parked(None)
                    }
                };
            }
        }

        dispose_abandoned(abandoned, q);
        match action {
            SubmitAction::Fail(item, error) => {
                item.fail(error);
                None
            }
            SubmitAction::Parked(descriptor) => descriptor,
            SubmitAction::Transfer(u, v, conversation) => self.run_transfer(p, u, v, conversation),
        }
    }

    /// Pair `submitted` (on lane `p`) with `partner` (popped from lane `q`),
    /// strictly outside the stream mutex. Both items are fully detached from
    /// the stream by the time this runs.
    fn run_transfer(
        self: &Arc<Self>,
        p: usize,
        submitted: Item,
        partner: Item,
        conversation: Option<Arc<Stream>>,
    ) -> Option<LaneDescriptor> {
        let q = 1 - p;
        match (submitted, partner) {
            (Item::Offer(offer), Item::Accept(accept)) => {
                let conversation = conversation.expect("parked accept without conversation");
                // The parked accept adopted its park-time unit on lane q; its
                // completion receives the second unit of that lane.
                let accept_side = LaneDescriptor::new(LaneHandle::adopt(conversation.clone(), q));
                transfer_handshake(offer, accept, accept_side);
                drop(LaneHandle::adopt(conversation.clone(), p));
                Some(LaneDescriptor::new(LaneHandle::adopt(conversation, p)))
            }
            (Item::Accept(accept), Item::Offer(offer)) => {
                let conversation = conversation.expect("parked offer without conversation");
                // The parked offer adopted its park-time unit on lane q; the
                // accept completion and the submit return both land on lane p.
                let accept_side = LaneDescriptor::new(LaneHandle::adopt(conversation.clone(), p));
                transfer_handshake(offer, accept, accept_side);
                drop(LaneHandle::adopt(conversation.clone(), q));
                Some(LaneDescriptor::new(LaneHandle::adopt(conversation, p)))
            }
            (Item::SendBuffer(send), Item::RecvBuffer(recv)) => {
                transfer_buffer(send, recv);
                None
            }
            (Item::RecvBuffer(recv), Item::SendBuffer(send)) => {
                transfer_buffer(send, recv);
                None
            }
            (Item::PushDescriptor(push), Item::PullDescriptor(pull)) => {
                transfer_descriptor(push, pull);
                None
            }
            (Item::PullDescriptor(pull), Item::PushDescriptor(push)) => {
                transfer_descriptor(push, pull);
                None
            }
            (u, v) => {
                stream_log!(
                    "[STREAM] mismatched operations: {} vs {}",
                    u.kind().name(),
                    v.kind().name()
                );
                panic!("stream operations do not match");
            }
        }
    }

    /// Break `lane` and drain everything parked on the stream.
    ///
    /// Items parked on the closing lane complete with `ClosedLocally`; items
    /// parked opposite, whose partner can no longer arrive, complete with
    /// `ClosedRemotely`. Completions fire after the mutex is released.
    fn close_lane(self: &Arc<Self>, lane: usize) {
        let far = 1 - lane;
        let mut local_drain: Vec<(Item, Option<Arc<Stream>>)> = Vec::new();
        let mut far_drain: Vec<(Item, Option<Arc<Stream>>)> = Vec::new();

        {
            let mut inner = self.inner.lock();
            debug_assert!(!inner.broken[lane], "lane closed twice");
            inner.broken[lane] = true;

            let local_items = core::mem::take(&mut inner.queues[lane]);
            let far_items = core::mem::take(&mut inner.queues[far]);
            let mut conversations = core::mem::take(&mut inner.conversations);

            for item in local_items {
                let conversation = if item.is_handshake() {
                    conversations.pop_front()
                } else {
                    None
                };
                local_drain.push((item, conversation));
            }
            for item in far_items {
                let conversation = if item.is_handshake() {
                    conversations.pop_front()
                } else {
                    None
                };
                far_drain.push((item, conversation));
            }
            debug_assert!(conversations.is_empty());
        }

        stream_log!("[STREAM] lane {} closed", lane);

        for (item, conversation) in local_drain {
            item.fail(Error::ClosedLocally);
            if let Some(conversation) = conversation {
                release_parked_conversation(conversation, lane);
            }
        }
        for (item, conversation) in far_drain {
            item.fail(Error::ClosedRemotely);
            if let Some(conversation) = conversation {
                release_parked_conversation(conversation, far);
            }
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        stream_log!("[STREAM] stream destroyed");
    }
}

/// Complete an offer/accept pair. The accept side's lane lands in its
/// universe; a dead universe means the accepting principal is gone.
fn transfer_handshake(offer: OfferItem, accept: AcceptItem, accept_side: LaneDescriptor) {
    offer.sink.complete(Ok(()));
    let result = match accept.universe.upgrade() {
        Some(universe) => Ok(universe.attach_descriptor(AnyDescriptor::Lane(accept_side))),
        None => Err(Error::ThreadExited),
    };
    accept.sink.complete(result);
}

/// Complete a send/receive pair, copying the sent bytes.
fn transfer_buffer(send: SendBufferItem, recv: RecvBufferItem) {
    if send.buffer.len() > recv.capacity {
        send.sink.complete(Ok(()));
        recv.sink.complete(Err(Error::BufferTooSmall));
        return;
    }
    let mut delivered = Vec::with_capacity(send.buffer.len());
    delivered.extend_from_slice(&send.buffer);
    send.sink.complete(Ok(()));
    recv.sink.complete(Ok(delivered));
}

/// Complete a push/pull pair, moving the descriptor into the puller's
/// universe.
fn transfer_descriptor(push: PushDescriptorItem, pull: PullDescriptorItem) {
    let result = match pull.universe.upgrade() {
        Some(universe) => Ok(universe.attach_descriptor(push.descriptor)),
        None => Err(Error::ThreadExited),
    };
    push.sink.complete(Ok(()));
    pull.sink.complete(result);
}

/// Discard items whose consumer vanished while they were parked, together
/// with any conversation they owned.
fn dispose_abandoned(items: Vec<(Item, Option<Arc<Stream>>)>, parked_lane: usize) {
    for (item, conversation) in items {
        drop(item);
        if let Some(conversation) = conversation {
            release_parked_conversation(conversation, parked_lane);
        }
    }
}

/// Release the unadopted peer units of a conversation whose parked
/// offer/accept never matched. The parked submitter keeps its own handle;
/// the far lane breaks and the child stream unwinds.
fn release_parked_conversation(conversation: Arc<Stream>, parked_lane: usize) {
    let far = 1 - parked_lane;
    drop(LaneHandle::adopt(conversation.clone(), parked_lane));
    drop(LaneHandle::adopt(conversation.clone(), far));
    drop(LaneHandle::adopt(conversation, far));
}
