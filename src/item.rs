//! Stream item taxonomy.
//!
//! An [`Item`] is one unit of work submitted on a lane. Items come in three
//! matched pairs — offer/accept, send/receive, push/pull — and every item
//! binds a single-shot completion sink plus an opaque [`SubmitInfo`] echoed
//! back in the outcome.

use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;

use crate::completion::{completion, Completion, CompletionSink};
use crate::descriptor::AnyDescriptor;
use crate::error::Error;
use crate::universe::{Handle, Universe};

/// Opaque caller context carried through a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitInfo(pub u64);

impl SubmitInfo {
    /// Empty submit info.
    pub const NONE: SubmitInfo = SubmitInfo(0);
}

/// Discriminator for the item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Offer a conversation.
    Offer,
    /// Accept an offered conversation.
    Accept,
    /// Send a byte buffer.
    SendBuffer,
    /// Receive a byte buffer.
    RecvBuffer,
    /// Push a descriptor.
    PushDescriptor,
    /// Pull a pushed descriptor.
    PullDescriptor,
}

impl ItemKind {
    /// Get the kind name as a string.
    pub const fn name(self) -> &'static str {
        match self {
            ItemKind::Offer => "offer",
            ItemKind::Accept => "accept",
            ItemKind::SendBuffer => "send-buffer",
            ItemKind::RecvBuffer => "recv-buffer",
            ItemKind::PushDescriptor => "push-descriptor",
            ItemKind::PullDescriptor => "pull-descriptor",
        }
    }
}

/// Offer half of a conversation handshake.
pub struct OfferItem {
    pub(crate) sink: CompletionSink<()>,
}

/// Accept half of a conversation handshake.
pub struct AcceptItem {
    pub(crate) sink: CompletionSink<Handle>,
    /// Universe the child lane is attached into on match.
    pub(crate) universe: Weak<Universe>,
}

/// A byte buffer awaiting a receiver.
pub struct SendBufferItem {
    pub(crate) sink: CompletionSink<()>,
    pub(crate) buffer: Vec<u8>,
}

/// A receive slot awaiting a sender.
pub struct RecvBufferItem {
    pub(crate) sink: CompletionSink<Vec<u8>>,
    /// Largest send this item accepts.
    pub(crate) capacity: usize,
}

/// A descriptor awaiting a puller. The descriptor stays owned by this item
/// until the match consumes it.
pub struct PushDescriptorItem {
    pub(crate) sink: CompletionSink<()>,
    pub(crate) descriptor: AnyDescriptor,
}

/// A pull slot awaiting a pushed descriptor.
pub struct PullDescriptorItem {
    pub(crate) sink: CompletionSink<Handle>,
    /// Universe the descriptor is attached into on match.
    pub(crate) universe: Weak<Universe>,
}

/// A unit of work submitted on a lane.
pub enum Item {
    /// Offer a conversation.
    Offer(OfferItem),
    /// Accept an offered conversation.
    Accept(AcceptItem),
    /// Send a byte buffer.
    SendBuffer(SendBufferItem),
    /// Receive a byte buffer.
    RecvBuffer(RecvBufferItem),
    /// Push a descriptor.
    PushDescriptor(PushDescriptorItem),
    /// Pull a pushed descriptor.
    PullDescriptor(PullDescriptorItem),
}

impl Item {
    /// Build an offer item.
    pub fn offer(info: SubmitInfo) -> (Item, Completion<()>) {
        let (sink, done) = completion(info);
        (Item::Offer(OfferItem { sink }), done)
    }

    /// Build an accept item attaching into `universe`.
    pub fn accept(info: SubmitInfo, universe: &Arc<Universe>) -> (Item, Completion<Handle>) {
        let (sink, done) = completion(info);
        (
            Item::Accept(AcceptItem {
                sink,
                universe: Arc::downgrade(universe),
            }),
            done,
        )
    }

    /// Build a send item carrying `buffer`.
    pub fn send_buffer(info: SubmitInfo, buffer: Vec<u8>) -> (Item, Completion<()>) {
        let (sink, done) = completion(info);
        (Item::SendBuffer(SendBufferItem { sink, buffer }), done)
    }

    /// Build a receive item accepting up to `capacity` bytes.
    pub fn recv_buffer(info: SubmitInfo, capacity: usize) -> (Item, Completion<Vec<u8>>) {
        let (sink, done) = completion(info);
        (Item::RecvBuffer(RecvBufferItem { sink, capacity }), done)
    }

    /// Build a push item carrying `descriptor`.
    pub fn push_descriptor(info: SubmitInfo, descriptor: AnyDescriptor) -> (Item, Completion<()>) {
        let (sink, done) = completion(info);
        (
            Item::PushDescriptor(PushDescriptorItem { sink, descriptor }),
            done,
        )
    }

    /// Build a pull item attaching into `universe`.
    pub fn pull_descriptor(
        info: SubmitInfo,
        universe: &Arc<Universe>,
    ) -> (Item, Completion<Handle>) {
        let (sink, done) = completion(info);
        (
            Item::PullDescriptor(PullDescriptorItem {
                sink,
                universe: Arc::downgrade(universe),
            }),
            done,
        )
    }

    /// Get the item's kind.
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Offer(_) => ItemKind::Offer,
            Item::Accept(_) => ItemKind::Accept,
            Item::SendBuffer(_) => ItemKind::SendBuffer,
            Item::RecvBuffer(_) => ItemKind::RecvBuffer,
            Item::PushDescriptor(_) => ItemKind::PushDescriptor,
            Item::PullDescriptor(_) => ItemKind::PullDescriptor,
        }
    }

    /// Check whether this item is half of a conversation handshake.
    pub fn is_handshake(&self) -> bool {
        matches!(self, Item::Offer(_) | Item::Accept(_))
    }

    /// Check whether the item's consumer has dropped its completion.
    pub(crate) fn is_abandoned(&self) -> bool {
        match self {
            Item::Offer(i) => i.sink.is_abandoned(),
            Item::Accept(i) => i.sink.is_abandoned(),
            Item::SendBuffer(i) => i.sink.is_abandoned(),
            Item::RecvBuffer(i) => i.sink.is_abandoned(),
            Item::PushDescriptor(i) => i.sink.is_abandoned(),
            Item::PullDescriptor(i) => i.sink.is_abandoned(),
        }
    }

    /// Complete the item with `error`, releasing any carried payload.
    pub(crate) fn fail(self, error: Error) {
        match self {
            Item::Offer(i) => {
                i.sink.complete(Err(error));
            }
            Item::Accept(i) => {
                i.sink.complete(Err(error));
            }
            Item::SendBuffer(i) => {
                i.sink.complete(Err(error));
            }
            Item::RecvBuffer(i) => {
                i.sink.complete(Err(error));
            }
            Item::PushDescriptor(i) => {
                i.sink.complete(Err(error));
            }
            Item::PullDescriptor(i) => {
                i.sink.complete(Err(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let (offer, _done) = Item::offer(SubmitInfo::NONE);
        assert_eq!(offer.kind(), ItemKind::Offer);
        assert_eq!(offer.kind().name(), "offer");
        assert!(offer.is_handshake());

        let (send, _done) = Item::send_buffer(SubmitInfo::NONE, Vec::new());
        assert_eq!(send.kind(), ItemKind::SendBuffer);
        assert!(!send.is_handshake());
    }

    #[test]
    fn test_fail_delivers_error() {
        let (item, done) = Item::recv_buffer(SubmitInfo(5), 16);
        item.fail(Error::ClosedRemotely);

        let outcome = done.try_take().expect("failed item completes");
        assert_eq!(outcome.info, SubmitInfo(5));
        assert_eq!(outcome.result, Err(Error::ClosedRemotely));
    }

    #[test]
    fn test_abandonment_tracks_completion_drop() {
        let (item, done) = Item::offer(SubmitInfo::NONE);
        assert!(!item.is_abandoned());
        drop(done);
        assert!(item.is_abandoned());
    }
}
