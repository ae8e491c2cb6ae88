//! KPIO Stream IPC
//!
//! This crate provides the kernel's rendezvous IPC primitive: a two-lane
//! stream that pairs send operations on one lane against receive operations
//! on the other, transfers bytes and capability descriptors, and spawns
//! child streams (conversations) for nested dialogs. The request/response
//! protocol, descriptor passing, and shared-memory hand-off between kernel
//! services are all built on this object.
//!
//! # Design
//!
//! - **Lanes**: every stream has exactly two symmetric endpoints
//! - **Rendezvous**: items park until a compatible partner arrives opposite
//! - **Capabilities**: lane handles are the authority; possession is access
//! - **Conversations**: offer/accept matches create child streams
//!
//! # Example
//!
//! ```
//! use kpio_stream::prelude::*;
//!
//! let (lane0, lane1) = stream_pair();
//!
//! let (send, _sent) = Item::send_buffer(SubmitInfo::NONE, b"hello".to_vec());
//! lane0.submit(send);
//!
//! let (recv, received) = Item::recv_buffer(SubmitInfo::NONE, 16);
//! lane1.submit(recv);
//!
//! let outcome = received.try_take().unwrap();
//! assert_eq!(outcome.result.unwrap(), b"hello");
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod completion;
pub mod descriptor;
pub mod error;
pub mod item;
pub mod lane;
pub mod log;
pub mod stream;
pub mod universe;


pub use completion::{Completion, CompletionSink, Outcome};
pub use descriptor::{AnyDescriptor, MemoryDescriptor, MemoryFlags, MemoryId, ThreadDescriptor, ThreadId};
pub use error::Error;
pub use item::{Item, ItemKind, SubmitInfo};
pub use lane::{stream_pair, LaneDescriptor, LaneHandle};
pub use stream::{Stream, LANE_COUNT};
pub use universe::{Handle, Universe};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::descriptor::{AnyDescriptor, MemoryDescriptor, MemoryFlags, ThreadDescriptor};
    pub use crate::error::Error;
    pub use crate::item::{Item, SubmitInfo};
    pub use crate::lane::{stream_pair, LaneDescriptor, LaneHandle};
    pub use crate::universe::{Handle, Universe};
}
