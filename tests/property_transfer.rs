//! Stream transfer properties
//!
//! For any payload, a matched send/receive delivers byte-identical data and
//! reports the exact length; per-lane FIFO order holds for any message
//! sequence on either lane; oversized sends surface `BufferTooSmall` to the
//! receiver only; and universe attachment never hands out a live handle
//! twice.

use std::collections::HashSet;

use kpio_stream::prelude::*;
use proptest::collection::vec;
use proptest::prelude::*;

// ── Strategies ───────────────────────────────────────────────────────

/// Arbitrary message payloads up to 512 bytes.
fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..512)
}

/// Arbitrary batches of messages.
fn arb_messages() -> impl Strategy<Value = Vec<Vec<u8>>> {
    vec(vec(any::<u8>(), 0..32), 1..16)
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_transport_transparency(payload in arb_payload()) {
        let (lane0, lane1) = stream_pair();

        let (send, sent) = Item::send_buffer(SubmitInfo::NONE, payload.clone());
        lane0.submit(send);

        let (recv, received) = Item::recv_buffer(SubmitInfo::NONE, 512);
        lane1.submit(recv);

        prop_assert_eq!(sent.try_take().unwrap().result, Ok(()));
        let bytes = received.try_take().unwrap().result.unwrap();
        prop_assert_eq!(bytes.len(), payload.len());
        prop_assert_eq!(bytes, payload);
    }

    #[test]
    fn prop_fifo_order_either_lane(messages in arb_messages(), side in 0..2usize) {
        let (lane0, lane1) = stream_pair();
        let (tx, rx) = if side == 0 { (lane0, lane1) } else { (lane1, lane0) };

        let mut sends = Vec::new();
        let mut receipts = Vec::new();
        for message in &messages {
            let (send, sent) = Item::send_buffer(SubmitInfo::NONE, message.clone());
            tx.submit(send);
            sends.push(sent);
        }
        for _ in &messages {
            let (recv, received) = Item::recv_buffer(SubmitInfo::NONE, 32);
            rx.submit(recv);
            receipts.push(received);
        }

        for sent in sends {
            prop_assert_eq!(sent.try_take().unwrap().result, Ok(()));
        }
        for (message, received) in messages.iter().zip(receipts) {
            let bytes = received.try_take().unwrap().result.unwrap();
            prop_assert_eq!(&bytes, message);
        }
    }

    #[test]
    fn prop_oversized_send_is_receiver_visible(payload in vec(any::<u8>(), 1..256), shrink in any::<usize>()) {
        let capacity = shrink % payload.len();
        let (lane0, lane1) = stream_pair();

        let (recv, received) = Item::recv_buffer(SubmitInfo::NONE, capacity);
        lane1.submit(recv);

        let (send, sent) = Item::send_buffer(SubmitInfo::NONE, payload);
        lane0.submit(send);

        prop_assert_eq!(sent.try_take().unwrap().result, Ok(()));
        prop_assert_eq!(received.try_take().unwrap().result, Err(Error::BufferTooSmall));
    }

    #[test]
    fn prop_universe_handles_never_collide(ops in vec(any::<u8>(), 1..64)) {
        let universe = Universe::new();
        let mut seen = HashSet::new();
        let mut live = Vec::new();

        for op in ops {
            if op % 2 == 0 || live.is_empty() {
                let descriptor =
                    AnyDescriptor::Thread(ThreadDescriptor::new(kpio_stream::ThreadId(u64::from(op))));
                let handle = universe.attach_descriptor(descriptor);
                prop_assert!(seen.insert(handle), "handle {:?} reused", handle);
                live.push(handle);
            } else {
                let handle = live.remove(usize::from(op) % live.len());
                prop_assert!(universe.detach_descriptor(handle).is_some());
            }
        }

        prop_assert_eq!(universe.handle_count(), live.len());
    }
}
