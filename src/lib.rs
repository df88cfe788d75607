//! Point-to-point messaging over UDP, multiplexing any number of logical
//!  *topics* on a single socket, with an application-level chunking protocol
//!  for payloads bigger than one datagram.
//!
//! ## Design goals
//!
//! * One datagram socket per node, bound to an OS-assigned ephemeral port that
//!   peers discover out of band
//! * Topics demultiplex received datagrams to per-topic subscriber callbacks;
//!   subscribing and unsubscribing is safe from any task while the receive
//!   loop is dispatching
//! * Sends are fire-and-forget; there are explicitly *no* delivery, ordering
//!   or duplicate-suppression guarantees --> UDP semantics all the way up
//! * Payloads bigger than a single datagram are fragmented into tagged chunk
//!   frames and reassembled on the receiving side, tolerating arbitrary
//!   arrival permutations and duplicated frames
//! * The receive loop is a single background task with an explicit
//!   cancellation signal so it can be embedded in a supervised lifecycle
//!
//! ## Wire format
//!
//! Every datagram payload is UTF-8 text:
//! ```ascii
//! <topicId>:<body>
//! ```
//! split on the *first* `:` only - the body is opaque and may contain `:`.
//!
//! For chunked topics the body is a chunk frame:
//! ```ascii
//! <transferId>:<chunkIndex>:<totalChunks>:<chunkData>
//! ```
//! split with a four-field limit so `chunkData` may contain `:`.
//!  `chunkIndex` and `totalChunks` are base-10 integers with
//!  `0 <= chunkIndex < totalChunks`.

pub mod chunking;
pub mod config;
pub mod messaging;
pub mod messengers;
pub mod test_util;
