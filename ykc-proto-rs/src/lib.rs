//! # YKC Protocol
//!
//! Wire codec for the binary protocol spoken by charging piles and stations.
//!
//! ```text
//!  TCP bytes ──► FrameCodec ──► RawFrame ──► decode_inbound ──► Inbound
//!                                  ▲
//!  Message::encode ◄── typed struct┘ (checksum, BCD, LE fields)
//! ```
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`primitives`] | hex, BCD and packed-time helpers |
//! | [`checksum`] | table CRC and one-byte sum |
//! | [`command`] | command codes, families, forwarding topics |
//! | [`frame`] | envelope parse/build, wire header |
//! | [`field`] | bounds-checked field reader/writer |
//! | [`messages`] | one typed struct per command |
//! | [`codec`] | `tokio_util` stream framing with resync |
//!
//! ## Usage
//!
//! ```
//! use ykc_proto::{Header, Message, RawFrame, RemoteRebootRequest};
//!
//! let req = RemoteRebootRequest {
//!     header: Header::new(1, false),
//!     id: "32010200000001".into(),
//!     control: 1,
//! };
//! let bytes = req.encode().unwrap();
//! let raw = RawFrame::parse(&bytes).unwrap();
//! assert_eq!(RemoteRebootRequest::decode(&raw).unwrap(), req);
//! ```

pub mod checksum;
pub mod codec;
pub mod command;
pub mod error;
pub mod field;
pub mod frame;
pub mod messages;
pub mod primitives;

pub use checksum::{crc16, sum8, ChecksumKind};
pub use codec::{FrameCodec, DEFAULT_MAX_FRAME_LEN};
pub use command::{Command, Family};
pub use error::{ProtoError, Result};
pub use frame::{encode_frame, Header, RawFrame, LOGIN_ACK};
pub use messages::*;
