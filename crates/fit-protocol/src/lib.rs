//! Wire protocol for fit.
//!
//! Every exchange is one TCP connection. The client opens with a two-byte
//! handshake `version:u8 | command:u8`, followed by command arguments:
//!
//! | command            | tag | client sends after handshake                  | server replies |
//! |--------------------|-----|-----------------------------------------------|----------------|
//! | `SEND_OBJECTS`     | 1   | pack, to EOF                                  | nothing        |
//! | `REQUEST_OBJECTS`  | 2   | `len:u32 \| branch`                           | pack           |
//! | `PUSH_BRANCH`      | 3   | `len:u32 \| branch \| tip[32] \| pack`, to EOF | status         |
//!
//! A push status is `status:u8 | len:u32 | message`: 0 for accepted, 1 for
//! rejected with a UTF-8 reason. Integers are big-endian. Branch names are
//! UTF-8 and at most [`MAX_BRANCH_LEN`] bytes. There is no authentication,
//! signing, or encryption.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::FitCodec;
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    Command, PushStatus, Request, DEFAULT_MAX_PACK_SIZE, DEFAULT_PORT, MAX_BRANCH_LEN,
    MAX_STATUS_MESSAGE_LEN, PROTOCOL_VERSION,
};
