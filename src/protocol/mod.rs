//! Line protocol shared by the relay and the consumer
//!
//! Every record travels as one UTF-8 line:
//!
//! ```text
//! NEW|<text>\n     record with payload
//! NEW\n            record with an empty payload
//! ```
//!
//! The payload never carries a raw `\n` or `\r`. [`encode_frame`] escapes
//! newlines and strips carriage returns before framing, and [`LineCodec`]
//! reassembles frames from arbitrarily split reads.

pub mod codec;
pub mod frame;

pub use codec::{LineCodec, DEFAULT_MAX_LINE_LENGTH};
pub use frame::{decode_line, encode_frame, sanitize_text, Frame, FRAME_PREFIX, FRAME_TAG};
