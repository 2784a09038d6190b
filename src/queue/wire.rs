//! # Wire Format Module / 线路格式模块
//!
//! Requests and replies are single lines of UTF-8 text over TCP. A request is
//! a job descriptor encoded as a flat JSON object, a reply is either `ACK` or
//! `ERR <reason>`.
//!
//! 请求和回复都是 TCP 上的单行 UTF-8 文本。请求是编码为扁平 JSON 对象的作业描述符，
//! 回复是 `ACK` 或 `ERR <reason>`。

use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::core::error::JobError;

/// Positive acknowledgement: the job was received and queued.
pub const ACK: &str = "ACK";
/// Prefix of a negative reply.
pub const ERR_PREFIX: &str = "ERR";
/// Longest accepted frame, in bytes.
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;

pub type JobFramed = Framed<TcpStream, LinesCodec>;

pub fn framed(stream: TcpStream) -> JobFramed {
    Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH))
}

/// An `ERR` reply. Newlines in `reason` would split the frame and are flattened.
pub fn error_reply(reason: &str) -> String {
    format!("{ERR_PREFIX} {}", reason.replace(['\r', '\n'], " "))
}

/// Accepts exactly `ACK`; anything else is a protocol error.
/// 仅接受 `ACK`；其他任何内容都是协议错误。
pub fn check_reply(reply: &str) -> Result<(), JobError> {
    if reply == ACK {
        return Ok(());
    }
    match reply.strip_prefix(ERR_PREFIX) {
        Some(reason) => Err(JobError::Protocol(format!("worker rejected the job: {}", reason.trim()))),
        None => Err(JobError::Protocol(format!("unexpected reply {reply:?}"))),
    }
}
