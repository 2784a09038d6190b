//! # Job Queue Module / 作业队列模块
//!
//! Fire-and-forget dispatch of named jobs to a long-running worker.
//!
//! - `wire` - framing of requests and replies
//! - `dispatcher` - the sending side
//! - `worker` - the receiving side and the executor
//!
//! - `wire` - 请求和回复的帧格式
//! - `dispatcher` - 发送端
//! - `worker` - 接收端和执行器

pub mod dispatcher;
pub mod wire;
pub mod worker;

pub use dispatcher::JobDispatcher;
pub use worker::JobWorker;
