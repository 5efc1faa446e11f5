//! Queue module: configuration, wait list, slot permits and the request queue.

mod config;
mod core;
mod options;
mod permit;
mod wait_list;

pub use self::config::{
    ENV_MAX_CONCURRENCY, ENV_QUEUE_NAME, ENV_QUEUE_TIMEOUT_MS, QueueConfig,
};
pub use self::core::RequestQueue;
pub use self::options::SubmitOptions;
