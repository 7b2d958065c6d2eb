mod cache;
mod cancel;
mod payload;
mod queue;

pub use cache::MemCache;
pub use cancel::Cancellation;
pub use payload::{Payload, PayloadKey};
pub use queue::BroadcastQueue;
