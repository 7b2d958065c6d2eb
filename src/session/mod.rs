//! Per-session conversation state.

mod context;
#[allow(clippy::module_inception)]
mod session;
mod store;

pub use context::{Context, ContextEntry, ContextPolicy, ContextRole};
pub use session::{Session, SessionId};
pub use store::SessionStore;
