//! Live feed synchronization and optimistic session state
//!
//! [`FeedSynchronizer`] keeps a paginated campaign listing consistent
//! with the repository through pull, push, and poll signals.
//! [`FeedSession`] owns the push and poll tasks as a pair.
//! [`OptimisticCell`] backs the immediate-apply, confirm-or-restore
//! mutation flow the sessions expose.

pub mod optimistic;
pub mod session;
pub mod synchronizer;

pub use optimistic::{MutationState, OptimisticCell};
pub use session::{AdvertiserSession, FeedSession, ViewerSession};
pub use synchronizer::{FeedEntry, FeedSynchronizer};
