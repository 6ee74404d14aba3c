pub mod session;
pub mod store;

pub use session::EditSession;
pub use store::{ChangeSet, Store, StoreListener};
