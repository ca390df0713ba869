// store plumbing

mod store;
mod subscription;

pub use store::*;
pub use subscription::*;

// repos

mod friendship_repo;
mod player_repo;
mod trade_repo;

pub use friendship_repo::*;
pub use player_repo::*;
pub use trade_repo::*;

// collaborators

mod dispatch;
mod seen_store;

pub use dispatch::*;
pub use seen_store::*;
