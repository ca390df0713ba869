mod friendship_repo_mem;
mod notify_hub;
mod player_repo_mem;
mod seen_store_mem;
mod store;
mod trade_repo_mem;

pub use friendship_repo_mem::*;
pub use notify_hub::*;
pub use player_repo_mem::*;
pub use seen_store_mem::*;
pub use store::*;
pub use trade_repo_mem::*;
