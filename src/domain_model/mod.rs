mod card;
mod friendship;
mod notification;
mod save;
mod trade;
mod user;

pub use card::*;
pub use friendship::*;
pub use notification::*;
pub use save::*;
pub use trade::*;
pub use user::*;
