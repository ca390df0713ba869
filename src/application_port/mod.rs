mod friendship_service;
mod trade_service;

pub use friendship_service::*;
pub use trade_service::*;
