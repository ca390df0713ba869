mod friendship_service_impl;
mod seen_tracker;
mod trade_service_impl;

pub use friendship_service_impl::*;
pub use seen_tracker::*;
pub use trade_service_impl::*;
