mod seen_store_fs;

pub use seen_store_fs::*;
