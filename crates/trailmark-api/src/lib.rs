pub mod error;
pub mod friends;
pub mod memories;
pub mod meta;
pub mod photos;
pub mod state;
pub mod storage;
pub mod users;
pub mod util;
