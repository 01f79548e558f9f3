pub mod cache;

pub use cache::{Listing, TreeCache};
