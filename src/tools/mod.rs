pub mod bits;
pub mod recency;
pub mod window;
