pub mod filter;

pub use filter::{AuthenticationFilter, FilterState, Resolution, apply};
