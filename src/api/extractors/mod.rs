pub mod identity;

pub use identity::{Identity, IdentityContext};
