/*!
 * Request identity extractor
 *
 * Public API:
 * - IdentityContext
 * - Identity
 */

mod core;
mod types;

pub use self::core::Identity;
pub use types::IdentityContext;
