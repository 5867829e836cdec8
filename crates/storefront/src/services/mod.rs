//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `session` - Current identity and change fan-out
//! - `store` - Cart and favorites with document store sync
//! - `account` - Sign-up, sign-in and profile management
//! - `profile` - Login profile upserts on every sign-in

pub mod account;
pub mod profile;
pub mod session;
pub mod store;

pub use account::{AccountError, AccountService, SignInOutcome};
pub use profile::ProfileSync;
pub use session::SessionTracker;
pub use store::CartStore;
