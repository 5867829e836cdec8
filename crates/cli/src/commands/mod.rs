//! Subcommand implementations.

pub mod cart;
pub mod favorites;
pub mod profile;

use thiserror::Error;

use atelier_core::IdError;
use atelier_storefront::error::StoreError;
use atelier_storefront::notify::{Notice, NoticeLevel, StoreObserver, StoreSnapshot};
use atelier_storefront::services::AccountError;

/// Errors that can occur while running a subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A product id argument is invalid.
    #[error("Invalid product id: {0}")]
    InvalidId(#[from] IdError),

    /// The command needs `--user`.
    #[error("This command needs a signed-in user (--user and --email)")]
    NotSignedIn,

    /// A cart or favorites operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A profile operation failed.
    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Prints store notices to the terminal.
pub struct TerminalObserver;

impl StoreObserver for TerminalObserver {
    fn refresh(&self, snapshot: &StoreSnapshot) {
        tracing::debug!(
            cart_count = snapshot.cart_count,
            favorites = snapshot.favorites.len(),
            "store refreshed"
        );
    }

    #[allow(clippy::print_stdout)]
    fn notice(&self, notice: &Notice) {
        let marker = match notice.level {
            NoticeLevel::Success => "✓",
            NoticeLevel::Info => "·",
            NoticeLevel::Warning => "!",
            NoticeLevel::Error => "✗",
        };
        println!("{marker} {}", notice.message);
        if notice.prompt_sign_in {
            println!("  Pass --user and --email (or set ATELIER_USER and ATELIER_EMAIL) to sign in.");
        }
    }
}
