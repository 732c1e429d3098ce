// SPDX-License-Identifier: MIT

//! Service layer: session lifecycle, OAuth bridging, accounts, progress.

pub mod account;
pub mod oauth;
pub mod progress;
pub mod session;

pub use account::AccountService;
pub use oauth::OAuthService;
pub use progress::ProgressService;
pub use session::SessionService;
