//! GitHub OAuth brokering library
//!
//! Provides state-token decoding, client credential lookup, and
//! authorization-code exchange for the OAuth exchange proxy. This crate is a
//! standalone library with no dependency on the proxy binary — it can be
//! tested and used independently.
//!
//! Request flow:
//! 1. A client application sends the user to GitHub's authorize endpoint with
//!    an opaque `state` value (base64 JSON, see [`state::StateToken`])
//! 2. GitHub redirects to the proxy's callback with `code` + `state`
//! 3. The proxy decodes the state via `StateToken::decode()` and validates
//!    the provider against its allow-list
//! 4. For web-app flows the proxy resolves a secret from the
//!    [`registry::ClientRegistry`] and calls [`token::exchange_code()`]
//! 5. The outcome (granted or denied) is relayed back to the client

pub mod constants;
pub mod error;
pub mod registry;
pub mod state;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use registry::{ClientRegistry, ResolvedClient};
pub use state::{StateError, StateToken};
pub use token::{Denial, ExchangeOutcome, Grant, exchange_code};
