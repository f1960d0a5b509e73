// src/auth/mod.rs
pub mod callback;
pub mod exchanger;
pub mod state_machine;

pub use callback::{authorize_url, strip_oauth_params, CallbackParams};
pub use exchanger::{ExchangeError, OAuthExchanger, RelayExchanger, TokenGrant};
pub use state_machine::{AuthPhase, AuthServices, AuthSnapshot, AuthStateMachine};
