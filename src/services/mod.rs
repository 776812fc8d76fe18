// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod bootstrap;
pub mod cycle;
pub mod identity;
pub mod supabase_auth;
pub mod sync;

pub use account::{AccountError, AccountService};
pub use bootstrap::{select_screen, Bootstrap, Screen, SessionBootstrapper, SessionWatch};
pub use cycle::{evaluate, CycleError, CyclePhase, CycleStatus, CycleTicker, DailyCycle};
pub use identity::{AuthError, Identity, IdentityProvider, LocalIdentity};
pub use supabase_auth::SupabaseAuth;
pub use sync::{ProfileSync, PullOutcome, SyncHealth, SyncOutcome};
