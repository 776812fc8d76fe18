// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Brahma Path: daily-cycle and profile-sync service for a 108-day program.
//!
//! This crate keeps a user's progress on the device, mirrors it to a remote
//! backend when one is available, drives the 24-hour check-in cycle and
//! exposes all of it as a small JSON API for the front end.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::RecordStore;
use services::{AccountService, DailyCycle, IdentityProvider, ProfileSync, SessionBootstrapper};
use store::{JournalStore, KvStore, ProfileStore};
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub profiles: ProfileStore,
    pub journal: JournalStore,
    pub sync: ProfileSync,
    pub identity: Arc<dyn IdentityProvider>,
    pub cycle: DailyCycle,
    pub bootstrapper: SessionBootstrapper,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire every service over the given substrate, remote store and identity
    /// provider.
    pub fn new(
        config: Config,
        kv: Arc<dyn KvStore>,
        records: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let profiles = ProfileStore::new(kv.clone());
        let journal = JournalStore::new(kv);
        let sync = ProfileSync::new(records, profiles.clone(), clock.clone());
        let cycle = DailyCycle::new(profiles.clone(), clock.clone());
        let bootstrapper = SessionBootstrapper::new(
            profiles.clone(),
            sync.clone(),
            identity.clone(),
            cycle.clone(),
        );
        let accounts = AccountService::new(
            profiles.clone(),
            sync.clone(),
            identity.clone(),
            bootstrapper.clone(),
            clock.clone(),
        );

        Self {
            config,
            clock,
            profiles,
            journal,
            sync,
            identity,
            cycle,
            bootstrapper,
            accounts,
        }
    }
}
