//! Pipelease: exclusive edit leases and reconciliation polling for a shared
//! pipeline catalogue.
//!
//! Many clients browse one catalogue of pipelines; at most one session may
//! edit a given pipeline at a time. A session takes a time-bounded lease on
//! the pipeline name and keeps it alive with heartbeats. Every other client
//! sees the lease through a cheap lock-status poll and picks up added or
//! removed pipelines through a summary poll that triggers a full refetch only
//! on change.
//!
//! Server side: [`lease::LeaseService`] over a [`lease::LeaseStore`],
//! [`status::LockStatusService`] and [`catalog::CatalogSummaryService`].
//! Client side: [`client::LeaseClient`] with [`client::EditSession`], and
//! [`poller::ReconciliationPoller`]. The [`api`] traits sit between them.

pub mod api;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod clock;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod lease;
pub mod poller;
pub mod session;
pub mod status;
