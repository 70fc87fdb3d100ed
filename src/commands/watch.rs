//! Implementation of the `pipelease watch` command.
//!
//! `watch` keeps a client view of the catalogue current the way an editor's
//! listing page would: a fast lock-status poll updates the lease column, and
//! a slow summary poll refetches the catalogue only when pipelines were added
//! or removed. The view is reprinted whenever its revision changes.
//!
//! A watcher also runs the expired-lease sweep, so a long-running `watch`
//! keeps the store directory tidy.

use super::Store;
use super::pipeline::lease_column;
use crate::cli::WatchArgs;
use crate::error::Result;
use crate::lease::Sweeper;
use crate::poller::{ClientViewState, ReconciliationPoller};
use crate::session::SessionOwnerId;
use chrono::Utc;
use std::fmt::Write as _;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often the view's revision is checked for redraws.
const REDRAW_CHECK: Duration = Duration::from_millis(200);

pub fn cmd_watch(store: Store, args: WatchArgs) -> Result<()> {
    let lock_interval = args
        .lock_interval_ms
        .map(|ms| Duration::from_millis(ms.max(50)))
        .unwrap_or_else(|| store.config.lock_poll_interval());
    let summary_interval = args
        .summary_interval_ms
        .map(|ms| Duration::from_millis(ms.max(50)))
        .unwrap_or_else(|| store.config.summary_poll_interval());

    let poller = ReconciliationPoller::new(Arc::new(store.plane.clone()));
    poller.refetch()?;
    let mut shown = poller.view();
    print!("{}", render_view(&shown, &store.owner));

    if args.once {
        return Ok(());
    }

    eprintln!("pipelease watch started");
    eprintln!("  store:   {}", store.ctx.root.display());
    eprintln!("  locks:   every {}ms", lock_interval.as_millis());
    eprintln!("  summary: every {}ms", summary_interval.as_millis());
    eprintln!();

    let _sweeper = Sweeper::spawn(store.plane.leases().clone(), store.config.sweep_interval());
    let _polls = poller.spawn(lock_interval, summary_interval);

    loop {
        thread::sleep(REDRAW_CHECK.min(lock_interval));
        let view = poller.view();
        if view.revision() != shown.revision() {
            print!("{}", render_view(&view, &store.owner));
            shown = view;
        }
    }
}

/// Render the cached view as a table.
pub(crate) fn render_view(view: &ClientViewState, owner: &SessionOwnerId) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}]", Utc::now().format("%H:%M:%S"));

    let mut pipelines: Vec<_> = view.resources().collect();
    if pipelines.is_empty() {
        let _ = writeln!(out, "No pipelines.");
        return out;
    }
    pipelines.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.name.cmp(&b.name))
    });

    let _ = writeln!(out, "{:<32} LEASE", "PIPELINE");
    for pipeline in pipelines {
        let _ = writeln!(
            out,
            "{:<32} {}",
            pipeline.name,
            lease_column(view.annotation(&pipeline.name), owner)
        );
    }
    let _ = writeln!(out);
    out
}
