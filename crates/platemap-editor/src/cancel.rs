// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page cancellation of analysis runs.
//
// Each page has a generation counter behind a watch channel. Starting a run
// bumps the counter and hands out a ticket for the new generation; a later
// run (or an explicit cancel) bumps it again and every older ticket goes
// stale. Stale results are discarded before they touch the overlay store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use platemap_core::error::{PlatemapError, Result};
use tokio::sync::watch;
use tracing::debug;

/// Hands out [`AnalysisTicket`]s. Cloning shares the registry, so one clone
/// can cancel runs started through another.
#[derive(Debug, Clone, Default)]
pub struct AnalysisGate {
    pages: Arc<Mutex<HashMap<usize, watch::Sender<u64>>>>,
}

impl AnalysisGate {
    /// Start a run on `page_index`, superseding any run already in flight.
    pub fn begin(&self, page_index: usize) -> AnalysisTicket {
        let mut pages = self.lock();
        let sender = pages
            .entry(page_index)
            .or_insert_with(|| watch::channel(0).0);
        sender.send_modify(|generation| *generation += 1);
        let generation = *sender.borrow();
        debug!(page_index, generation, "Analysis run started");
        AnalysisTicket {
            page_index,
            generation,
            receiver: sender.subscribe(),
        }
    }

    /// Abort whatever run is in flight on `page_index`.
    pub fn cancel(&self, page_index: usize) {
        if let Some(sender) = self.lock().get(&page_index) {
            sender.send_modify(|generation| *generation += 1);
            debug!(page_index, "Analysis run cancelled");
        }
    }

    /// Abort every run in flight, on any page.
    pub fn cancel_all(&self) {
        let pages = self.lock();
        for sender in pages.values() {
            sender.send_modify(|generation| *generation += 1);
        }
        debug!(pages = pages.len(), "All analysis runs cancelled");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, watch::Sender<u64>>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that a run is still the latest one for its page.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    page_index: usize,
    generation: u64,
    receiver: watch::Receiver<u64>,
}

impl AnalysisTicket {
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn is_current(&self) -> bool {
        *self.receiver.borrow() == self.generation
    }

    /// `Err(Aborted)` once the run has been superseded.
    pub fn ensure_current(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(PlatemapError::Aborted)
        }
    }

    /// Resolves when the run is superseded. Never resolves if the gate is
    /// dropped first.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() != self.generation {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `work` unless the run is superseded first. A result that
    /// arrives after cancellation is dropped.
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let out = tokio::select! {
            biased;
            _ = self.cancelled() => return Err(PlatemapError::Aborted),
            out = work => out,
        };
        self.ensure_current()?;
        out
    }
}
