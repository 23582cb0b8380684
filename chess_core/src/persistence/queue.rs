//! Latest-wins write queue.
//!
//! There is a single pending slot. Submitting replaces whatever is waiting
//! there; a write that has already started always runs to completion. One
//! writer thread drains the slot, so at most one write is ever in flight
//! and snapshots are written in the order they were submitted, minus the
//! ones that were replaced before the writer got to them.

use crate::persistence::{PersistError, SnapshotWriter};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub type WriteReport<R> = Result<R, PersistError>;

struct Slot<T> {
    pending: Mutex<Option<T>>,
    active: AtomicBool,
}

impl<T> Slot<T> {
    fn take(&self) -> Option<T> {
        self.pending.lock().take()
    }

    fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

pub struct CoalescingQueue<W: SnapshotWriter> {
    slot: Arc<Slot<W::Snapshot>>,
    wake: Option<Sender<()>>,
    reports: Receiver<WriteReport<W::Record>>,
    worker: Option<JoinHandle<()>>,
}

impl<W: SnapshotWriter> CoalescingQueue<W> {
    pub fn new(writer: W) -> Result<Self, PersistError> {
        let slot = Arc::new(Slot {
            pending: Mutex::new(None),
            active: AtomicBool::new(false),
        });
        let (wake, wakeups) = mpsc::channel();
        let (report_tx, reports) = mpsc::channel();

        let worker_slot = Arc::clone(&slot);
        let worker = thread::Builder::new()
            .name("save-writer".to_string())
            .spawn(move || run_writer(writer, &worker_slot, &wakeups, &report_tx))
            .map_err(PersistError::Spawn)?;

        Ok(Self {
            slot,
            wake: Some(wake),
            reports,
            worker: Some(worker),
        })
    }

    /// Queues `snapshot`, replacing any snapshot still waiting. Never blocks
    /// on a write.
    pub fn submit(&self, snapshot: W::Snapshot) {
        if self.slot.pending.lock().replace(snapshot).is_some() {
            log::debug!("save queue: pending snapshot superseded");
        }
        if !self.slot.active.load(Ordering::SeqCst) {
            if let Some(wake) = &self.wake {
                // The writer only goes away on shutdown.
                let _ = wake.send(());
            }
        }
    }

    /// Results of writes finished since the last call, oldest first.
    pub fn poll_reports(&self) -> Vec<WriteReport<W::Record>> {
        self.reports.try_iter().collect()
    }

    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.slot.active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slot.has_pending()
    }

    /// Writes whatever is still pending, stops the writer and returns every
    /// report not yet collected.
    pub fn close(mut self) -> Vec<WriteReport<W::Record>> {
        self.shutdown();
        self.poll_reports()
    }

    fn shutdown(&mut self) {
        self.wake.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("save writer panicked");
            }
        }
    }
}

impl<W: SnapshotWriter> Drop for CoalescingQueue<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_writer<W: SnapshotWriter>(
    mut writer: W,
    slot: &Slot<W::Snapshot>,
    wakeups: &Receiver<()>,
    reports: &Sender<WriteReport<W::Record>>,
) {
    for () in wakeups {
        drain(&mut writer, slot, reports);
    }
    // Shutting down: the last submission may not have sent a wakeup.
    drain(&mut writer, slot, reports);
    log::debug!("save writer stopped");
}

fn drain<W: SnapshotWriter>(
    writer: &mut W,
    slot: &Slot<W::Snapshot>,
    reports: &Sender<WriteReport<W::Record>>,
) {
    loop {
        if slot
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        while let Some(snapshot) = slot.take() {
            let report = writer.write_snapshot(snapshot);
            if let Err(err) = &report {
                log::warn!("save failed: {err}");
            }
            // Nobody listening is fine; the write itself happened.
            let _ = reports.send(report);
        }

        slot.active.store(false, Ordering::SeqCst);

        // A submit that saw the flag still set did not wake us.
        if !slot.has_pending() {
            return;
        }
    }
}
