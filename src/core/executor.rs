/*
 * Owns the run/stop lifecycle for script execution. At most one script runs
 * at a time, on a dedicated worker thread so the UI thread stays responsive.
 * Completion is reported back through an mpsc channel that the platform
 * event loop drains; every run carries a monotonically increasing id so a
 * completion that arrives after the user already pressed Stop (and possibly
 * started a new run) can be recognized as stale and ignored.
 *
 * Stop is non-blocking: it raises the cancellation flag and
 * returns immediately so the UI can be restored at once. The abandoned
 * worker notices the flag, kills its child process and exits on its own.
 */
use super::evaluator::{OutputSink, OutputStyle, ScriptEvaluator};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

/// Sent by the worker thread when a run finishes, successfully or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionFinished {
    pub run_id: u64,
}

pub struct ExecutionController {
    evaluator: Arc<dyn ScriptEvaluator>,
    sink: Arc<dyn OutputSink>,
    completions: Sender<ExecutionFinished>,
    cancel: Arc<AtomicBool>,
    running: bool,
    run_id: u64,
}

impl ExecutionController {
    pub fn new(
        evaluator: Arc<dyn ScriptEvaluator>,
        sink: Arc<dyn OutputSink>,
        completions: Sender<ExecutionFinished>,
    ) -> Self {
        ExecutionController {
            evaluator,
            sink,
            completions,
            cancel: Arc::new(AtomicBool::new(false)),
            running: false,
            run_id: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /*
     * Starts executing `script` on a fresh worker thread. An empty script or
     * an already running execution is a silent no-op. Returns whether a run
     * was actually started, so the caller knows to flip the run/stop UI.
     */
    pub fn execute(&mut self, script: &str) -> bool {
        if script.is_empty() {
            log::debug!("ExecutionController: Ignoring execute request for empty script.");
            return false;
        }
        if self.running {
            log::debug!("ExecutionController: Execution already in progress, ignoring request.");
            return false;
        }

        self.run_id += 1;
        self.running = true;
        /* A fresh flag per run: the previous run may still be winding down
         * and polling the old one. */
        self.cancel = Arc::new(AtomicBool::new(false));

        let run_id = self.run_id;
        let evaluator = Arc::clone(&self.evaluator);
        let sink = Arc::clone(&self.sink);
        let cancel = Arc::clone(&self.cancel);
        let completions = self.completions.clone();
        let script = script.to_string();

        log::debug!("ExecutionController: Starting run {run_id}.");
        thread::spawn(move || {
            match evaluator.evaluate(&script, sink.as_ref(), &cancel) {
                Ok(Some(result)) => {
                    sink.append(&result, OutputStyle::Regular);
                    sink.append("\n", OutputStyle::Regular);
                }
                Ok(None) => {}
                Err(e) => {
                    sink.append(&format!("Error: {e}\n"), OutputStyle::Error);
                }
            }
            /* The receiver is gone only during shutdown; nothing left to
             * notify then. */
            let _ = completions.send(ExecutionFinished { run_id });
            log::debug!("ExecutionController: Run {run_id} finished.");
        });
        true
    }

    /*
     * Requests cancellation of the current run and returns to idle
     * immediately, without waiting for the worker to wind down. Returns
     * whether there was a run to stop.
     */
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        log::debug!("ExecutionController: Stopping run {}.", self.run_id);
        self.cancel.store(true, Ordering::SeqCst);
        self.running = false;
        true
    }

    /*
     * Handles a completion notification from a worker. Returns true when it
     * belongs to the current run (the UI should be restored); completions
     * from runs that were already stopped are stale and ignored.
     */
    pub fn on_completed(&mut self, run_id: u64) -> bool {
        if self.running && run_id == self.run_id {
            self.running = false;
            true
        } else {
            log::debug!("ExecutionController: Ignoring stale completion for run {run_id}.");
            false
        }
    }
}
