/*
 * Defines the script evaluation seam. The execution controller only knows
 * about the `ScriptEvaluator` trait and an `OutputSink` it can stream styled
 * text into; the concrete `ProcessEvaluator` runs the script by piping it to
 * an external interpreter's stdin and forwarding the child's stdout and
 * stderr to the sink as they arrive.
 *
 * Keeping this behind a trait allows tests to substitute a mock evaluator
 * and keeps the controller independent of which interpreter is configured.
 */
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Styling category for a chunk of execution output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStyle {
    Regular,
    Error,
}

/*
 * Receiver for streamed execution output. Implementations must tolerate
 * calls from the worker thread while the UI thread is doing other work.
 */
pub trait OutputSink: Send + Sync {
    fn append(&self, text: &str, style: OutputStyle);
}

#[derive(Debug)]
pub enum EvalError {
    Io(io::Error),
    Failed(String),
}

impl From<io::Error> for EvalError {
    fn from(err: io::Error) -> Self {
        EvalError::Io(err)
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Io(e) => write!(f, "I/O error: {e}"),
            EvalError::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Io(e) => Some(e),
            EvalError::Failed(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

/*
 * Evaluates a script, streaming output into `sink` as it is produced.
 * `cancel` is polled during evaluation; once it is raised the evaluator
 * stops as soon as it can. Returns `Ok(Some(text))` when evaluation
 * produced a final result value to display, `Ok(None)` when it completed
 * (or was cancelled) without one.
 */
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(&self, script: &str, sink: &dyn OutputSink, cancel: &AtomicBool)
    -> Result<Option<String>>;
}

/// How often the child process is polled for exit and cancellation.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);

/*
 * Runs scripts through an external interpreter process. The script text is
 * written to the child's stdin; stdout lines go to the sink as regular
 * output and stderr lines as error output.
 */
pub struct ProcessEvaluator {
    program: String,
    args: Vec<String>,
}

impl ProcessEvaluator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        ProcessEvaluator {
            program: program.into(),
            args,
        }
    }
}

/*
 * Forwards every line from `reader` to the sink under the given style.
 * Runs on its own thread so stdout and stderr drain concurrently and the
 * child never blocks on a full pipe.
 */
fn pump_lines(reader: impl io::Read, sink: &dyn OutputSink, style: OutputStyle) {
    let buffered = BufReader::new(reader);
    for line in buffered.lines() {
        match line {
            Ok(text) => {
                sink.append(&text, style);
                sink.append("\n", style);
            }
            Err(e) => {
                log::debug!("ProcessEvaluator: Output pipe closed: {e}");
                break;
            }
        }
    }
}

impl ScriptEvaluator for ProcessEvaluator {
    fn evaluate(
        &self,
        script: &str,
        sink: &dyn OutputSink,
        cancel: &AtomicBool,
    ) -> Result<Option<String>> {
        log::debug!(
            "ProcessEvaluator: Starting interpreter {:?} with {} arg(s).",
            self.program,
            self.args.len()
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let script_text = script.to_string();

        let status = thread::scope(|scope| -> Result<std::process::ExitStatus> {
            if let Some(mut pipe) = stdin {
                scope.spawn(move || {
                    /* Ignore a broken pipe: the child may exit before
                     * consuming the whole script. */
                    if let Err(e) = pipe.write_all(script_text.as_bytes()) {
                        log::debug!("ProcessEvaluator: Failed to write script to stdin: {e}");
                    }
                    // Dropping the pipe closes stdin so the interpreter sees EOF.
                });
            }
            if let Some(pipe) = stdout {
                scope.spawn(move || pump_lines(pipe, sink, OutputStyle::Regular));
            }
            if let Some(pipe) = stderr {
                scope.spawn(move || pump_lines(pipe, sink, OutputStyle::Error));
            }

            loop {
                if cancel.load(Ordering::SeqCst) {
                    log::debug!("ProcessEvaluator: Cancellation requested, killing child.");
                    if let Err(e) = child.kill() {
                        log::warn!("ProcessEvaluator: Failed to kill child process: {e}");
                    }
                    let status = child.wait()?;
                    return Ok(status);
                }
                match child.try_wait()? {
                    Some(status) => return Ok(status),
                    None => thread::sleep(CHILD_POLL_INTERVAL),
                }
            }
        })?;

        if cancel.load(Ordering::SeqCst) {
            log::debug!("ProcessEvaluator: Evaluation cancelled.");
            return Ok(None);
        }
        if status.success() {
            Ok(None)
        } else {
            Err(EvalError::Failed(format!(
                "Interpreter exited with status {status}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) struct CollectingSink {
        pub chunks: Mutex<Vec<(String, OutputStyle)>>,
    }

    impl CollectingSink {
        pub fn new() -> Self {
            CollectingSink {
                chunks: Mutex::new(Vec::new()),
            }
        }

        pub fn text_with_style(&self, style: OutputStyle) -> String {
            self.chunks
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, s)| *s == style)
                .map(|(t, _)| t.as_str())
                .collect()
        }
    }

    impl OutputSink for CollectingSink {
        fn append(&self, text: &str, style: OutputStyle) {
            self.chunks.lock().unwrap().push((text.to_string(), style));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_process_evaluator_streams_stdout_and_stderr() {
        let evaluator = ProcessEvaluator::new("sh", vec!["-s".to_string()]);
        let sink = CollectingSink::new();
        let cancel = AtomicBool::new(false);

        let result = evaluator.evaluate("echo hello\necho oops >&2\n", &sink, &cancel);
        assert!(result.is_ok());
        assert_eq!(sink.text_with_style(OutputStyle::Regular), "hello\n");
        assert_eq!(sink.text_with_style(OutputStyle::Error), "oops\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_process_evaluator_nonzero_exit_is_error() {
        let evaluator = ProcessEvaluator::new("sh", vec!["-s".to_string()]);
        let sink = CollectingSink::new();
        let cancel = AtomicBool::new(false);

        let result = evaluator.evaluate("exit 3\n", &sink, &cancel);
        assert!(matches!(result, Err(EvalError::Failed(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_evaluator_cancellation_kills_child() {
        let evaluator = ProcessEvaluator::new("sh", vec!["-s".to_string()]);
        let sink = CollectingSink::new();
        let cancel = AtomicBool::new(true); // Cancelled before it even starts.

        let result = evaluator.evaluate("sleep 30\n", &sink, &cancel);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_process_evaluator_missing_interpreter_is_io_error() {
        let evaluator = ProcessEvaluator::new("definitely_not_an_interpreter_xyz", vec![]);
        let sink = CollectingSink::new();
        let cancel = AtomicBool::new(false);

        let result = evaluator.evaluate("anything", &sink, &cancel);
        assert!(matches!(result, Err(EvalError::Io(_))));
    }
}
