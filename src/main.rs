/*
 * Application entry point: initializes logging, wires the core services
 * (tree store, settings store, script evaluator) into `SnippetAppLogic`,
 * and hands control to the console front-end's event loop.
 */
mod app_logic;
mod core;
mod platform_layer;

use crate::app_logic::SnippetAppLogic;
use crate::core::{
    CoreSettingsStore, CoreTreeStore, OutputSink, OutputStyle, ProcessEvaluator, ScriptEvaluator,
};
use crate::platform_layer::{ConsoleShell, PlatformResult};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::mpsc::channel;

/*
 * Streams execution output to the terminal as it arrives: regular output to
 * stdout, error-styled output to stderr.
 */
struct ConsoleOutputSink;

impl OutputSink for ConsoleOutputSink {
    fn append(&self, text: &str, style: OutputStyle) {
        match style {
            OutputStyle::Regular => {
                print!("{text}");
                let _ = io::stdout().flush();
            }
            OutputStyle::Error => {
                eprint!("{text}");
                let _ = io::stderr().flush();
            }
        }
    }
}

#[cfg(not(windows))]
fn default_evaluator() -> ProcessEvaluator {
    ProcessEvaluator::new("sh", vec!["-s".to_string()])
}

#[cfg(windows)]
fn default_evaluator() -> ProcessEvaluator {
    ProcessEvaluator::new("cmd", vec!["/Q".to_string()])
}

fn main() -> PlatformResult<()> {
    if let Err(e) = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {e}");
    }
    log::debug!("Main: Starting up.");

    let evaluator: Arc<dyn ScriptEvaluator> = Arc::new(default_evaluator());
    let (completion_tx, completion_rx) = channel();

    let mut logic = SnippetAppLogic::new(
        Arc::new(CoreTreeStore::new()),
        Arc::new(CoreSettingsStore::new()),
        evaluator,
        Arc::new(ConsoleOutputSink),
        completion_tx,
    );

    let mut shell = ConsoleShell::new();
    let result = shell.run(&mut logic, completion_rx);
    log::debug!("Main: Event loop exited.");
    result
}
