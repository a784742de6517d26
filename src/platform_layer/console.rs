/*
 * A minimal console front-end driving the event loop. It translates typed
 * commands into `AppEvent`s, hands them to the `PlatformEventHandler`, and
 * renders the returned `PlatformCommand`s to the terminal. Worker completion
 * notifications arrive on an mpsc channel and are injected into the handler
 * as `ExecutionCompleted` events between commands.
 *
 * Stdin is read on a helper thread so the loop can interleave user input
 * with completion notifications instead of blocking on the terminal.
 */
use super::error::{PlatformError, Result};
use super::types::{
    AppEvent, PlatformCommand, PlatformEventHandler, RenameKind, TreeItemDescriptor, TreeItemId,
};
use crate::core::ExecutionFinished;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::thread;
use std::time::Duration;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const HELP_TEXT: &str = "Commands:
  tree                      show the snippet tree
  select <id> | deselect    change the selected node
  edit <text>               replace the edit buffer (\\n for newlines)
  new                       add a child node under the selection
  delete                    delete the selected node
  rename <name>             rename the selected node
  rename-date | rename-time | rename-datetime
  move <id> <parent> <idx>  move a node
  run | stop                execute / stop the current script
  newfile                   start a fresh tree
  open <path> | save | saveas <path>
  help | quit";

pub struct ConsoleShell {
    tree_items: Vec<TreeItemDescriptor>,
    buffer: String,
    selected: Option<TreeItemId>,
    title: String,
    quit_requested: bool,
}

impl ConsoleShell {
    pub fn new() -> Self {
        ConsoleShell {
            tree_items: Vec::new(),
            buffer: String::new(),
            selected: None,
            title: String::new(),
            quit_requested: false,
        }
    }

    /*
     * Runs the event loop until the handler requests quit or stdin closes.
     * `completions` carries finished-run notifications from worker threads.
     */
    pub fn run(
        &mut self,
        handler: &mut dyn PlatformEventHandler,
        completions: Receiver<ExecutionFinished>,
    ) -> Result<()> {
        let lines = spawn_stdin_reader()?;

        self.dispatch(handler, AppEvent::MainWindowReady);
        self.print_prompt();

        while !self.quit_requested {
            self.drain_completions(handler, &completions);

            match lines.recv_timeout(INPUT_POLL_INTERVAL) {
                Ok(line) => {
                    self.handle_line(handler, line.trim());
                    if !self.quit_requested {
                        self.print_prompt();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("ConsoleShell: Stdin closed, shutting down.");
                    self.dispatch(handler, AppEvent::WindowCloseRequested {
                        buffer: self.buffer.clone(),
                    });
                    break;
                }
            }
        }

        handler.on_quit();
        Ok(())
    }

    fn print_prompt(&self) {
        print!("{}> ", self.title);
        let _ = io::stdout().flush();
    }

    fn drain_completions(
        &mut self,
        handler: &mut dyn PlatformEventHandler,
        completions: &Receiver<ExecutionFinished>,
    ) {
        while let Ok(finished) = completions.try_recv() {
            self.dispatch(handler, AppEvent::ExecutionCompleted {
                run_id: finished.run_id,
            });
        }
    }

    fn handle_line(&mut self, handler: &mut dyn PlatformEventHandler, line: &str) {
        let (command, rest) = match line.split_once(' ') {
            Some((head, tail)) => (head, tail.trim()),
            None => (line, ""),
        };

        let event = match command {
            "" => return,
            "help" => {
                println!("{HELP_TEXT}");
                return;
            }
            "tree" => {
                self.print_tree();
                return;
            }
            "quit" => {
                self.quit_requested = true;
                Some(AppEvent::WindowCloseRequested {
                    buffer: self.buffer.clone(),
                })
            }
            "select" => match rest.parse::<u64>() {
                Ok(id) => Some(AppEvent::TreeSelectionChanged {
                    item: Some(TreeItemId(id)),
                    buffer: self.buffer.clone(),
                }),
                Err(_) => {
                    println!("Usage: select <id>");
                    None
                }
            },
            "deselect" => {
                // No confirming command comes back for a cleared selection.
                self.selected = None;
                Some(AppEvent::TreeSelectionChanged {
                    item: None,
                    buffer: self.buffer.clone(),
                })
            }
            "edit" => {
                self.buffer = rest.replace("\\n", "\n");
                println!("(buffer is now {} byte(s))", self.buffer.len());
                None
            }
            "new" => Some(AppEvent::NewNodeRequested),
            "delete" => Some(AppEvent::DeleteNodeRequested),
            "rename" => Some(AppEvent::RenameNodeRequested {
                kind: RenameKind::Custom(rest.to_string()),
            }),
            "rename-date" => Some(AppEvent::RenameNodeRequested {
                kind: RenameKind::CurrentDate,
            }),
            "rename-time" => Some(AppEvent::RenameNodeRequested {
                kind: RenameKind::CurrentTime,
            }),
            "rename-datetime" => Some(AppEvent::RenameNodeRequested {
                kind: RenameKind::CurrentDateTime,
            }),
            "move" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                let parsed = match parts.as_slice() {
                    [item, parent, index] => {
                        match (item.parse(), parent.parse(), index.parse()) {
                            (Ok(item), Ok(parent), Ok(index)) => Some((item, parent, index)),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                match parsed {
                    Some((item, parent, index)) => Some(AppEvent::MoveNodeRequested {
                        item: TreeItemId(item),
                        new_parent: TreeItemId(parent),
                        index,
                    }),
                    None => {
                        println!("Usage: move <id> <parent-id> <index>");
                        None
                    }
                }
            }
            "run" => Some(AppEvent::ExecuteRequested {
                buffer: self.buffer.clone(),
            }),
            "stop" => Some(AppEvent::StopRequested),
            "newfile" => Some(AppEvent::NewFileRequested {
                buffer: self.buffer.clone(),
            }),
            "open" => Some(AppEvent::OpenFileRequested {
                path: PathBuf::from(rest),
                buffer: self.buffer.clone(),
            }),
            "save" => Some(AppEvent::SaveRequested {
                buffer: self.buffer.clone(),
            }),
            "saveas" => Some(AppEvent::SaveAsRequested {
                path: PathBuf::from(rest),
                buffer: self.buffer.clone(),
            }),
            other => {
                println!("Unknown command '{other}'. Type 'help' for a list.");
                None
            }
        };

        if let Some(event) = event {
            self.dispatch(handler, event);
        }
    }

    fn dispatch(&mut self, handler: &mut dyn PlatformEventHandler, event: AppEvent) {
        log::trace!("ConsoleShell: Dispatching event {event:?}");
        for command in handler.handle_event(event) {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: PlatformCommand) {
        log::trace!("ConsoleShell: Applying command {command:?}");
        match command {
            PlatformCommand::PopulateTree { items } => {
                self.tree_items = items;
            }
            PlatformCommand::SelectTreeItem { item } => {
                self.selected = Some(item);
            }
            PlatformCommand::SetBufferText { text } => {
                self.buffer = text;
            }
            PlatformCommand::ClearOutput => {
                println!("--- output cleared ---");
            }
            PlatformCommand::SetExecuteEnabled { enabled } => {
                log::debug!("ConsoleShell: Execute enabled = {enabled}");
            }
            PlatformCommand::SetStopEnabled { enabled } => {
                log::debug!("ConsoleShell: Stop enabled = {enabled}");
            }
            PlatformCommand::SetWindowTitle { title } => {
                self.title = title;
            }
            PlatformCommand::ShowWarning { message } => {
                println!("Warning: {message}");
            }
            PlatformCommand::QuitApplication => {
                self.quit_requested = true;
            }
        }
    }

    fn print_tree(&self) {
        for item in &self.tree_items {
            self.print_item(item, 0);
        }
    }

    fn print_item(&self, item: &TreeItemDescriptor, depth: usize) {
        let marker = if self.selected == Some(item.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{}{} [{}] {}",
            "  ".repeat(depth),
            marker,
            item.id.0,
            item.text
        );
        for child in &item.children {
            self.print_item(child, depth + 1);
        }
    }
}

impl Default for ConsoleShell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a scripted command list for each handled event.
    struct ScriptedHandler {
        responses: Vec<Vec<PlatformCommand>>,
        events: Vec<AppEvent>,
    }

    impl ScriptedHandler {
        fn new(responses: Vec<Vec<PlatformCommand>>) -> Self {
            ScriptedHandler {
                responses,
                events: Vec::new(),
            }
        }
    }

    impl PlatformEventHandler for ScriptedHandler {
        fn handle_event(&mut self, event: AppEvent) -> Vec<PlatformCommand> {
            self.events.push(event);
            if self.responses.is_empty() {
                Vec::new()
            } else {
                self.responses.remove(0)
            }
        }
    }

    #[test]
    fn test_select_command_updates_shell_selection_and_buffer() {
        let mut shell = ConsoleShell::new();
        let mut handler = ScriptedHandler::new(vec![vec![
            PlatformCommand::SelectTreeItem {
                item: TreeItemId(2),
            },
            PlatformCommand::SetBufferText {
                text: "echo two".to_string(),
            },
        ]]);

        shell.handle_line(&mut handler, "select 2");

        assert_eq!(handler.events, vec![AppEvent::TreeSelectionChanged {
            item: Some(TreeItemId(2)),
            buffer: String::new(),
        }]);
        assert_eq!(shell.selected, Some(TreeItemId(2)));
        assert_eq!(shell.buffer, "echo two");
    }

    #[test]
    fn test_rejected_select_leaves_shell_selection_unchanged() {
        let mut shell = ConsoleShell::new();
        shell.selected = Some(TreeItemId(1));
        // The handler ignores the selection: no commands come back.
        let mut handler = ScriptedHandler::new(vec![Vec::new()]);

        shell.handle_line(&mut handler, "select 999");
        assert_eq!(shell.selected, Some(TreeItemId(1)));
    }

    #[test]
    fn test_deselect_clears_shell_selection() {
        let mut shell = ConsoleShell::new();
        shell.selected = Some(TreeItemId(2));
        let mut handler = ScriptedHandler::new(vec![vec![PlatformCommand::SetBufferText {
            text: String::new(),
        }]]);

        shell.handle_line(&mut handler, "deselect");
        assert_eq!(shell.selected, None);
    }
}

fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = channel();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(text) => {
                        if tx.send(text).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("ConsoleShell: Failed to read stdin: {e}");
                        break;
                    }
                }
            }
        })
        .map_err(|e| PlatformError::InitializationFailed(format!("stdin reader: {e}")))?;
    Ok(rx)
}
