pub mod console;
pub mod error;
pub mod types;

pub use console::ConsoleShell;
pub use error::Result as PlatformResult;
pub use types::{
    AppEvent, PlatformCommand, PlatformEventHandler, RenameKind, TreeItemDescriptor, TreeItemId,
};
