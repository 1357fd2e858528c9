pub mod clipboard;
pub mod collab;
pub mod edit_buffer;
pub mod editor;
pub mod error;
pub mod events;
pub mod mode;
pub mod navigation;
pub mod validation;

pub use clipboard::{ClipboardPayload, PasteOutcome, PasteSummary};
pub use collab::{CellValidator, ClipboardSource, NewRow, RowCreation, RowCreator, RowDeleter, RowTicket, SaveHandler};
pub use edit_buffer::{CommitOutcome, EditBuffer, EditRecord};
pub use editor::{display_options, GridEditor};
pub use error::GridError;
pub use events::GridEvent;
pub use mode::{CursorPlacement, EditMode};
pub use navigation::{Key, Modifiers, NavEffect, NavEvent, NavState, NavigationController};
pub use validation::{ValidationGateway, ValidationResult};
