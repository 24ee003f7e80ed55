mod command_input;
mod confirm;
mod form_overlay;
mod input;
mod key_result;
mod panel_controls;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use form_overlay::{FormEvent, FormOverlay};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use panel_controls::PanelControls;
pub use search_input::{SearchEvent, SearchInput};
