pub mod footer;
pub mod header;
pub mod table;
pub mod utils;

pub use footer::{draw_footer, draw_notification};
pub use header::draw_header;
pub use table::{header_line, row_line};
pub use utils::{centered_rect, level_color, pad, status_color, truncate};
