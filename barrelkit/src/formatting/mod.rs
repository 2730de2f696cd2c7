//! Terminal formatting for command output.
//!
//! Status lines, section headers and summary boxes share one palette so
//! `collect` and `watch` read the same.

mod headers;
mod output;
mod status;

pub use headers::{print_section_header, SectionStyle};
pub use output::{format_duration, print_key_value, print_summary_box};
pub use status::{print_error, print_success, print_warning};
