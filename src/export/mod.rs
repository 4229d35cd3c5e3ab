pub mod cache;
pub mod gcal;
pub mod ics;
pub mod term;

pub use cache::PendingSelections;
pub use gcal::{build_events, ClientConfig, GoogleCalendar};
pub use ics::render_ics;
pub use term::Term;
