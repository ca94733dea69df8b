//! Services shared by every fieldlog front end.

mod events;

pub use events::{ConfiguredEventService, EventService};
