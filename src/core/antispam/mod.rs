// Core anti-spam module - sliding-window tracking, violation scoring and
// punishment escalation. Pure domain logic behind storage/executor ports.

pub mod activity_window;
pub mod antispam_models;
pub mod antispam_service;
pub mod clock;
pub mod escalation;
pub mod feature_extract;
pub mod violation_scorer;

pub use activity_window::*;
pub use antispam_models::*;
pub use antispam_service::*;
pub use clock::*;
pub use escalation::*;
pub use violation_scorer::*;
