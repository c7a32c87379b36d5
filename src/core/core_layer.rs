// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "antispam/mod.rs"]
pub mod antispam;

#[path = "moderation/mod.rs"]
pub mod moderation;
