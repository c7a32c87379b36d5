// Discord adapters for the anti-spam core: event translation and the
// moderation executor.

pub mod executor;
pub mod spam_handler;
