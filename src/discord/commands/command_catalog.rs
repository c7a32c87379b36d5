// Discord commands module.
// Each feature gets its own command file.

pub mod antispam;

pub mod info;

pub mod moderation;

pub mod utility;
