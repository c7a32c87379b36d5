// Core moderation module - moderator-issued warnings.
// Following the same pattern as the antispam module.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
