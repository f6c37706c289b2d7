pub mod format;
pub mod messages;
