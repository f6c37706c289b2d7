pub mod db_init;
pub mod market_data;
pub mod quote_source;
pub mod repository;

pub mod cooldown;
pub mod entry_alert;
pub mod schedule;
pub mod transport;
pub mod valuation;

pub mod bot_commands;
pub mod notification_service;
pub mod scheduler;
pub mod settings_service;
