pub mod home_controller;
pub mod telegram_controller;
