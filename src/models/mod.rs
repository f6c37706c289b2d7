pub mod user;
pub mod holding;
pub mod notification_settings;
pub mod trading_goals;

pub use user::{CurrentUser, User};
pub use holding::{Holding, PortfolioType};
pub use notification_settings::{DailySchedule, MonthlySchedule, NotificationSettings, WeeklySchedule};
pub use trading_goals::{ProfitEntries, TradingGoals};
