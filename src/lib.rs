pub mod app;
pub mod appsettings;
pub mod clock;
pub mod collection;
pub mod draft;
pub mod error;
pub mod reminder;
pub mod scheduling;
pub mod storage;
