pub mod alerts;
pub mod cache;
pub mod clock;
pub mod fare;
pub mod notifier;
pub mod range;
