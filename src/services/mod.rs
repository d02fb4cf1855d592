pub mod availability;
pub mod clock;
pub mod locks;
pub mod notifications;
pub mod pricing;
pub mod recurrence;
pub mod scheduler;
pub mod waitlist;
