pub mod booking;
pub mod business_hours;
pub mod package;
pub mod pricing;
pub mod provider;
pub mod recurring;
pub mod service;
pub mod waitlist;

pub use booking::{Booking, BookingStatus};
pub use business_hours::{BusinessHours, TimeSlot};
pub use package::Package;
pub use pricing::{AdjustmentKind, PriceAdjustment, PriceQuote};
pub use provider::Provider;
pub use recurring::{Frequency, RecurringSeries};
pub use service::{Service, MAX_DURATION_MINUTES};
pub use waitlist::{WaitlistEntry, WaitlistStatus};
