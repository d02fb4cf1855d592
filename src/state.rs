use std::sync::Arc;

use crate::services::scheduler::BookingScheduler;

pub struct AppState {
    pub scheduler: Arc<BookingScheduler>,
}
