//! 应用状态定义

use std::sync::Arc;

use crate::service::BookingService;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub booking: Arc<BookingService>,
}

impl AppState {
    pub fn new(booking: Arc<BookingService>) -> Self {
        Self { booking }
    }
}
