use serde::{Deserialize, Serialize};

use crate::models::numeric;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_users: i64,
    #[serde(default)]
    pub total_bookings: i64,
    #[serde(default)]
    pub active_drivers: i64,
    #[serde(default, deserialize_with = "numeric::or_zero")]
    pub total_revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountPoint {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenuePoint {
    pub date: String,
    #[serde(default, deserialize_with = "numeric::or_zero")]
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub stats: DashboardStats,
    pub user_growth: Vec<CountPoint>,
    pub bookings_series: Vec<CountPoint>,
    pub revenue_series: Vec<RevenuePoint>,
}
