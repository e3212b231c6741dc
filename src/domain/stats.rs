use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationCounts {
    pub past_vacations: i64,
    pub ongoing_vacations: i64,
    pub future_vacations: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationLikes {
    pub destination: String,
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub vacation_stats: VacationCounts,
    pub total_users: i64,
    pub total_likes: i64,
    pub top_destinations: Vec<DestinationLikes>,
}

/// Number of destinations carried by the dashboard summary.
pub const TOP_DESTINATIONS: i64 = 10;
