/// Looks up all stores of a city, expects a `city` parameter
pub const GET_STORE_BY_CITY: &str = "get_store_by_city";
/// Statistics over the daily business hours of all stores
pub const BUSINESS_HOURS_ANALYSIS: &str = "business_hours_analysis";
/// Monthly store openings with a linear trend
pub const EXPANSION_TREND: &str = "expansion_trend";
/// Center and spread of the store locations
pub const GEOGRAPHIC_DISPERSION: &str = "geographic_dispersion";
/// Business hours ranked by province
pub const HOURS_VS_AGE_CORRELATION: &str = "hours_vs_age_correlation";

/// Actions which operate on the complete list of located stores
pub const ANALYSIS_ACTIONS: [&str; 4] = [
    BUSINESS_HOURS_ANALYSIS,
    EXPANSION_TREND,
    GEOGRAPHIC_DISPERSION,
    HOURS_VS_AGE_CORRELATION,
];
