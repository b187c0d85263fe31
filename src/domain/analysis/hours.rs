use super::statistics::{round, Sample};
use super::{business_hours, text, AnalysisError, Row};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Distribution of the daily business hours of all stores
pub fn business_hours_analysis(rows: &[Row]) -> Result<Value, AnalysisError> {
    let hours = rows
        .iter()
        .map(business_hours)
        .collect::<Result<Vec<_>, _>>()?;

    let sample: Sample = hours.into_iter().collect();
    let q1 = sample.percentile(25.0);
    let q3 = sample.percentile(75.0);

    Ok(json!({
        "avgHours": round(sample.mean(), 2),
        "medianHours": round(sample.percentile(50.0), 2),
        "modeHours": sample.modes(),
        "stdDev": round(sample.standard_deviation(), 2),
        "q1": round(q1, 2),
        "q3": round(q3, 2),
        "iqr": round(q3 - q1, 2),
        "p90": round(sample.percentile(90.0), 2),
        "p95": round(sample.percentile(95.0), 2),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvinceHours {
    province: String,
    avg_hours: f64,
    store_count: usize,
    total_hours: f64,
    min_hours: f64,
    max_hours: f64,
}

/// Business hours per province, ranked by their average
///
/// Stores whose hours can not be determined or amount to zero are left out. Provinces without
/// any remaining store are omitted.
pub fn hours_vs_age_correlation(rows: &[Row]) -> Result<Value, AnalysisError> {
    let mut provinces: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for row in rows {
        let province = text(row, "province")?;
        let hours = provinces.entry(province).or_default();

        if let Ok(h) = business_hours(row) {
            if h > 0.0 {
                hours.push(h);
            }
        }
    }

    let mut stats: Vec<ProvinceHours> = provinces
        .into_iter()
        .filter(|(_, hours)| !hours.is_empty())
        .map(|(province, hours)| {
            let total: f64 = hours.iter().sum();

            ProvinceHours {
                province,
                avg_hours: round(total / hours.len() as f64, 2),
                store_count: hours.len(),
                total_hours: round(total, 2),
                min_hours: hours.iter().copied().fold(f64::INFINITY, f64::min),
                max_hours: hours.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.avg_hours.total_cmp(&a.avg_hours));

    let chart = json!([{
        "labels": stats.iter().map(|s| s.province.as_str()).collect::<Vec<_>>(),
        "data": stats.iter().map(|s| s.avg_hours).collect::<Vec<_>>(),
        "title": "各省平均营业时间对比",
        "xAxisLabel": "省份",
        "yAxisLabel": "平均营业时间 (小时)",
    }]);

    let summary = match (stats.first(), stats.last()) {
        (Some(highest), Some(lowest)) => {
            let averages: Sample = stats.iter().map(|s| s.avg_hours).collect();

            json!({
                "totalProvinces": stats.len(),
                "totalStores": stats.iter().map(|s| s.store_count).sum::<usize>(),
                "nationalAvgHours": round(averages.mean(), 2),
                "maxAvgProvince": highest.province,
                "maxAvgHours": highest.avg_hours,
                "minAvgProvince": lowest.province,
                "minAvgHours": lowest.avg_hours,
            })
        }
        _ => json!({}),
    };

    Ok(json!({
        "provinces": stats,
        "chartData": chart,
        "summary": summary,
    }))
}
