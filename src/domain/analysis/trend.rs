use super::statistics::{round, Regression};
use super::{text, AnalysisError, Row};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const CREATED_AT: &str = "created_at";

/// Number of stores opened per month and a linear extrapolation to the next month
///
/// Months are numbered from one in chronological order, months without any openings
/// in between are skipped.
pub fn expansion_trend(rows: &[Row]) -> Result<Value, AnalysisError> {
    let mut monthly: BTreeMap<String, u64> = BTreeMap::new();

    for row in rows {
        let created = text(row, CREATED_AT)?;
        let month = created
            .get(..7)
            .ok_or_else(|| AnalysisError::InvalidDate {
                field: CREATED_AT,
                value: created.clone(),
            })?;

        *monthly.entry(month.to_owned()).or_default() += 1;
    }

    let mut regression = Regression::default();
    for (index, count) in monthly.values().enumerate() {
        regression.add((index + 1) as f64, *count as f64);
    }

    let slope = regression.slope();
    let intercept = regression.intercept();
    let prediction = regression.predict((monthly.len() + 1) as f64);
    let next_month = if prediction.is_finite() {
        (prediction + 0.5).floor() as i64
    } else {
        0
    };

    Ok(json!({
        "monthlyData": monthly,
        "regression": {
            "slope": round(slope, 3),
            "intercept": round(intercept, 2),
            "r": round(regression.r(), 4),
            "rSquared": round(regression.r_squared(), 4),
            "equation": format!("y = {:.3}x + {:.2}", slope, intercept),
        },
        "nextMonthPredict": next_month,
    }))
}

#[cfg(test)]
mod does {
    use super::super::rows;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extrapolate_monthly_openings() {
        let rows = rows(json!([
            {"created_at": "2024-01-05 09:00:00"},
            {"created_at": "2024-02-01"},
            {"created_at": "2024-02-17"},
            {"created_at": "2024-03-02"},
            {"created_at": "2024-03-09"},
            {"created_at": "2024-03-30"},
        ]));

        let result = expansion_trend(&rows).unwrap();

        assert_eq!(
            result,
            json!({
                "monthlyData": {"2024-01": 1, "2024-02": 2, "2024-03": 3},
                "regression": {
                    "slope": 1.0,
                    "intercept": 0.0,
                    "r": 1.0,
                    "rSquared": 1.0,
                    "equation": "y = 1.000x + 0.00",
                },
                "nextMonthPredict": 4,
            })
        );
    }

    #[test]
    fn predict_nothing_from_a_single_month() {
        let rows = rows(json!([{"created_at": "2024-01-05"}]));

        let result = expansion_trend(&rows).unwrap();

        assert_eq!(result["regression"]["slope"], json!(0.0));
        assert_eq!(result["regression"]["equation"], json!("y = NaNx + NaN"));
        assert_eq!(result["nextMonthPredict"], json!(0));
    }

    #[test]
    fn require_creation_dates() {
        let rows = rows(json!([{"created_at": "2024"}, {"province": "北京"}]));

        assert!(matches!(
            expansion_trend(&rows[..1]),
            Err(AnalysisError::InvalidDate { .. })
        ));
        assert_eq!(
            expansion_trend(&rows[1..]),
            Err(AnalysisError::MissingField(CREATED_AT))
        );
    }
}
