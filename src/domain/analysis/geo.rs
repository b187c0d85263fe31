use super::statistics::{round, Sample};
use super::{number, AnalysisError, Row};
use serde_json::{json, Value};

/// Center and spread of the store coordinates
pub fn geographic_dispersion(rows: &[Row]) -> Result<Value, AnalysisError> {
    let latitudes: Sample = rows
        .iter()
        .map(|row| number(row, "latitude"))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .collect();

    let longitudes: Sample = rows
        .iter()
        .map(|row| number(row, "longitude"))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .collect();

    let iqr = |sample: &Sample| sample.percentile(75.0) - sample.percentile(25.0);

    Ok(json!({
        "center": {
            "lat": round(latitudes.mean(), 6),
            "lng": round(longitudes.mean(), 6),
        },
        "stdLat": round(latitudes.standard_deviation(), 4),
        "stdLng": round(longitudes.standard_deviation(), 4),
        "iqrLat": round(iqr(&latitudes), 4),
        "iqrLng": round(iqr(&longitudes), 4),
    }))
}

#[cfg(test)]
mod does {
    use super::super::rows;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn locate_the_center() {
        let rows = rows(json!([
            {"latitude": "30", "longitude": 110},
            {"latitude": "32", "longitude": "120"},
        ]));

        let result = geographic_dispersion(&rows).unwrap();

        assert_eq!(result["center"], json!({"lat": 31.0, "lng": 115.0}));
        assert_eq!(result["stdLat"], json!(1.4142));
        assert_eq!(result["iqrLng"], json!(10.0));
    }

    #[test]
    fn require_coordinates() {
        let rows = rows(json!([{"latitude": "30"}]));

        assert_eq!(
            geographic_dispersion(&rows),
            Err(AnalysisError::MissingField("longitude"))
        );
    }
}
