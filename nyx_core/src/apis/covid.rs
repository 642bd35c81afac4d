use serde::Deserialize;

use super::{check_status, ApiError};

const DISEASE_SH: &str = "https://disease.sh/v3/covid-19";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CovidStats {
    /// Absent for the global summary.
    pub country: Option<String>,
    pub country_info: Option<CountryInfo>,
    pub cases: u64,
    pub today_cases: u64,
    pub deaths: u64,
    pub today_deaths: u64,
    pub recovered: u64,
    pub active: u64,
    pub critical: u64,
    pub tests: u64,
    pub population: u64,
    /// Milliseconds since the unix epoch.
    pub updated: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryInfo {
    pub flag: Option<String>,
}

impl CovidStats {
    #[must_use]
    pub fn title(&self) -> String {
        match &self.country {
            Some(country) => format!("COVID-19 in {country}"),
            None => "COVID-19 worldwide".to_owned(),
        }
    }

    /// Deaths per confirmed case, as a percentage.
    #[must_use]
    pub fn fatality_rate(&self) -> f64 {
        if self.cases == 0 {
            return 0.0;
        }
        self.deaths as f64 / self.cases as f64 * 100.0
    }
}

/// Global statistics when `country` is `None`.
pub async fn stats(
    client: &reqwest::Client,
    country: Option<&str>,
) -> Result<CovidStats, ApiError> {
    let url = match country.map(str::trim).filter(|c| !c.is_empty()) {
        Some(country) => {
            if !country
                .chars()
                .all(|c| c.is_alphanumeric() || c == ' ' || c == '-')
            {
                return Err(ApiError::Invalid(format!("`{country}` is not a country.")));
            }
            format!("{DISEASE_SH}/countries/{country}?strict=false")
        }
        None => format!("{DISEASE_SH}/all"),
    };

    let response = client.get(url).send().await?;
    Ok(check_status(response)?.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_country() {
        let stats: CovidStats = serde_json::from_str(
            r#"{
                "updated": 1700000000000, "country": "Japan",
                "countryInfo": {"_id": 392, "flag": "https://disease.sh/assets/img/flags/jp.png"},
                "cases": 1000, "todayCases": 3, "deaths": 25, "todayDeaths": 0,
                "recovered": 900, "active": 75, "critical": 2, "tests": 5000,
                "population": 125000000
            }"#,
        )
        .unwrap();

        assert_eq!(stats.title(), "COVID-19 in Japan");
        assert!((stats.fatality_rate() - 2.5).abs() < 1e-9);
        assert!(stats.country_info.unwrap().flag.is_some());
    }

    #[test]
    fn decodes_global_summary() {
        let stats: CovidStats = serde_json::from_str(
            r#"{
                "updated": 1700000000000, "cases": 0, "todayCases": 0, "deaths": 0,
                "todayDeaths": 0, "recovered": 0, "active": 0, "critical": 0,
                "tests": 0, "population": 8000000000, "affectedCountries": 231
            }"#,
        )
        .unwrap();

        assert_eq!(stats.title(), "COVID-19 worldwide");
        assert!(stats.fatality_rate().abs() < f64::EPSILON);
    }
}
