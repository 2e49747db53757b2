//! Reading Records

use serde::{Deserialize, Serialize};

/// Sensor sample as supplied by a client, before the store assigns an id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub no: f64,
    pub no2: f64,
    pub nox: f64,
    pub nh3: f64,
    pub co: f64,
    pub benzene: f64,
    pub toluene: f64,
    pub xylene: f64,
    pub aqi: f64,
}

/// Stored row of `aqi_readings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: i64,
    #[sqlx(rename = "NO")]
    pub no: f64,
    #[sqlx(rename = "NO2")]
    pub no2: f64,
    #[sqlx(rename = "NOx")]
    pub nox: f64,
    #[sqlx(rename = "NH3")]
    pub nh3: f64,
    #[sqlx(rename = "CO")]
    pub co: f64,
    #[sqlx(rename = "Benzene")]
    pub benzene: f64,
    #[sqlx(rename = "Toluene")]
    pub toluene: f64,
    #[sqlx(rename = "Xylene")]
    pub xylene: f64,
    #[sqlx(rename = "AQI")]
    pub aqi: f64,
}

#[cfg(test)]
impl Reading {
    /// Sample values without the store-assigned id
    pub fn sample(&self) -> NewReading {
        NewReading {
            no: self.no,
            no2: self.no2,
            nox: self.nox,
            nh3: self.nh3,
            co: self.co,
            benzene: self.benzene,
            toluene: self.toluene,
            xylene: self.xylene,
            aqi: self.aqi,
        }
    }
}
