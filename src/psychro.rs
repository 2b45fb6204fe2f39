//! Relative humidity from absolute humidity and temperature.
//!
//! The boards report absolute humidity computed from their own relative
//! humidity reading as `AH = (VP * 100 * 18.016) / (8.314 * (T + 273.15))`.
//! These functions invert that relation. Non-finite results are returned
//! as-is; display code decides how to render them.

/// Universal gas constant, J/(mol·K).
const GAS_CONSTANT: f64 = 8.314;
/// Molar mass of water, g/mol.
const WATER_MOLAR_MASS: f64 = 18.016;
const KELVIN_OFFSET: f64 = 273.15;

// Magnus-Tetens coefficients (hPa, °C).
const MAGNUS_BASE_HPA: f64 = 6.112;
const MAGNUS_A: f64 = 17.67;
const MAGNUS_B: f64 = 243.5;

/// Actual vapor pressure in hPa.
pub fn vapor_pressure(temperature_c: f64, absolute_humidity: f64) -> f64 {
    (absolute_humidity * GAS_CONSTANT * (temperature_c + KELVIN_OFFSET))
        / (100.0 * WATER_MOLAR_MASS)
}

/// Saturation vapor pressure over water in hPa.
pub fn saturation_vapor_pressure(temperature_c: f64) -> f64 {
    MAGNUS_BASE_HPA * ((MAGNUS_A * temperature_c) / (temperature_c + MAGNUS_B)).exp()
}

/// Relative humidity in percent.
pub fn relative_humidity(temperature_c: f64, absolute_humidity: f64) -> f64 {
    let vp = vapor_pressure(temperature_c, absolute_humidity);
    let svp = saturation_vapor_pressure(temperature_c);
    (vp / svp) * 100.0
}
