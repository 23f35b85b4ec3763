//! Contact conduction between touching spheres
//!
//! ```text
//! k(T) = k_base + 0.000425 · (T - 273.15)
//! hc   = 4 · k_i · k_j / (k_i + k_j) · sqrt(A_contact)
//! Q    = (T_j - T_i) · hc
//! ```
//!
//! `Q` is the heat received by particle i; particle j receives `-Q`.

/// Conductivities below this produce a zero heat-transfer coefficient.
pub const SMALL_CONDUCTIVITY: f64 = 1.0e-6;

/// Linear temperature coefficient of conductivity (W/(m·K²))
pub const CONDUCTIVITY_TEMPERATURE_COEFF: f64 = 0.000425;

/// Temperature at which the base conductivity applies (K)
pub const CONDUCTIVITY_REFERENCE_TEMPERATURE: f64 = 273.15;

/// Conductivity at `temperature` given the base value of the particle's type.
#[inline]
pub fn corrected_conductivity(base: f64, temperature: f64) -> f64 {
    base + CONDUCTIVITY_TEMPERATURE_COEFF * (temperature - CONDUCTIVITY_REFERENCE_TEMPERATURE)
}

/// Heat-transfer coefficient of a contact.
#[inline]
pub fn heat_transfer_coefficient(k_i: f64, k_j: f64, contact_area: f64) -> f64 {
    if k_i < SMALL_CONDUCTIVITY || k_j < SMALL_CONDUCTIVITY {
        0.0
    } else {
        4.0 * k_i * k_j / (k_i + k_j) * contact_area.sqrt()
    }
}

/// Heat flowing into particle i.
#[inline]
pub fn conduction_flux(temp_i: f64, temp_j: f64, hc: f64) -> f64 {
    (temp_j - temp_i) * hc
}
