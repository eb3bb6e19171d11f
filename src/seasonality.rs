use crate::error::{Result, SyntheticLedgerError};
use crate::schema::SeasonalityProfile;

/// Resolves a profile into 12 multiplicative monthly factors, January first.
/// Factors scale the base monthly revenue target directly.
pub fn profile_factors(profile: &SeasonalityProfile) -> Result<Vec<f64>> {
    let factors = match profile {
        SeasonalityProfile::Standard => {
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.8, 0.8, 1.0, 1.3, 1.3, 1.3]
        }

        SeasonalityProfile::Flat => vec![1.0; 12],

        SeasonalityProfile::Custom(ref custom) => {
            validate_custom_factors(custom)?;
            custom.clone()
        }
    };

    Ok(factors)
}

fn validate_custom_factors(factors: &[f64]) -> Result<()> {
    if factors.len() != 12 {
        return Err(SyntheticLedgerError::InvalidSeasonalityWeights(format!(
            "Expected 12 factors, got {}",
            factors.len()
        )));
    }

    if factors.iter().any(|&f| !f.is_finite() || f <= 0.0) {
        return Err(SyntheticLedgerError::InvalidSeasonalityWeights(
            "All factors must be finite and positive".to_string(),
        ));
    }

    Ok(())
}

/// Compound growth applied per completed simulation year.
pub fn growth_multiplier(annual_growth: f64, year_index: i32) -> f64 {
    (1.0 + annual_growth).powi(year_index)
}
