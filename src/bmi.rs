//! BMI arithmetic and classification.
//!
//! Weight is entered in kilograms and height in centimeters; the index is
//! weight divided by height in meters squared, kept as [`Decimal`] end to
//! end so 24.25 does not turn into 24.249999.

use rust_decimal::{Decimal, RoundingStrategy};
use strum::{Display, EnumString};

/// Inclusive upper bound for age input.
pub const MAX_AGE: u32 = 120;
/// Inclusive upper bound for weight input (kg).
pub const MAX_WEIGHT_KG: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
/// Inclusive upper bound for height input (cm).
pub const MAX_HEIGHT_CM: Decimal = Decimal::from_parts(300, 0, 0, false, 0);

/// BMI classification per the fixed WHO-style thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum BmiCategory {
    /// BMI below 18.5.
    Underweight,
    /// BMI in [18.5, 25).
    Normal,
    /// BMI in [25, 30).
    Overweight,
    /// BMI of 30 or above.
    Obese,
}

impl BmiCategory {
    /// Classify a BMI value. Boundaries belong to the upper class:
    /// 18.5 is Normal, 25.0 is Overweight, 30.0 is Obese.
    pub fn classify(bmi: Decimal) -> Self {
        let normal_floor = Decimal::new(185, 1);
        let overweight_floor = Decimal::new(25, 0);
        let obese_floor = Decimal::new(30, 0);

        if bmi < normal_floor {
            BmiCategory::Underweight
        } else if bmi < overweight_floor {
            BmiCategory::Normal
        } else if bmi < obese_floor {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

/// A computed BMI value with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BmiResult {
    /// Index value, rounded to one fraction digit.
    pub value: Decimal,
    /// Classification of the rounded value.
    pub category: BmiCategory,
}

/// Compute BMI from weight in kilograms and height in centimeters.
///
/// The value is rounded half-away-from-zero to one fraction digit and the
/// category is taken from the rounded value, so what the user sees is what
/// gets classified. Returns `None` for non-positive height.
pub fn compute_bmi(weight_kg: Decimal, height_cm: Decimal) -> Option<BmiResult> {
    if height_cm <= Decimal::ZERO || weight_kg <= Decimal::ZERO {
        return None;
    }

    let height_m = height_cm / Decimal::ONE_HUNDRED;
    let value = (weight_kg / (height_m * height_m))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);

    Some(BmiResult {
        value,
        category: BmiCategory::classify(value),
    })
}
