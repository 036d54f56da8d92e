use crate::error::AppError;

const CENT: f64 = 0.005;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Moves a total from one toll to another: `total - old_toll + new_toll`.
pub fn reprice_for_toll(total: f64, old_toll: f64, new_toll: f64) -> f64 {
    round2(total - old_toll + new_toll)
}

/// Parses a money field from a form. Empty input means "not given".
pub fn parse_amount(field: &str, raw: &str) -> Result<Option<f64>, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(AppError::Validation(format!("{field} must be a number"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareEdit {
    pub toll: Option<f64>,
    pub price_total: Option<f64>,
}

/// Reconciles the toll and total submitted from the booking edit surface.
///
/// A changed toll carries the total along with it unless the total itself was
/// edited in the same submission, in which case the typed total stands.
pub fn resolve_fare_edit(
    stored_toll: Option<f64>,
    stored_total: Option<f64>,
    toll_input: &str,
    total_input: &str,
) -> Result<FareEdit, AppError> {
    let toll = parse_amount("Toll", toll_input)?;
    let total = parse_amount("Total price", total_input)?;

    if toll.is_some_and(|value| value < 0.0) {
        return Err(AppError::Validation("Toll cannot be negative".to_string()));
    }

    let old_toll = stored_toll.unwrap_or(0.0);
    let toll_changed = toll.is_some_and(|new_toll| (new_toll - old_toll).abs() > CENT);
    let total_edited = match (total, stored_total) {
        (Some(typed), Some(stored)) => (typed - stored).abs() > CENT,
        (Some(_), None) => true,
        (None, _) => false,
    };

    let price_total = match (toll, toll_changed, total_edited) {
        (Some(new_toll), true, false) => Some(reprice_for_toll(
            stored_total.unwrap_or(0.0),
            old_toll,
            new_toll,
        )),
        _ => total,
    };

    Ok(FareEdit { toll, price_total })
}

#[cfg(test)]
mod tests {
    use super::{reprice_for_toll, resolve_fare_edit, FareEdit};

    #[test]
    fn adding_a_toll_raises_the_total() {
        assert_eq!(reprice_for_toll(500.0, 0.0, 50.0), 550.0);
    }

    #[test]
    fn replacing_a_toll_swaps_its_contribution() {
        assert_eq!(reprice_for_toll(550.0, 50.0, 120.0), 620.0);
        assert_eq!(reprice_for_toll(620.0, 120.0, 0.0), 500.0);
    }

    #[test]
    fn toll_change_with_untouched_total_reprices() {
        let edit = resolve_fare_edit(Some(0.0), Some(500.0), "50", "500").unwrap();
        assert_eq!(
            edit,
            FareEdit {
                toll: Some(50.0),
                price_total: Some(550.0)
            }
        );
    }

    #[test]
    fn explicit_total_wins_over_repricing() {
        let edit = resolve_fare_edit(Some(0.0), Some(500.0), "50", "700").unwrap();
        assert_eq!(edit.price_total, Some(700.0));
        assert_eq!(edit.toll, Some(50.0));
    }

    #[test]
    fn unchanged_toll_keeps_total() {
        let edit = resolve_fare_edit(Some(30.0), Some(530.0), "30.00", "530").unwrap();
        assert_eq!(edit.price_total, Some(530.0));
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        let err = resolve_fare_edit(None, Some(500.0), "fifty", "").unwrap_err();
        assert_eq!(err.to_string(), "Toll must be a number");
        let err = resolve_fare_edit(None, Some(500.0), "", "lots").unwrap_err();
        assert_eq!(err.to_string(), "Total price must be a number");
    }
}
