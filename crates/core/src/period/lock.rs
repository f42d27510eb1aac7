//! Lock checks for the general ledger date and budget periods.

use chrono::NaiveDate;

use crate::actor::ActorRole;
use crate::period::error::PeriodError;

/// Validates a posting date against the global ledger lock date.
///
/// A voucher may only be posted strictly after the lock date: posting on
/// the lock date itself is rejected.
///
/// # Errors
///
/// Returns `PeriodError::PeriodLocked` when `posting_date <= locked_until`.
pub fn check_posting_allowed(
    posting_date: NaiveDate,
    locked_until: Option<NaiveDate>,
) -> Result<(), PeriodError> {
    match locked_until {
        Some(locked_until) if posting_date <= locked_until => Err(PeriodError::PeriodLocked {
            posting_date,
            locked_until,
        }),
        _ => Ok(()),
    }
}

/// Validates an unlock request for a budget period.
///
/// Unlocking mandates a non-empty reason and an elevated role.
///
/// # Errors
///
/// Returns `PeriodError::UnlockReasonRequired` for a blank reason and
/// `PeriodError::UnlockForbidden` when the role lacks the privilege.
pub fn validate_unlock_request(reason: &str, role: ActorRole) -> Result<(), PeriodError> {
    if reason.trim().is_empty() {
        return Err(PeriodError::UnlockReasonRequired);
    }
    if !role.can_unlock_period() {
        return Err(PeriodError::UnlockForbidden(role.as_str().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_no_lock_allows_any_date() {
        assert!(check_posting_allowed(date(2020, 1, 1), None).is_ok());
    }

    #[test]
    fn test_lock_boundary() {
        let locked_until = date(2025, 3, 31);

        // On the lock date: rejected.
        assert!(matches!(
            check_posting_allowed(date(2025, 3, 31), Some(locked_until)),
            Err(PeriodError::PeriodLocked { .. })
        ));
        // Before the lock date: rejected.
        assert!(matches!(
            check_posting_allowed(date(2025, 1, 15), Some(locked_until)),
            Err(PeriodError::PeriodLocked { .. })
        ));
        // One day later: accepted.
        assert!(check_posting_allowed(date(2025, 4, 1), Some(locked_until)).is_ok());
    }

    #[test]
    fn test_unlock_requires_reason() {
        assert!(matches!(
            validate_unlock_request("", ActorRole::Admin),
            Err(PeriodError::UnlockReasonRequired)
        ));
        assert!(matches!(
            validate_unlock_request("   ", ActorRole::Admin),
            Err(PeriodError::UnlockReasonRequired)
        ));
    }

    #[test]
    fn test_unlock_requires_elevated_role() {
        assert!(matches!(
            validate_unlock_request("correction of Q1 misallocation", ActorRole::Accountant),
            Err(PeriodError::UnlockForbidden(_))
        ));
        assert!(
            validate_unlock_request("correction of Q1 misallocation", ActorRole::ChiefAccountant)
                .is_ok()
        );
        assert!(validate_unlock_request("budget revision", ActorRole::Admin).is_ok());
    }

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2020i32..2030, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any posting date on or before the lock date is rejected and any
        /// later date is accepted.
        #[test]
        fn prop_lock_is_a_strict_cutoff(
            posting in arb_date(),
            locked in arb_date(),
        ) {
            let result = check_posting_allowed(posting, Some(locked));
            if posting <= locked {
                prop_assert!(result.is_err());
            } else {
                prop_assert!(result.is_ok());
            }
        }
    }
}
