//! Pure classification of one user against the policy.
//!
//! Rules are evaluated in a fixed precedence order and the first match wins:
//! blocked, creation date, policy start, linked identities, social identity, age.
//! A record that could not be decoded at all gets no disposition.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{PolicyConfig, NEAR_EXPIRY_DAYS};
use crate::directory::models::{Identity, UserRecord};

const SECONDS_PER_DAY: i64 = 86_400;

/// Verdict for one user. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    AlreadyBlocked,
    BeforePolicy,
    LinkedAccount { identities: usize },
    SocialConnection,
    WithinThreshold { age_days: i64, days_left: i64 },
    Expired {
        created_at: DateTime<Utc>,
        age_days: i64,
        days_over_threshold: i64,
    },
}

impl Disposition {
    /// True for a within-threshold account that expires in the next few days.
    ///
    /// This is a logging signal only; it never changes the disposition.
    pub fn is_near_expiry(&self) -> bool {
        matches!(self, Self::WithinThreshold { days_left, .. } if (0..=NEAR_EXPIRY_DAYS).contains(days_left))
    }
}

/// A user whose creation timestamp cannot be used. Such users get no disposition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreatedAtError {
    #[error("created_at is missing")]
    Missing,

    #[error("created_at {value:?} is not an RFC 3339 timestamp")]
    Unparseable { value: String },

    #[error("record could not be decoded: {reason}")]
    Undecodable { reason: String },
}

/// Classify a user. Deterministic for a fixed `now`.
pub fn classify(
    user: &UserRecord,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> Result<Disposition, CreatedAtError> {
    if let Some(reason) = &user.decode_error {
        return Err(CreatedAtError::Undecodable {
            reason: reason.clone(),
        });
    }

    if user.is_blocked() {
        return Ok(Disposition::AlreadyBlocked);
    }

    let created_at = user.created_at()?;

    if created_at < policy.policy_start {
        return Ok(Disposition::BeforePolicy);
    }

    if user.identities.len() > 1 {
        return Ok(Disposition::LinkedAccount {
            identities: user.identities.len(),
        });
    }

    if let [identity] = user.identities.as_slice() {
        if identity.is_social() {
            return Ok(Disposition::SocialConnection);
        }
    }

    let age_days = age_in_days(created_at, now);
    let max_days = i64::from(policy.max_inactive_days);

    if age_days <= max_days {
        Ok(Disposition::WithinThreshold {
            age_days,
            days_left: max_days - age_days,
        })
    } else {
        Ok(Disposition::Expired {
            created_at,
            age_days,
            days_over_threshold: age_days - max_days,
        })
    }
}

/// Whole days elapsed, rounded towards negative infinity.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Report label describing how the account signs in.
pub fn connection_type(identities: &[Identity]) -> String {
    match identities {
        [] => "Unknown".to_string(),
        [only] => only.connection.clone().unwrap_or_else(|| "Unknown".to_string()),
        many => {
            let names: Vec<&str> = many
                .iter()
                .map(|identity| identity.connection.as_deref().unwrap_or("unknown"))
                .collect();
            format!("SSO/Linked ({})", names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn policy() -> PolicyConfig {
        PolicyConfig {
            max_inactive_days: 30,
            policy_start: utc(2024, 1, 1),
            dry_run: true,
            included_email_domains: vec!["@example.com".into()],
        }
    }

    fn now() -> DateTime<Utc> {
        utc(2024, 3, 1)
    }

    fn database() -> Identity {
        Identity {
            connection: Some("Username-Password-Authentication".into()),
            is_social: Some(false),
        }
    }

    fn google() -> Identity {
        Identity {
            connection: Some("google-oauth2".into()),
            is_social: Some(true),
        }
    }

    fn user(created_at: &str, identities: Vec<Identity>) -> UserRecord {
        UserRecord {
            user_id: Some("auth0|1".into()),
            email: Some("someone@example.com".into()),
            created_at: Some(created_at.into()),
            identities,
            ..Default::default()
        }
    }

    #[test]
    fn test_blocked_wins_over_everything() {
        let mut u = user("2023-01-01T00:00:00.000Z", vec![google(), database()]);
        u.blocked = Some(true);
        assert_eq!(classify(&u, &policy(), now()), Ok(Disposition::AlreadyBlocked));

        u.created_at = None;
        assert_eq!(classify(&u, &policy(), now()), Ok(Disposition::AlreadyBlocked));
    }

    #[test]
    fn test_missing_and_unparseable_created_at() {
        let mut u = user("", vec![database()]);
        assert_eq!(classify(&u, &policy(), now()), Err(CreatedAtError::Missing));

        u.created_at = None;
        assert_eq!(classify(&u, &policy(), now()), Err(CreatedAtError::Missing));

        u.created_at = Some("last tuesday".into());
        assert!(matches!(
            classify(&u, &policy(), now()),
            Err(CreatedAtError::Unparseable { .. })
        ));
    }

    #[test]
    fn test_numeric_created_at_is_unparseable() {
        let mut u = user("", vec![database()]);
        u.created_at = Some(1704153600.into());
        assert_eq!(
            classify(&u, &policy(), now()),
            Err(CreatedAtError::Unparseable {
                value: "1704153600".into()
            })
        );
    }

    #[test]
    fn test_undecodable_record_gets_no_disposition() {
        let mut u = user("2024-01-02T00:00:00Z", vec![database()]);
        u.decode_error = Some("invalid type: string \"yes\", expected a boolean".into());
        u.blocked = Some(true);
        assert!(matches!(
            classify(&u, &policy(), now()),
            Err(CreatedAtError::Undecodable { .. })
        ));
    }

    #[test]
    fn test_before_policy_even_when_old_enough() {
        let u = user("2023-06-01T12:00:00.000Z", vec![database()]);
        assert_eq!(classify(&u, &policy(), now()), Ok(Disposition::BeforePolicy));
    }

    #[test]
    fn test_policy_start_is_inclusive() {
        let u = user("2024-01-01T00:00:00Z", vec![database()]);
        assert!(matches!(
            classify(&u, &policy(), now()),
            Ok(Disposition::Expired { age_days: 60, .. })
        ));
    }

    #[test]
    fn test_linked_takes_precedence_over_social() {
        let u = user("2024-01-05T00:00:00.000Z", vec![database(), database()]);
        assert_eq!(
            classify(&u, &policy(), now()),
            Ok(Disposition::LinkedAccount { identities: 2 })
        );

        let u = user("2024-01-05T00:00:00.000Z", vec![google(), database()]);
        assert_eq!(
            classify(&u, &policy(), now()),
            Ok(Disposition::LinkedAccount { identities: 2 })
        );
    }

    #[test]
    fn test_single_social_identity() {
        let u = user("2024-01-10T00:00:00.000Z", vec![google()]);
        assert_eq!(classify(&u, &policy(), now()), Ok(Disposition::SocialConnection));
    }

    #[test]
    fn test_zero_identities_fall_through_to_age() {
        let u = user("2024-01-02T00:00:00.000Z", vec![]);
        assert!(matches!(
            classify(&u, &policy(), now()),
            Ok(Disposition::Expired { .. })
        ));
    }

    #[test]
    fn test_threshold_boundary() {
        // Exactly 30 days old is still within the threshold.
        let u = user("2024-01-31T00:00:00Z", vec![database()]);
        assert_eq!(
            classify(&u, &policy(), now()),
            Ok(Disposition::WithinThreshold {
                age_days: 30,
                days_left: 0
            })
        );

        let u = user("2024-01-30T00:00:00Z", vec![database()]);
        assert_eq!(
            classify(&u, &policy(), now()),
            Ok(Disposition::Expired {
                created_at: utc(2024, 1, 30),
                age_days: 31,
                days_over_threshold: 1
            })
        );
    }

    #[test]
    fn test_near_expiry_window() {
        let d = classify(&user("2024-02-05T00:00:00Z", vec![database()]), &policy(), now()).unwrap();
        assert_eq!(
            d,
            Disposition::WithinThreshold {
                age_days: 25,
                days_left: 5
            }
        );
        assert!(d.is_near_expiry());

        let d = classify(&user("2024-02-25T00:00:00Z", vec![database()]), &policy(), now()).unwrap();
        assert!(!d.is_near_expiry());
        assert!(!Disposition::Expired {
            created_at: utc(2024, 1, 21),
            age_days: 40,
            days_over_threshold: 10
        }
        .is_near_expiry());
    }

    #[test]
    fn test_partial_days_round_down() {
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        assert_eq!(age_in_days(created, utc(2024, 2, 2)), 0);
        assert_eq!(age_in_days(created, utc(2024, 2, 3)), 1);
        // Creation in the future floors to -1, not 0.
        assert_eq!(age_in_days(utc(2024, 2, 2), created), -1);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let u = user("2024-01-02T08:30:00.000Z", vec![database()]);
        let first = classify(&u, &policy(), now());
        let second = classify(&u, &policy(), now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_end_to_end_population() {
        let p = policy();
        let a = user("2024-02-25T00:00:00.000Z", vec![database()]);
        let b = user("2023-06-01T00:00:00.000Z", vec![database()]);
        let c = user("2024-01-05T00:00:00.000Z", vec![database(), google()]);
        let d = user("2024-01-10T00:00:00.000Z", vec![google()]);
        let e = user("2024-01-02T00:00:00.000Z", vec![database()]);

        assert_eq!(
            classify(&a, &p, now()),
            Ok(Disposition::WithinThreshold {
                age_days: 5,
                days_left: 25
            })
        );
        assert_eq!(classify(&b, &p, now()), Ok(Disposition::BeforePolicy));
        assert_eq!(
            classify(&c, &p, now()),
            Ok(Disposition::LinkedAccount { identities: 2 })
        );
        assert_eq!(classify(&d, &p, now()), Ok(Disposition::SocialConnection));
        assert_eq!(
            classify(&e, &p, now()),
            Ok(Disposition::Expired {
                created_at: utc(2024, 1, 2),
                age_days: 59,
                days_over_threshold: 29
            })
        );
    }

    #[test]
    fn test_connection_type_labels() {
        assert_eq!(connection_type(&[]), "Unknown");
        assert_eq!(connection_type(&[google()]), "google-oauth2");
        assert_eq!(connection_type(&[Identity::default()]), "Unknown");
        assert_eq!(
            connection_type(&[database(), google(), Identity::default()]),
            "SSO/Linked (Username-Password-Authentication, google-oauth2, unknown)"
        );
    }
}
