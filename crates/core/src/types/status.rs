//! Status enums for the collective's records.
//!
//! Every status is `snake_case` on the wire, in the database (as a Postgres
//! enum) and in CLI arguments.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display`, `FromStr` and a list of all variants.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` name used on the wire and in the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

/// Active/inactive flag shared by artists, instructors and discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "record_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

string_enum!(RecordStatus {
    Active => "active",
    Inactive => "inactive",
});

/// Product lifecycle.
///
/// Products are usually retired by moving to `Inactive` or `Discontinued`
/// rather than being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Discontinued,
}

string_enum!(ProductStatus {
    Active => "active",
    Inactive => "inactive",
    Discontinued => "discontinued",
});

/// Class lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "class_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    /// Not yet visible to the public.
    #[default]
    Draft,
    /// Listed on the public site and open for registration.
    Published,
    Cancelled,
    Completed,
}

string_enum!(ClassStatus {
    Draft => "draft",
    Published => "published",
    Cancelled => "cancelled",
    Completed => "completed",
});

impl ClassStatus {
    /// Whether new registrations may be taken.
    #[must_use]
    pub const fn accepts_registrations(&self) -> bool {
        matches!(self, Self::Published)
    }
}

/// Registration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "registration_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Waitlisted,
}

string_enum!(RegistrationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
    Waitlisted => "waitlisted",
});

impl RegistrationStatus {
    /// Whether the registration's seats count against class capacity.
    #[must_use]
    pub const fn holds_seats(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// Payment state of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

string_enum!(PaymentStatus {
    Unpaid => "unpaid",
    Paid => "paid",
    Refunded => "refunded",
});

/// Status of a recorded sync conflict.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "sync_conflict_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SyncConflictStatus {
    #[default]
    Pending,
    Resolved,
    Ignored,
}

string_enum!(SyncConflictStatus {
    Pending => "pending",
    Resolved => "resolved",
    Ignored => "ignored",
});

impl SyncConflictStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a conflict in this state may move to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Resolved | Self::Ignored)
        )
    }
}

/// What kind of discrepancy a sync conflict records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "conflict_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    PriceMismatch,
    QuantityMismatch,
    NameMismatch,
    /// The product is linked to an external object that no longer exists.
    MissingExternal,
}

string_enum!(ConflictType {
    PriceMismatch => "price_mismatch",
    QuantityMismatch => "quantity_mismatch",
    NameMismatch => "name_mismatch",
    MissingExternal => "missing_external",
});

/// External system a record is synchronized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "external_system", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSystem {
    Square,
    Webflow,
}

string_enum!(ExternalSystem {
    Square => "square",
    Webflow => "webflow",
});

/// How an operator chose to settle a sync conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "conflict_resolution", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Push the internal value to the external system.
    UseLocal,
    /// Overwrite the internal value with the external one.
    UseExternal,
    Ignore,
}

string_enum!(ConflictResolution {
    UseLocal => "use_local",
    UseExternal => "use_external",
    Ignore => "ignore",
});

impl ConflictResolution {
    /// The conflict status this resolution leads to.
    #[must_use]
    pub const fn target_status(&self) -> SyncConflictStatus {
        match self {
            Self::UseLocal | Self::UseExternal => SyncConflictStatus::Resolved,
            Self::Ignore => SyncConflictStatus::Ignored,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_string_round_trip_for_all_variants() {
        for status in SyncConflictStatus::ALL {
            assert_eq!(SyncConflictStatus::from_str(status.as_str()).unwrap(), *status);
        }
        for kind in ConflictType::ALL {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_invalid_status_message() {
        let err = ClassStatus::from_str("archived").unwrap_err();
        assert_eq!(err, "invalid ClassStatus: archived");
    }

    #[test]
    fn test_conflict_transitions() {
        use SyncConflictStatus::{Ignored, Pending, Resolved};

        assert!(Pending.can_transition_to(Resolved));
        assert!(Pending.can_transition_to(Ignored));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Resolved.can_transition_to(Pending));
        assert!(!Ignored.can_transition_to(Resolved));
        assert!(Resolved.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn test_resolution_target_status() {
        assert_eq!(
            ConflictResolution::UseLocal.target_status(),
            SyncConflictStatus::Resolved
        );
        assert_eq!(
            ConflictResolution::Ignore.target_status(),
            SyncConflictStatus::Ignored
        );
    }

    #[test]
    fn test_registration_seat_holding() {
        assert!(RegistrationStatus::Confirmed.holds_seats());
        assert!(RegistrationStatus::Pending.holds_seats());
        assert!(!RegistrationStatus::Waitlisted.holds_seats());
        assert!(!RegistrationStatus::Cancelled.holds_seats());
        assert!(ClassStatus::Published.accepts_registrations());
        assert!(!ClassStatus::Draft.accepts_registrations());
    }
}
