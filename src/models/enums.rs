//! Shared domain enums, stored as text columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Implements `as_str`, `Display`, `FromStr` (case-insensitive) and the SQLx
/// text conversions for a fieldless enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($label) {
                        return Ok($name::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($name), s))
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = Decode::<Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// Equipment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EquipmentCategory {
    #[serde(rename = "Land Preparation")]
    LandPreparation,
    #[serde(rename = "Planting Equipment")]
    PlantingEquipment,
    Irrigation,
    #[serde(rename = "Crop Protection")]
    CropProtection,
    Harvesting,
    #[serde(rename = "Post-Harvest")]
    PostHarvest,
    Transportation,
    Specialized,
}

text_enum!(EquipmentCategory {
    LandPreparation => "Land Preparation",
    PlantingEquipment => "Planting Equipment",
    Irrigation => "Irrigation",
    CropProtection => "Crop Protection",
    Harvesting => "Harvesting",
    PostHarvest => "Post-Harvest",
    Transportation => "Transportation",
    Specialized => "Specialized",
});

/// Whether a listing can currently be booked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum AvailabilityStatus {
    #[default]
    Available,
    Rented,
    Maintenance,
    Unavailable,
}

text_enum!(AvailabilityStatus {
    Available => "Available",
    Rented => "Rented",
    Maintenance => "Maintenance",
    Unavailable => "Unavailable",
});

/// Physical condition of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum EquipmentCondition {
    Excellent,
    #[default]
    Good,
    Fair,
}

text_enum!(EquipmentCondition {
    Excellent => "Excellent",
    Good => "Good",
    Fair => "Fair",
});

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    Rejected,
}

text_enum!(BookingStatus {
    Pending => "Pending",
    Confirmed => "Confirmed",
    Active => "Active",
    Completed => "Completed",
    Cancelled => "Cancelled",
    Rejected => "Rejected",
});

impl BookingStatus {
    /// Statuses that still hold a claim on the equipment
    pub const OPEN: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Active,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

text_enum!(PaymentStatus {
    Pending => "Pending",
    Paid => "Paid",
    Refunded => "Refunded",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum DeliveryType {
    #[default]
    Pickup,
    Delivery,
}

text_enum!(DeliveryType {
    Pickup => "Pickup",
    Delivery => "Delivery",
});
