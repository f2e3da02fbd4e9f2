//! Data models for AgriRent

pub mod booking;
pub mod enums;
pub mod equipment;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use booking::{Booking, BookingAction, BookingDetails, Transition};
pub use enums::{
    AvailabilityStatus, BookingStatus, DeliveryType, EquipmentCategory, EquipmentCondition,
    PaymentStatus,
};
pub use equipment::{Equipment, EquipmentReview, EquipmentSummary};
pub use pagination::PageRequest;
pub use user::{Role, UserClaims, UserShort};
