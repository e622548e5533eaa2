use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "trekId")]
    pub trek_id: String,
    #[serde(rename = "trekName", default)]
    pub trek_name: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default = "default_participants")]
    pub participants: u32,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(rename = "totalPrice", default)]
    pub total_price: f64,
}

fn default_participants() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "Pending"),
            BookingStatus::Confirmed => write!(f, "Confirmed"),
            BookingStatus::Cancelled => write!(f, "Cancelled"),
            BookingStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl Booking {
    pub fn is_active(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "trekId")]
    pub trek_id: String,
    pub author: Option<String>,
    #[serde(default)]
    pub rating: f64,
    pub comment: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    #[serde(alias = "_id")]
    pub id: String,
    pub trek: super::Trek,
    #[serde(rename = "addedAt")]
    pub added_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_booking_defaults() {
        let booking: Booking =
            serde_json::from_str(r#"{"id":"b1","trekId":"t1","startDate":"2026-11-02"}"#).unwrap();
        assert_eq!(booking.participants, 1);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.is_active());
    }

    #[test]
    fn test_parse_cancelled_booking() {
        let booking: Booking = serde_json::from_str(
            r#"{"_id":"b2","trekId":"t1","startDate":null,"participants":3,"status":"cancelled","totalPrice":26997}"#,
        )
        .unwrap();
        assert_eq!(booking.id, "b2");
        assert_eq!(booking.status.to_string(), "Cancelled");
        assert!(!booking.is_active());
    }

    #[test]
    fn test_parse_wishlist_entry() {
        let entry: WishlistEntry = serde_json::from_str(
            r#"{"id":"w1","trek":{"id":"t9","name":"Roopkund"},"addedAt":"2026-10-01"}"#,
        )
        .unwrap();
        assert_eq!(entry.trek.name, "Roopkund");
    }
}
