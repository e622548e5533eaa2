use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
    Extreme,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Moderate => write!(f, "Moderate"),
            Difficulty::Hard => write!(f, "Hard"),
            Difficulty::Extreme => write!(f, "Extreme"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trek {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub region: Option<String>,
    pub difficulty: Option<Difficulty>,
    #[serde(rename = "durationDays", default)]
    pub duration_days: u32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(rename = "reviewCount", default)]
    pub review_count: u32,
    #[serde(rename = "bookingCount", default)]
    pub booking_count: u32,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

impl Trek {
    /// "5 days · Moderate · ★ 4.6"
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.duration_days > 0 {
            let unit = if self.duration_days == 1 { "day" } else { "days" };
            parts.push(format!("{} {}", self.duration_days, unit));
        }
        if let Some(difficulty) = self.difficulty {
            parts.push(difficulty.to_string());
        }
        if self.review_count > 0 {
            parts.push(format!("★ {:.1}", self.rating));
        }
        parts.join(" · ")
    }

    pub fn place(&self) -> String {
        match (&self.location, &self.region) {
            (Some(location), Some(region)) if !region.is_empty() => {
                format!("{}, {}", location, region)
            }
            (Some(location), _) => location.clone(),
            (None, Some(region)) => region.clone(),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trek() {
        let json = r#"{"_id":"t1","name":"Hampta Pass","location":"Manali","region":"Himachal","difficulty":"moderate","durationDays":5,"price":8999,"rating":4.6,"reviewCount":120,"bookingCount":40}"#;
        let trek: Trek = serde_json::from_str(json).unwrap();
        assert_eq!(trek.id, "t1");
        assert_eq!(trek.difficulty, Some(Difficulty::Moderate));
        assert_eq!(trek.review_count, 120);
        assert_eq!(trek.image_url, None);
        assert_eq!(trek.summary(), "5 days · Moderate · ★ 4.6");
        assert_eq!(trek.place(), "Manali, Himachal");
    }

    #[test]
    fn test_parse_minimal_trek() {
        let trek: Trek = serde_json::from_str(r#"{"id":"t2","name":"Kedarkantha"}"#).unwrap();
        assert_eq!(trek.rating, 0.0);
        assert_eq!(trek.summary(), "");
        assert_eq!(trek.place(), "");
    }
}
