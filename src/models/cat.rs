use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatProfile {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub color: Option<String>,
    pub gender: Gender,
    pub year_of_birth: Option<i32>,
    pub breed: Option<String>,
    pub category: Option<String>,
    pub vaccinated: bool,
    pub microchipped: bool,
    pub castrated: bool,
    pub mother_id: Option<Uuid>,
    pub father_id: Option<Uuid>,
    pub availability: Availability,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatProfile {
    /// Whether `url` is referenced by any of the profile's media fields
    pub fn references_media(&self, url: &str) -> bool {
        self.main_image.as_deref() == Some(url)
            || self.images.iter().any(|u| u == url)
            || self.videos.iter().any(|u| u == url)
    }

    /// Remove every reference to `url`; returns true when something changed
    pub fn remove_media_url(&mut self, url: &str) -> bool {
        let before = self.images.len() + self.videos.len();
        self.images.retain(|u| u != url);
        self.videos.retain(|u| u != url);
        let mut changed = before != self.images.len() + self.videos.len();
        if self.main_image.as_deref() == Some(url) {
            self.main_image = None;
            changed = true;
        }
        changed
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    Reserved,
    Sold,
    NotForSale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    pub color: Option<String>,
    pub gender: Gender,
    pub year_of_birth: Option<i32>,
    pub breed: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub vaccinated: bool,
    #[serde(default)]
    pub microchipped: bool,
    #[serde(default)]
    pub castrated: bool,
    pub mother_id: Option<Uuid>,
    pub father_id: Option<Uuid>,
    #[serde(default)]
    pub availability: Availability,
}

/// Partial update; absent fields are left unchanged.
///
/// Nullable fields use `Option<Option<T>>` so that `null` clears the value
/// while an absent key keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatUpdateRequest {
    pub name: Option<String>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub main_image: Option<Option<String>>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<Option<String>>,
    pub gender: Option<Gender>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub year_of_birth: Option<Option<i32>>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub breed: Option<Option<String>>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
    pub vaccinated: Option<bool>,
    pub microchipped: Option<bool>,
    pub castrated: Option<bool>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub mother_id: Option<Option<Uuid>>,
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub father_id: Option<Option<Uuid>>,
    pub availability: Option<Availability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatListQuery {
    pub availability: Option<Availability>,
    pub gender: Option<Gender>,
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let request: CatUpdateRequest =
            serde_json::from_str(r#"{"mother_id": null, "name": "Mira"}"#).unwrap();
        assert_eq!(request.mother_id, Some(None));
        assert_eq!(request.father_id, None);
        assert_eq!(request.name.as_deref(), Some("Mira"));
    }

    #[test]
    fn test_availability_string_forms() {
        assert_eq!(Availability::NotForSale.to_string(), "not_for_sale");
        assert_eq!(
            Availability::from_str("reserved").unwrap(),
            Availability::Reserved
        );
        assert!(Gender::from_str("unknown").is_err());
    }

    #[test]
    fn test_remove_media_url_clears_every_reference() {
        let now = Utc::now();
        let mut cat = CatProfile {
            id: Uuid::new_v4(),
            name: "Luna".into(),
            description: None,
            main_image: Some("a.jpg".into()),
            images: vec!["a.jpg".into(), "b.jpg".into()],
            videos: vec!["a.jpg".into()],
            color: None,
            gender: Gender::Female,
            year_of_birth: None,
            breed: None,
            category: None,
            vaccinated: false,
            microchipped: false,
            castrated: false,
            mother_id: None,
            father_id: None,
            availability: Availability::Available,
            deleted: false,
            deleted_at: None,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        assert!(cat.references_media("a.jpg"));
        assert!(cat.remove_media_url("a.jpg"));
        assert_eq!(cat.main_image, None);
        assert_eq!(cat.images, vec!["b.jpg".to_string()]);
        assert!(cat.videos.is_empty());
        assert!(!cat.remove_media_url("a.jpg"));
    }
}
