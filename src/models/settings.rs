use serde::{Deserialize, Serialize};

/// SEO metadata for the public site. Stored as-is without validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoSettings {
    pub site_title: String,
    pub site_description: String,
    pub keywords: Vec<String>,
    pub og_image: Option<String>,
    pub canonical_url: Option<String>,
    pub robots: String,
}

impl Default for SeoSettings {
    fn default() -> Self {
        Self {
            site_title: "Cattery".to_string(),
            site_description: String::new(),
            keywords: Vec::new(),
            og_image: None,
            canonical_url: None,
            robots: "index, follow".to_string(),
        }
    }
}
