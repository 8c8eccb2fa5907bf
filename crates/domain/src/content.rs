//! Editable storefront copy (header, footer, featured banner, about page).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteContent {
    pub header_title: String,
    pub footer_text: String,
    pub footer_address: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub featured_title: String,
    pub featured_subtitle: String,
    pub about_title: String,
    pub about_content: String,
}

impl Default for SiteContent {
    fn default() -> Self {
        Self {
            header_title: "FurniQ".to_string(),
            footer_text: "Premium Furniture for your home.".to_string(),
            footer_address: "Kathmandu, Nepal".to_string(),
            contact_email: "info@furniq.com".to_string(),
            contact_phone: "+977 12345678".to_string(),
            featured_title: "Lush Collection 2026".to_string(),
            featured_subtitle: "Discover the Art of Living".to_string(),
            about_title: "Our Story".to_string(),
            about_content: "We craft furniture with love and precision.".to_string(),
        }
    }
}

/// Partial edit from the settings form; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteContentUpdate {
    pub header_title: Option<String>,
    pub footer_text: Option<String>,
    pub footer_address: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub featured_title: Option<String>,
    pub featured_subtitle: Option<String>,
    pub about_title: Option<String>,
    pub about_content: Option<String>,
}

impl SiteContent {
    pub fn apply(&mut self, update: SiteContentUpdate) {
        let fields = [
            (&mut self.header_title, update.header_title),
            (&mut self.footer_text, update.footer_text),
            (&mut self.footer_address, update.footer_address),
            (&mut self.contact_email, update.contact_email),
            (&mut self.contact_phone, update.contact_phone),
            (&mut self.featured_title, update.featured_title),
            (&mut self.featured_subtitle, update.featured_subtitle),
            (&mut self.about_title, update.about_title),
            (&mut self.about_content, update.about_content),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value;
            }
        }
    }
}
