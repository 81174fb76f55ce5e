use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::normalize::strip_query;

// ---------------------------------------------------------------------------
// ImageUris
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageUris {
    #[serde(default)]
    pub small: String,
    #[serde(default)]
    pub normal: String,
    #[serde(default)]
    pub large: String,
    #[serde(default)]
    pub png: String,
    #[serde(default)]
    pub art_crop: String,
    #[serde(default)]
    pub border_crop: String,
}

impl ImageUris {
    /// Drop the download timestamp query the feed appends to every image URL.
    pub fn normalize(&mut self) {
        for uri in [
            &mut self.small,
            &mut self.normal,
            &mut self.large,
            &mut self.png,
            &mut self.art_crop,
            &mut self.border_crop,
        ] {
            let stripped = strip_query(uri).len();
            uri.truncate(stripped);
        }
    }

    /// Best single image for display, preferring the normal resolution.
    pub fn representative(&self) -> Option<&str> {
        [&self.normal, &self.large, &self.png, &self.small]
            .into_iter()
            .find(|u| !u.is_empty())
            .map(|u| u.as_str())
    }
}

// ---------------------------------------------------------------------------
// CardFace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub mana_cost: String,
    #[serde(default)]
    pub type_line: String,
    #[serde(default)]
    pub oracle_text: String,
    #[serde(default)]
    pub colors: Vec<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
    pub artist: Option<String>,
    pub image_uris: Option<ImageUris>,
}

// ---------------------------------------------------------------------------
// CardEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardEntry {
    pub id: String,
    #[serde(default)]
    pub oracle_id: String,
    pub name: String,
    #[serde(default)]
    pub lang: String,
    pub released_at: Option<String>,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub rarity: String,
    pub artist: Option<String>,
    #[serde(default)]
    pub mana_cost: String,
    #[serde(default)]
    pub cmc: f64,
    #[serde(default)]
    pub oracle_text: String,
    #[serde(default)]
    pub type_line: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub legalities: HashMap<String, String>,
    #[serde(default)]
    pub image_uris: ImageUris,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_faces: Option<Vec<CardFace>>,
    pub edhrec_rank: Option<i64>,
}

impl CardEntry {
    /// Strip query strings from the card's image URLs and those of its faces.
    pub fn normalize_image_uris(&mut self) {
        self.image_uris.normalize();
        if let Some(faces) = self.card_faces.as_mut() {
            for face in faces {
                if let Some(uris) = face.image_uris.as_mut() {
                    uris.normalize();
                }
            }
        }
    }

    /// Legality status for a format (e.g. `"legal"`), if the feed lists it.
    pub fn legality(&self, format: &str) -> Option<&str> {
        self.legalities.get(format).map(|s| s.as_str())
    }

    fn representative_image(&self) -> String {
        if let Some(uri) = self.image_uris.representative() {
            return uri.to_string();
        }
        self.card_faces
            .iter()
            .flatten()
            .filter_map(|f| f.image_uris.as_ref())
            .find_map(|u| u.representative())
            .unwrap_or_default()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// CardShort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CardShort {
    pub name: String,
    pub cost: String,
    pub cmc: f64,
    pub image: String,
    pub rarity: String,
    pub set: String,
    pub colors: Vec<String>,
    pub oracle_text: String,
}

impl From<&CardEntry> for CardShort {
    fn from(entry: &CardEntry) -> Self {
        let faces = entry.card_faces.as_deref().unwrap_or_default();

        // Multi-face cards leave the top-level cost, text and colors empty.
        let cost = if entry.mana_cost.is_empty() {
            join_faces(faces, |f| &f.mana_cost)
        } else {
            entry.mana_cost.clone()
        };
        let oracle_text = if entry.oracle_text.is_empty() {
            join_faces(faces, |f| &f.oracle_text)
        } else {
            entry.oracle_text.clone()
        };
        let mut colors = entry.colors.clone();
        if colors.is_empty() {
            for face in faces {
                for color in &face.colors {
                    if !colors.contains(color) {
                        colors.push(color.clone());
                    }
                }
            }
        }

        Self {
            name: entry.name.clone(),
            cost,
            cmc: entry.cmc,
            image: entry.representative_image(),
            rarity: entry.rarity.clone(),
            set: entry.set.clone(),
            colors,
            oracle_text,
        }
    }
}

impl From<CardEntry> for CardShort {
    fn from(entry: CardEntry) -> Self {
        CardShort::from(&entry)
    }
}

fn join_faces(faces: &[CardFace], field: impl Fn(&CardFace) -> &String) -> String {
    faces
        .iter()
        .map(field)
        .filter(|s| !s.is_empty())
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" // ")
}
