//! Game metadata handling

use crate::ImageCategory;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Platform assigned to games that are not in the catalog
pub const UNKNOWN_PLATFORM: &str = "Unknown";

/// Resolved artwork locations, one slot per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameImages {
    pub box_front: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
    pub clear_logo: Option<PathBuf>,
    pub fanart_background: Option<PathBuf>,
}

impl GameImages {
    pub fn get(&self, category: ImageCategory) -> Option<&Path> {
        match category {
            ImageCategory::BoxFront => self.box_front.as_deref(),
            ImageCategory::Screenshot => self.screenshot.as_deref(),
            ImageCategory::ClearLogo => self.clear_logo.as_deref(),
            ImageCategory::FanartBackground => self.fanart_background.as_deref(),
        }
    }

    /// Fill an empty slot. Occupied slots are left alone.
    pub fn fill(&mut self, category: ImageCategory, path: PathBuf) {
        let slot = match category {
            ImageCategory::BoxFront => &mut self.box_front,
            ImageCategory::Screenshot => &mut self.screenshot,
            ImageCategory::ClearLogo => &mut self.clear_logo,
            ImageCategory::FanartBackground => &mut self.fanart_background,
        };
        if slot.is_none() {
            *slot = Some(path);
        }
    }

    pub fn found_count(&self) -> usize {
        ImageCategory::ALL
            .iter()
            .filter(|category| self.get(**category).is_some())
            .count()
    }
}

/// A game in the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub title: String,
    pub platform: String,
    /// ROM or disc image, usually relative to the library root
    pub application_path: String,
    pub developer: String,
    pub publisher: String,
    pub genre: String,
    pub release_date: String,
    pub rating: String,
    pub play_mode: String,
    pub play_count: u32,
    /// Cumulative play time in seconds
    pub play_time: u64,
    #[serde(default)]
    pub images: GameImages,
}

impl GameRecord {
    /// Placeholder for a ROM the catalog does not know about.
    ///
    /// The title is the filename with its extension stripped.
    pub fn unknown(rom_path: &str) -> Self {
        let file_name = rom_path.rsplit(['/', '\\']).next().unwrap_or(rom_path);
        let title = match file_name.rsplit_once('.') {
            Some((stem, ext))
                if !ext.is_empty() && ext.chars().all(|c| c.is_alphanumeric() || c == '_') =>
            {
                stem
            }
            _ => file_name,
        };

        Self {
            title: title.to_string(),
            platform: UNKNOWN_PLATFORM.to_string(),
            application_path: rom_path.to_string(),
            ..Default::default()
        }
    }

    /// Whether this record came from the catalog rather than [`GameRecord::unknown`]
    pub fn is_cataloged(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Parse a LaunchBox platform file (`Data/Platforms/<platform>.xml`).
///
/// Only direct children of `<Game>` elements are read; sibling elements such
/// as `<AdditionalApplication>` are skipped even though they carry their own
/// `ApplicationPath`. Games without an application path are dropped since
/// they can be neither looked up nor launched. `platform` is used when an
/// entry has no `<Platform>` of its own.
pub fn parse_platform_xml(
    xml: &str,
    platform: &str,
) -> Result<Vec<GameRecord>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut games = Vec::new();
    let mut fields: Option<HashMap<String, String>> = None;
    let mut open_field: Option<(String, String)> = None;
    // Element depth below the current <Game>
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if fields.is_none() {
                    if name == "Game" {
                        fields = Some(HashMap::new());
                        depth = 0;
                    }
                } else {
                    depth += 1;
                    open_field = (depth == 1).then(|| (name, String::new()));
                }
            }
            Event::End(_) => {
                let Some(found) = fields.as_mut() else {
                    continue;
                };
                if depth == 0 {
                    let game = record_from_fields(found, platform);
                    if !game.application_path.is_empty() {
                        games.push(game);
                    }
                    fields = None;
                    continue;
                }
                if let Some((name, text)) = open_field.take() {
                    found.insert(name, text.trim().to_string());
                }
                depth -= 1;
            }
            Event::Text(text) => {
                if let Some((_, value)) = open_field.as_mut() {
                    value.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some((_, value)) = open_field.as_mut() {
                    value.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(games)
}

fn record_from_fields(fields: &HashMap<String, String>, platform: &str) -> GameRecord {
    let text = |key: &str| fields.get(key).cloned().unwrap_or_default();

    let own_platform = text("Platform");
    GameRecord {
        id: text("ID"),
        title: text("Title"),
        platform: if own_platform.is_empty() {
            platform.to_string()
        } else {
            own_platform
        },
        application_path: text("ApplicationPath"),
        developer: text("Developer"),
        publisher: text("Publisher"),
        genre: text("Genre"),
        release_date: text("ReleaseDate"),
        rating: text("Rating"),
        play_mode: text("PlayMode"),
        play_count: u32::try_from(parse_number(fields.get("PlayCount"))).unwrap_or(0),
        play_time: parse_number(fields.get("PlayTime")),
        images: GameImages::default(),
    }
}

/// Numeric fields are occasionally written as decimals; anything unparsable is zero
fn parse_number(value: Option<&String>) -> u64 {
    let Some(value) = value else {
        return 0;
    };
    value
        .parse::<u64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0 && *v < u64::MAX as f64)
                .map(|v| v as u64)
        })
        .unwrap_or(0)
}
