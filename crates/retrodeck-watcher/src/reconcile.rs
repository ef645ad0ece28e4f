//! Detected ROM path to game record

use retrodeck_catalog::{ArtworkResolver, CatalogIndex, GameRecord, ImageCategory};
use std::sync::Arc;

/// Resolves a detected ROM against the catalog and attaches artwork
#[derive(Clone)]
pub struct GameResolver {
    catalog: Arc<CatalogIndex>,
    artwork: Option<ArtworkResolver>,
}

impl GameResolver {
    pub fn new(catalog: Arc<CatalogIndex>) -> Self {
        Self {
            catalog,
            artwork: None,
        }
    }

    pub fn with_artwork(mut self, artwork: ArtworkResolver) -> Self {
        self.artwork = Some(artwork);
        self
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    /// Cataloged record with fresh artwork, or an `Unknown` placeholder
    pub fn resolve_blocking(&self, rom_path: &str) -> GameRecord {
        let Some(record) = self.catalog.lookup(rom_path) else {
            tracing::info!("{} is not in the catalog", rom_path);
            return GameRecord::unknown(rom_path);
        };

        let mut game = GameRecord::clone(&record);
        tracing::info!("Matched \"{}\" ({})", game.title, game.platform);

        if let Some(artwork) = &self.artwork {
            let found = artwork.resolve(&game.title, &game.platform);
            for category in ImageCategory::ALL {
                if let Some(path) = found.get(category) {
                    game.images.fill(category, path.to_path_buf());
                }
            }
        }

        game
    }

    /// [`Self::resolve_blocking`] off the async runtime (artwork scans hit the disk)
    pub async fn resolve(&self, rom_path: &str) -> GameRecord {
        let resolver = self.clone();
        let path = rom_path.to_string();

        match tokio::task::spawn_blocking(move || resolver.resolve_blocking(&path)).await {
            Ok(game) => game,
            Err(e) => {
                tracing::warn!("Game resolution task failed: {}", e);
                GameRecord::unknown(rom_path)
            }
        }
    }
}
