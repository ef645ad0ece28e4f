//! In-memory game index keyed by normalized ROM path

use crate::{CatalogError, GameRecord, parse_platform_xml};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lowercase and use forward slashes, the form every index key is stored in
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Join a library-relative path onto the library root.
///
/// Separators are unified to `/` and `.`/`..` segments are resolved. A path
/// that is already absolute is returned cleaned but otherwise unchanged.
pub fn join_library_path(root: &str, path: &str) -> String {
    let joined = if is_absolute(path) || root.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", root, path)
    };

    let unified = joined.replace('\\', "/");
    let leading = if unified.starts_with('/') { "/" } else { "" };

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Never pop a drive prefix
                if segments.last().is_some_and(|last| !last.ends_with(':')) {
                    segments.pop();
                }
            }
            other => segments.push(other),
        }
    }

    format!("{}{}", leading, segments.join("/"))
}

/// Lookup table from normalized path (or bare filename) to game.
///
/// Built once at startup; changes to the library need a restart.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    root: PathBuf,
    entries: HashMap<String, Arc<GameRecord>>,
    games: usize,
}

impl CatalogIndex {
    /// Create an empty index for a library root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: HashMap::new(),
            games: 0,
        }
    }

    /// Build an index from records already in memory
    pub fn from_records(
        root: impl Into<PathBuf>,
        records: impl IntoIterator<Item = GameRecord>,
    ) -> Self {
        let mut index = Self::new(root);
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Build the index from `<root>/Data/Platforms/*.xml`
    pub fn build(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let platforms_dir = root.join("Data").join("Platforms");
        Self::build_from(root, &platforms_dir)
    }

    /// Build the index from every `*.xml` in `platforms_dir`, keying
    /// relative application paths under `root`.
    ///
    /// Unreadable or malformed files are skipped; a missing directory yields
    /// an empty index. Files are visited in name order so filename collisions
    /// across platforms resolve the same way on every run.
    pub fn build_from(root: impl Into<PathBuf>, platforms_dir: &Path) -> Self {
        let mut index = Self::new(root);

        let files = match Self::platform_files(platforms_dir) {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("{}", e);
                return index;
            }
        };

        for path in files {
            let platform = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default();

            match Self::load_platform_file(&path, &platform) {
                Ok(games) => {
                    tracing::debug!("Loaded {} games from {}", games.len(), path.display());
                    for game in games {
                        index.insert(game);
                    }
                }
                Err(e) => tracing::warn!("Skipping platform file: {}", e),
            }
        }

        tracing::info!(
            "Indexed {} games under {} keys",
            index.game_count(),
            index.len()
        );
        index
    }

    fn platform_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::PlatformsNotFound(dir.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    /// Read and parse one platform file
    pub fn load_platform_file(path: &Path, platform: &str) -> Result<Vec<GameRecord>, CatalogError> {
        let xml = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_platform_xml(&xml, platform).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Add a game under its full-path key and, unless already claimed, its
    /// filename key. Returns `false` for games without an application path.
    pub fn insert(&mut self, game: GameRecord) -> bool {
        if game.application_path.is_empty() {
            return false;
        }

        let root = self.root.to_string_lossy();
        let path_key = normalize_path(&join_library_path(&root, &game.application_path));
        let name_key = normalize_path(file_name(&game.application_path));

        let game = Arc::new(game);
        self.entries.insert(path_key, Arc::clone(&game));
        self.entries.entry(name_key).or_insert(game);
        self.games += 1;
        true
    }

    /// Resolve a ROM path to a game.
    ///
    /// Tries the path as given, then relative to the library root, then the
    /// bare filename.
    pub fn lookup(&self, rom_path: &str) -> Option<Arc<GameRecord>> {
        let trimmed = rom_path.trim();
        if trimmed.is_empty() {
            return None;
        }

        let root = self.root.to_string_lossy();
        let candidates = [
            normalize_path(trimmed),
            normalize_path(&join_library_path("", trimmed)),
            normalize_path(&join_library_path(&root, trimmed)),
            normalize_path(file_name(trimmed)),
        ];

        candidates
            .iter()
            .find_map(|key| self.entries.get(key))
            .cloned()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of lookup keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of games inserted
    pub fn game_count(&self) -> usize {
        self.games
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(title: &str, path: &str) -> GameRecord {
        GameRecord {
            id: format!("id-{}", title),
            title: title.to_string(),
            platform: "Nintendo 64".to_string(),
            application_path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(r"C:\LaunchBox\Games\Mario.Z64"),
            "c:/launchbox/games/mario.z64"
        );
    }

    #[test]
    fn test_join_library_path() {
        assert_eq!(
            join_library_path(r"C:\LaunchBox", r"Games\N64\Mario.z64"),
            "C:/LaunchBox/Games/N64/Mario.z64"
        );
        assert_eq!(
            join_library_path(r"C:\LaunchBox", r"..\Roms\Mario.z64"),
            "C:/Roms/Mario.z64"
        );
        assert_eq!(
            join_library_path(r"C:\LaunchBox", r"D:\Roms\.\Mario.z64"),
            "D:/Roms/Mario.z64"
        );
        assert_eq!(
            join_library_path("/games/lb", "./roms//a.iso"),
            "/games/lb/roms/a.iso"
        );
        assert_eq!(join_library_path(r"C:\", r"..\..\x.iso"), "C:/x.iso");
    }

    #[test]
    fn test_lookup_strategies() {
        let index = CatalogIndex::from_records(
            r"C:\LaunchBox",
            [game("Super Mario 64", r"Games\N64\Super Mario 64 (USA).z64")],
        );

        // Absolute path as reported on the emulator command line
        let found = index
            .lookup(r"C:\LaunchBox\Games\N64\Super Mario 64 (USA).z64")
            .unwrap();
        assert_eq!(found.title, "Super Mario 64");

        // Case and separator insensitive
        assert!(index.lookup("c:/launchbox/games/n64/SUPER MARIO 64 (USA).Z64").is_some());

        // Relative to the library root
        assert!(index.lookup(r"Games\N64\Super Mario 64 (USA).z64").is_some());
        assert!(index.lookup(r".\Games\N64\Super Mario 64 (USA).z64").is_some());

        // Filename only, from a different folder
        assert!(index.lookup(r"E:\Backup\Super Mario 64 (USA).z64").is_some());

        assert!(index.lookup(r"C:\LaunchBox\Games\N64\Zelda.z64").is_none());
        assert!(index.lookup("").is_none());
    }

    #[test]
    fn test_filename_collision_first_wins() {
        let index = CatalogIndex::from_records(
            "/lb",
            [
                game("First", "Games/USA/Tetris.gb"),
                game("Second", "Games/Japan/Tetris.gb"),
            ],
        );

        // Each full path still reaches its own game
        assert_eq!(index.lookup("/lb/Games/USA/Tetris.gb").unwrap().title, "First");
        assert_eq!(index.lookup("/lb/Games/Japan/Tetris.gb").unwrap().title, "Second");

        // The filename fallback belongs to the first game loaded
        assert_eq!(index.lookup("/elsewhere/Tetris.gb").unwrap().title, "First");
        assert_eq!(index.len(), 3);
        assert_eq!(index.game_count(), 2);
    }

    #[test]
    fn test_entries_without_path_skipped() {
        let mut index = CatalogIndex::new("/lb");
        assert!(!index.insert(game("Nothing", "")));
        assert!(index.is_empty());
        assert_eq!(index.game_count(), 0);
    }

    #[test]
    fn test_absolute_application_path() {
        let index = CatalogIndex::from_records("/lb", [game("Melee", r"D:\iso\melee.iso")]);
        assert_eq!(index.lookup(r"D:\iso\melee.iso").unwrap().title, "Melee");
    }
}
