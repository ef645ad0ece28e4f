//! Layered controller map resolution

use crate::ControlsError;
use crate::generator::{AnthropicGenerator, TextGenerator};
use crate::layouts::{GAMECUBE, platform_default};
use crate::position::{ControllerPositionMap, PositionKey};
use crate::profile::DolphinProfile;
use crate::prompt::{build_prompt, core_mapping_context, parse_response};
use crate::store::{GeneratedCache, OverrideStore};
use retrodeck_config::CompanionConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Tier that produced a resolved map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapSource {
    Override,
    Cache,
    Generated,
    Profile,
    PlatformDefault,
}

impl MapSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapSource::Override => "override",
            MapSource::Cache => "cache",
            MapSource::Generated => "generated",
            MapSource::Profile => "profile",
            MapSource::PlatformDefault => "platform-default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub map: ControllerPositionMap,
    pub source: MapSource,
}

impl Resolved {
    fn new(map: ControllerPositionMap, source: MapSource) -> Self {
        Self { map, source }
    }
}

/// Resolves a game's controller map.
///
/// Priority, first hit wins:
/// 1. manual override
/// 2. generated cache (current version only)
/// 3. live generation, persisted on success
/// 4. GameCube only: bindings read from the Dolphin profile
/// 5. static platform layout
///
/// For GameCube the Dolphin profile also replaces the static mapping
/// context in the generation prompt. It is read once per resolver.
pub struct ControlResolver {
    overrides: OverrideStore,
    cache: GeneratedCache,
    generator: Option<Arc<dyn TextGenerator>>,
    profile_dir: Option<PathBuf>,
    profile: OnceLock<Option<DolphinProfile>>,
}

impl ControlResolver {
    /// Resolver without generation; add it with [`Self::with_generator`]
    pub fn new(overrides: OverrideStore, cache: GeneratedCache) -> Self {
        Self {
            overrides,
            cache,
            generator: None,
            profile_dir: None,
            profile: OnceLock::new(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Directory holding Dolphin GCPad profiles
    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    /// Stores, generator and profile location from the companion config
    pub fn from_config(config: &CompanionConfig) -> Result<Self, ControlsError> {
        let generator = AnthropicGenerator::new(&config.controls, config.credentials_path())?;

        Ok(Self::new(
            OverrideStore::new(config.overrides_path()),
            GeneratedCache::new(config.cache_path(), config.controls.cache_version),
        )
        .with_generator(Arc::new(generator))
        .with_profile_dir(config.dolphin_profile_dir()))
    }

    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }

    pub fn cache(&self) -> &GeneratedCache {
        &self.cache
    }

    /// Map for a game, or `None` when no tier has one
    pub async fn resolve(&self, title: &str, platform: &str) -> Option<ControllerPositionMap> {
        self.resolve_with_source(title, platform)
            .await
            .map(|resolved| resolved.map)
    }

    pub async fn resolve_with_source(&self, title: &str, platform: &str) -> Option<Resolved> {
        if let Some(map) = self.overrides.get(title) {
            tracing::debug!("Using manual override for \"{}\"", title);
            return Some(Resolved::new(map, MapSource::Override));
        }

        if let Some(map) = self.cache.get(title) {
            tracing::debug!("Cache hit for \"{}\"", title);
            return Some(Resolved::new(map, MapSource::Cache));
        }

        let profile = (platform == GAMECUBE)
            .then(|| self.dolphin_profile())
            .flatten();

        if let Some(map) = self.generate(title, platform, profile).await {
            if let Err(e) = self.cache.insert(title, &map) {
                tracing::warn!("Could not cache controls for \"{}\": {}", title, e);
            }
            return Some(Resolved::new(map, MapSource::Generated));
        }

        if let Some(profile) = profile {
            tracing::debug!("Using Dolphin profile bindings for \"{}\"", title);
            return Some(Resolved::new(profile.position_map(), MapSource::Profile));
        }

        match platform_default(platform) {
            Some(map) => {
                tracing::debug!("Using {} default layout for \"{}\"", platform, title);
                Some(Resolved::new(map, MapSource::PlatformDefault))
            }
            None => {
                tracing::debug!("No controller map available for \"{}\" ({})", title, platform);
                None
            }
        }
    }

    /// Merge one position into a title's override and persist it
    pub fn save_override(
        &self,
        title: &str,
        key: PositionKey,
        label: &str,
    ) -> Result<ControllerPositionMap, ControlsError> {
        self.overrides.save_override(title, key, label)
    }

    fn dolphin_profile(&self) -> Option<&DolphinProfile> {
        self.profile
            .get_or_init(|| self.profile_dir.as_deref().and_then(DolphinProfile::read_dir))
            .as_ref()
    }

    async fn generate(
        &self,
        title: &str,
        platform: &str,
        profile: Option<&DolphinProfile>,
    ) -> Option<ControllerPositionMap> {
        let generator = self.generator.as_ref()?;

        let context = match profile {
            Some(profile) => Some(profile.context()),
            None => core_mapping_context(platform).map(str::to_string),
        };
        let prompt = build_prompt(title, platform, context.as_deref());

        tracing::info!("Generating controls for \"{}\" ({})", title, platform);
        match generator.generate(&prompt).await {
            Ok(text) => {
                let map = parse_response(&text);
                match &map {
                    Some(map) => {
                        tracing::info!("Generated {} mappings for \"{}\"", map.len(), title)
                    }
                    None => tracing::debug!("Unusable generation response for \"{}\"", title),
                }
                map
            }
            Err(ControlsError::MissingCredentials) => {
                tracing::debug!("No generation credential configured, skipping");
                None
            }
            Err(e) => {
                tracing::warn!("Generation failed for \"{}\": {}", title, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::NINTENDO_64;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Replies with fixed text and records prompts
    struct ScriptedGenerator {
        reply: Result<String, ()>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, ControlsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|_| ControlsError::Generation("scripted failure".into()))
        }
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn write(&self, name: &str, contents: &str) {
            std::fs::write(self.dir.path().join(name), contents).unwrap();
        }

        fn resolver(&self) -> ControlResolver {
            ControlResolver::new(
                OverrideStore::new(self.dir.path().join("overrides.json")),
                GeneratedCache::new(self.dir.path().join("game-controls.json"), 2),
            )
        }
    }

    #[tokio::test]
    async fn test_override_beats_cache() {
        let fx = Fixture::new();
        fx.write("overrides.json", r#"{"Super Mario 64": {"faceBottom": "Jump!"}}"#);
        fx.write(
            "game-controls.json",
            r#"{"version": 2, "entries": {"Super Mario 64": {"faceBottom": "Jump", "start": "Pause"}}}"#,
        );

        let generator = ScriptedGenerator::replying("{}");
        let resolver = fx.resolver().with_generator(generator.clone());

        let resolved = resolver
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::Override);
        assert_eq!(resolved.map.get(PositionKey::FaceBottom), Some("Jump!"));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit() {
        let fx = Fixture::new();
        fx.write(
            "game-controls.json",
            r#"{"version": 2, "entries": {"Super Mario 64": {"faceBottom": "Jump", "start": "Pause"}}}"#,
        );

        let resolved = fx
            .resolver()
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::Cache);
        assert_eq!(resolved.map.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_cache_regenerates() {
        let fx = Fixture::new();
        fx.write(
            "game-controls.json",
            r#"{"version": 1, "entries": {"Super Mario 64": {"faceBottom": "Old", "start": "Old"}}}"#,
        );

        let generator =
            ScriptedGenerator::replying(r#"{"faceBottom": "Jump", "faceLeft": "Punch"}"#);
        let resolver = fx.resolver().with_generator(generator.clone());

        let resolved = resolver
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::Generated);
        assert_eq!(resolved.map.get(PositionKey::FaceBottom), Some("Jump"));
        assert_eq!(generator.calls(), 1);

        // Persisted under the current version; second call is a cache hit
        let again = resolver
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(again.source, MapSource::Cache);
        assert_eq!(generator.calls(), 1);

        let prompt = generator.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("N64 A button → faceBottom"));
    }

    #[tokio::test]
    async fn test_stale_cache_without_generator_uses_default() {
        let fx = Fixture::new();
        fx.write(
            "game-controls.json",
            r#"{"version": 1, "entries": {"Super Mario 64": {"faceBottom": "Old", "start": "Old"}}}"#,
        );

        let resolved = fx
            .resolver()
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::PlatformDefault);
        assert_eq!(resolved.map.get(PositionKey::FaceBottom), Some("A"));
    }

    #[tokio::test]
    async fn test_degenerate_response_not_persisted() {
        let fx = Fixture::new();
        let generator = ScriptedGenerator::replying(r#"{"faceBottom": "Jump"}"#);
        let resolver = fx.resolver().with_generator(generator.clone());

        let resolved = resolver
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::PlatformDefault);
        assert!(resolver.cache().entries().is_empty());
        assert!(!fx.dir.path().join("game-controls.json").exists());
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back() {
        let fx = Fixture::new();
        let resolver = fx.resolver().with_generator(ScriptedGenerator::failing());

        let resolved = resolver.resolve_with_source("Okami", "Sony Playstation 2").await;
        assert_eq!(resolved.unwrap().source, MapSource::PlatformDefault);

        assert!(resolver.resolve("Frogger", "Atari 2600").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_falls_back() {
        let fx = Fixture::new();
        let config = retrodeck_config::ControlsConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let generator =
            AnthropicGenerator::new(&config, fx.dir.path().join("retrodeck-config.json")).unwrap();
        let resolver = fx.resolver().with_generator(Arc::new(generator));

        let resolved = resolver
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::PlatformDefault);
    }

    #[tokio::test]
    async fn test_gamecube_profile() {
        let fx = Fixture::new();
        let profiles = fx.dir.path().join("GCPad");
        std::fs::create_dir_all(&profiles).unwrap();
        std::fs::write(
            profiles.join("XInput.ini"),
            "[Profile]\nButtons/A = `Button E`\nButtons/B = `Button S`\nButtons/Start = `Start`\n",
        )
        .unwrap();

        // No generator: profile bindings beat the static layout
        let resolver = fx.resolver().with_profile_dir(&profiles);
        let resolved = resolver
            .resolve_with_source("Pikmin", GAMECUBE)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::Profile);
        assert_eq!(resolved.map.get(PositionKey::FaceRight), Some("A"));

        // With a generator the profile becomes the prompt context
        let generator =
            ScriptedGenerator::replying(r#"{"faceRight": "Throw", "faceBottom": "Call"}"#);
        let resolver = fx
            .resolver()
            .with_profile_dir(&profiles)
            .with_generator(generator.clone());
        let resolved = resolver
            .resolve_with_source("Pikmin", GAMECUBE)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::Generated);

        let prompt = generator.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("read from XInput.ini"));
        assert!(!prompt.contains("no profile found"));
    }

    #[tokio::test]
    async fn test_profile_ignored_for_other_platforms() {
        let fx = Fixture::new();
        let profiles = fx.dir.path().join("GCPad");
        std::fs::create_dir_all(&profiles).unwrap();
        std::fs::write(
            profiles.join("XInput.ini"),
            "Buttons/A = `Button E`\nButtons/B = `Button S`\nButtons/Start = `Start`\n",
        )
        .unwrap();

        let resolved = fx
            .resolver()
            .with_profile_dir(&profiles)
            .resolve_with_source("Super Mario 64", NINTENDO_64)
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::PlatformDefault);
    }

    #[tokio::test]
    async fn test_save_override_then_resolve() {
        let fx = Fixture::new();
        let resolver = fx.resolver();

        resolver
            .save_override("Ico", PositionKey::FaceRight, "Call Yorda")
            .unwrap();
        resolver
            .save_override("Ico", PositionKey::FaceBottom, "Jump")
            .unwrap();

        let resolved = resolver
            .resolve_with_source("Ico", "Sony Playstation 2")
            .await
            .unwrap();
        assert_eq!(resolved.source, MapSource::Override);
        assert_eq!(resolved.map.len(), 2);
    }
}
