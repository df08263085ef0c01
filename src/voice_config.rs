/*!
 * Speaker to voice mapping.
 *
 * The voice table is a JSON object keyed by speaker label. Each profile
 * names either a stock voice (`voice_id`) or a reference recording plus its
 * transcript for cloning (`ref_audio` + `ref_text`), an optional default
 * delivery style, and a reproducibility seed. The table is loaded once and
 * passed to the pipeline as an immutable value.
 *
 * Profiles are decoded one at a time. A profile that fails to decode stays
 * in the table and is rejected as incomplete, so only its speaker is skipped.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{ConfigError, UnitFailure};
use crate::script::{speaker_census, ScriptEntry};

/// Seed used when a profile does not set one; lets the service pick.
pub const RANDOM_SEED: i64 = -1;

/// Voice parameters for one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VoiceProfile {
    /// Identifier of a stock voice on the synthesis service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,

    /// Reference recording for voice cloning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_audio: Option<PathBuf>,

    /// Transcript of the reference recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_text: Option<String>,

    /// Default delivery style, used when a unit carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Reproducibility seed; accepts numbers and numeric strings
    #[serde(default = "default_seed", deserialize_with = "deserialize_seed")]
    pub seed: i64,

    /// Why the profile could not be decoded from the voice file
    #[serde(skip)]
    pub decode_error: Option<String>,
}

fn default_seed() -> i64 {
    RANDOM_SEED
}

fn deserialize_seed<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SeedValue {
        Number(i64),
        Text(String),
        Missing(()),
    }

    match SeedValue::deserialize(deserializer)? {
        SeedValue::Number(seed) => Ok(seed),
        SeedValue::Text(text) if text.trim().is_empty() => Ok(RANDOM_SEED),
        SeedValue::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid seed '{}'", text))),
        SeedValue::Missing(()) => Ok(RANDOM_SEED),
    }
}

impl VoiceProfile {
    /// Profile using a stock voice.
    pub fn with_voice_id(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: Some(voice_id.into()),
            seed: RANDOM_SEED,
            ..Self::default()
        }
    }

    /// Profile cloning from a reference recording.
    pub fn with_reference(ref_audio: impl Into<PathBuf>, ref_text: impl Into<String>) -> Self {
        Self {
            ref_audio: Some(ref_audio.into()),
            ref_text: Some(ref_text.into()),
            seed: RANDOM_SEED,
            ..Self::default()
        }
    }

    /// Placeholder for a profile whose JSON could not be decoded.
    pub fn undecodable(reason: impl Into<String>) -> Self {
        Self {
            seed: RANDOM_SEED,
            decode_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Check the profile is usable for `speaker`.
    ///
    /// A stock voice id is enough. Otherwise both reference fields must be
    /// non-empty and the reference recording must exist.
    pub fn check_complete(&self, speaker: &str) -> Result<(), ConfigError> {
        let incomplete = |reason: String| ConfigError::IncompleteVoice {
            speaker: speaker.to_string(),
            reason,
        };

        if let Some(error) = &self.decode_error {
            return Err(incomplete(format!("invalid profile: {}", error)));
        }

        if self.voice_id.as_deref().is_some_and(|id| !id.trim().is_empty()) {
            return Ok(());
        }

        let ref_audio = self
            .ref_audio
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| incomplete("neither voice_id nor ref_audio is set".to_string()))?;

        if self.ref_text.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(incomplete("ref_text is empty".to_string()));
        }

        if !ref_audio.exists() {
            return Err(incomplete(format!(
                "reference audio file not found: {}",
                ref_audio.display()
            )));
        }

        Ok(())
    }

    /// Whether [`Self::check_complete`] passes.
    pub fn is_complete(&self, speaker: &str) -> bool {
        self.check_complete(speaker).is_ok()
    }
}

/// Immutable speaker to profile mapping.
///
/// Built through [`VoiceTable::from_json`] rather than `Deserialize` so a bad profile stays local.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VoiceTable {
    voices: BTreeMap<String, VoiceProfile>,
}

impl VoiceTable {
    /// Build a table from profiles.
    pub fn new(voices: BTreeMap<String, VoiceProfile>) -> Self {
        Self { voices }
    }

    /// Load the table from a JSON file.
    ///
    /// Relative `ref_audio` paths are resolved against the file's directory.
    /// A missing file or an empty table is a `ConfigurationMissing` error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigurationMissing(format!(
                "voice configuration not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ConfigurationMissing(format!(
                "voice configuration unreadable: {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut table = Self::from_json(&content)?;
        if let Some(base_dir) = path.parent() {
            table.resolve_relative_paths(base_dir);
        }
        debug!("Loaded {} voice profile(s) from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse a table from JSON text.
    ///
    /// The document must be an object; each profile in it is decoded on its own.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| ConfigError::Invalid(format!("voice configuration: {}", e)))?;

        let voices = raw
            .into_iter()
            .map(|(speaker, value)| {
                let profile = serde_json::from_value(value).unwrap_or_else(|e| {
                    warn!("Voice profile for {} is invalid and will be skipped: {}", speaker, e);
                    VoiceProfile::undecodable(e.to_string())
                });
                (speaker, profile)
            })
            .collect();

        let table = Self::new(voices);
        if table.is_empty() {
            return Err(ConfigError::ConfigurationMissing(
                "no voices configured".to_string(),
            ));
        }
        Ok(table)
    }

    fn resolve_relative_paths(&mut self, base_dir: &Path) {
        for profile in self.voices.values_mut() {
            if let Some(ref_audio) = profile.ref_audio.as_mut() {
                if ref_audio.is_relative() && !ref_audio.as_os_str().is_empty() {
                    *ref_audio = base_dir.join(&*ref_audio);
                }
            }
        }
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Whether the table has no profiles.
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Speaker labels in sorted order.
    pub fn speakers(&self) -> impl Iterator<Item = &str> {
        self.voices.keys().map(String::as_str)
    }

    /// Find the profile for `speaker`: exact label first, then ASCII case-insensitive.
    pub fn lookup(&self, speaker: &str) -> Option<&VoiceProfile> {
        self.voices.get(speaker).or_else(|| {
            self.voices
                .iter()
                .find(|(label, _)| label.eq_ignore_ascii_case(speaker))
                .map(|(_, profile)| profile)
        })
    }

    /// Resolve a usable profile for `speaker` or explain why the unit must be skipped.
    pub fn resolve(&self, speaker: &str) -> Result<&VoiceProfile, UnitFailure> {
        let profile = self
            .lookup(speaker)
            .ok_or_else(|| UnitFailure::UnconfiguredSpeaker(speaker.to_string()))?;
        profile
            .check_complete(speaker)
            .map_err(UnitFailure::IncompleteVoice)?;
        Ok(profile)
    }

    /// First complete profile in label order, used for the connection test.
    pub fn first_complete(&self) -> Option<(&str, &VoiceProfile)> {
        self.voices
            .iter()
            .find(|(label, profile)| profile.is_complete(label))
            .map(|(label, profile)| (label.as_str(), profile))
    }

    /// Whether `speaker` has a complete profile.
    pub fn has_complete_voice(&self, speaker: &str) -> bool {
        self.resolve(speaker).is_ok()
    }

    /// Per-speaker entry counts from a script, each with the reason its voice is unusable, if any.
    pub fn coverage(&self, entries: &[ScriptEntry]) -> Vec<SpeakerCoverage> {
        speaker_census(entries)
            .into_iter()
            .map(|(speaker, entries)| {
                let issue = self.resolve(&speaker).err().map(|failure| failure.to_string());
                SpeakerCoverage {
                    speaker,
                    entries,
                    issue,
                }
            })
            .collect()
    }
}

/// One speaker of a script and whether it can be voiced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerCoverage {
    pub speaker: String,
    pub entries: usize,
    /// Why the speaker's units would be skipped; `None` when the voice is complete
    pub issue: Option<String>,
}
