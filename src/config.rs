use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{CaptionError, ConfigurationError};

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_DESCRIBE_MODEL: &str = "llama-3.2-11b-vision-preview";
pub const DEFAULT_RECAPTION_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_RULES_PATH: &str = "material_rules.txt";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Sampling settings shared by both remote calls.
pub const SAMPLING_TEMPERATURE: f32 = 0.25;
pub const SAMPLING_TOP_P: f32 = 1.0;
pub const MAX_COMPLETION_TOKENS: u32 = 1024;

/// `KEY=VALUE` pairs parsed from a dotfile. Lines starting with `#` are
/// skipped and anything after a `#` in a value is dropped. Values are taken
/// literally: no quoting, escapes or `$NAME` expansion. Nothing is written to
/// the process environment.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

fn strip_inline_comment(value: &str) -> &str {
    value.split('#').next().unwrap_or("").trim()
}

fn parse_credential_lines(
    path: &Path,
    raw: &str,
) -> Result<HashMap<String, String>, ConfigurationError> {
    let mut values = HashMap::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigurationError::Malformed {
                path: path.to_path_buf(),
                detail: format!("line {} has no '=': {}", index + 1, line.trim_end()),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigurationError::Malformed {
                path: path.to_path_buf(),
                detail: format!("line {} has an empty key", index + 1),
            });
        }
        values.insert(key.to_string(), strip_inline_comment(value).to_string());
    }
    Ok(values)
}

impl CredentialStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ConfigurationError::MissingCredentialFile { path: path.clone() }
            } else {
                ConfigurationError::Unreadable {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let values = parse_credential_lines(&path, &raw)?;

        debug!("Loaded {} key(s) from {}", values.len(), path.display());
        Ok(CredentialStore { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|value| value.as_str())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.get(name)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
            .unwrap_or_else(|| default.to_string())
    }

    fn positive_u64(&self, name: &str, default: u64) -> u64 {
        match self.get(name) {
            None | Some("") => default,
            Some(raw) => match raw.parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => {
                    warn!("Invalid {} value '{}'; defaulting to {}.", name, raw, default);
                    default
                }
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub describe_model: String,
    pub recaption_model: String,
    pub rules_path: PathBuf,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_store(store: &CredentialStore) -> Result<Self, CaptionError> {
        let api_key = store.get(API_KEY_VAR).unwrap_or_default().to_string();
        if api_key.is_empty() {
            return Err(CaptionError::Precondition(format!(
                "{} not found in '{}' file.",
                API_KEY_VAR,
                store.path().display()
            )));
        }

        Ok(Config {
            api_key,
            base_url: store.string("GROQ_BASE_URL", DEFAULT_BASE_URL),
            describe_model: store.string("DESCRIBE_MODEL", DEFAULT_DESCRIBE_MODEL),
            recaption_model: store.string("RECAPTION_MODEL", DEFAULT_RECAPTION_MODEL),
            rules_path: PathBuf::from(store.string("MATERIAL_RULES_PATH", DEFAULT_RULES_PATH)),
            request_timeout: Duration::from_secs(
                store.positive_u64("GROQ_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS),
            ),
            log_level: store.string("LOG_LEVEL", "info").to_lowercase(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CaptionError> {
        let store = CredentialStore::load(path)?;
        Config::from_store(&store)
    }
}

pub const DESCRIBE_PROMPT: &str = r#"Describe this image in full details, don't omit any information about it. Your caption must be at least 512 words long.
Ignore the background and the lighting, only describe the person in this portrait photograph.

Example result:
"This is a portrait photograph of a woman in her 40s, she has long, straight blonde hair and blue eyes, her hair is tied in a ponny tails behind her back and flowing on her shoulders, [...]"
"#;

/// Substituted once in [`RECAPTION_SYSTEM_TEMPLATE`] with the rule file contents.
pub const REPLACEMENT_RULES_PLACEHOLDER: &str = "{REPLACEMENT_RULES}";

pub const RECAPTION_SYSTEM_TEMPLATE: &str = r#"You are an AI assistant tasked with transforming natural language descriptions of people, typically based on portrait photographs, by replacing certain elements with corresponding materials according to a predefined set of rules. Your goal is to reinterpret the description so the subject appears constructed from building materials, while preserving the original feel and texture of each element.

Guidelines:
1. Replacement Rules:
{REPLACEMENT_RULES}

2. Maintain Original Texture:
   - Replace elements with construction materials that mimic the original texture and feel. For example:
     - Soft materials (e.g., wool, silk) should be replaced by equally soft construction materials (e.g., mineral wool, fiberglass fabric).
     - Hard materials (e.g., metal, glass) should retain their hard, structured feel using analogous building materials (e.g., steel, concrete).

3. Flexible Adaptation:
   - If an element is not explicitly listed in the rules but fits the theme, adapt it using construction materials with matching textures. For example:
     - Replace "long flowing hair" with "hair made of copper threads" (soft and flowing).
     - Replace "smooth leather shoes" with "smooth rubber shoes" (soft and flexible).

4. Output:
   - Ensure the description is cohesive, vivid, and aligned with the theme of construction material textures.
   - Retain the original sentence structure wherever possible while applying replacements. Replace the original description, do not repeat it.
   - Don't add any other word or sentence like "here is the rewritten prompt" or "let me know if you need another prompt to be converted": your answer must be the new prompt and only the new prompt.
   - DO NOT add any element that it not mentioned in the original description, such as pair of glasses or a beard.
   - Insist on the material. Ensure the metal is shinny, the wood is grainy, the fabrics are soft or rough.
   - Go into greater details when you are describing hair and facial hair (beard/mustache).
   - You must highlight the specific materials and their texture, ensuring that they are clearly described in great details.
   - IGNORE the background and remove any mention of background elements.
   - keep the caption simple and ignore useless elements. Keep all the features discribing the subject. Remove contradictory elements.

Example:
User: "The man had short dark brown hair, thin glasses, and wore light wool clothing."  
Assistant: "The man had hair made out of dark brown brush, glasses made out of electrical wire, and wore mineral wool clothing.""#;

pub const STUDIO_STYLE_SUFFIX: &str = "\n\nA studio shot with professional studio lighting. This image is a professional studio shot of a stop-motion animation character made of construction material";

#[cfg(test)]
mod tests {
    use super::*;

    fn write_env(contents: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), contents).unwrap();
        dir
    }

    #[test]
    fn commented_out_key_is_not_loaded() {
        let dir = write_env("# GROQ_API_KEY=secret\nOTHER=1\n");
        let store = CredentialStore::load(dir.path().join(".env")).unwrap();
        assert_eq!(store.get(API_KEY_VAR), None);
        assert_eq!(store.get("OTHER"), Some("1"));
    }

    #[test]
    fn inline_comment_is_stripped_from_value() {
        let dir = write_env("GROQ_API_KEY=value # note\nTIGHT=abc#def\n");
        let store = CredentialStore::load(dir.path().join(".env")).unwrap();
        assert_eq!(store.get(API_KEY_VAR), Some("value"));
        assert_eq!(store.get("TIGHT"), Some("abc"));
    }

    #[test]
    fn values_keep_inner_spaces_and_dollar_signs() {
        let dir = write_env(
            "MATERIAL_RULES_PATH=my rules.txt\nMODEL=a b c # note\nGROQ_API_KEY=gsk_ab$cd12\n",
        );
        let store = CredentialStore::load(dir.path().join(".env")).unwrap();
        assert_eq!(store.get("MATERIAL_RULES_PATH"), Some("my rules.txt"));
        assert_eq!(store.get("MODEL"), Some("a b c"));
        assert_eq!(store.get(API_KEY_VAR), Some("gsk_ab$cd12"));
    }

    #[test]
    fn value_splits_on_first_equals_only() {
        let dir = write_env("  KEY = x=y  \n\nGROQ_BASE_URL=https://example.test/v1?a=b\n");
        let store = CredentialStore::load(dir.path().join(".env")).unwrap();
        assert_eq!(store.get("KEY"), Some("x=y"));
        assert_eq!(store.get("GROQ_BASE_URL"), Some("https://example.test/v1?a=b"));
    }

    #[test]
    fn line_without_equals_is_malformed() {
        let dir = write_env("GROQ_API_KEY=gsk\njust some words\n");
        let err = CredentialStore::load(dir.path().join(".env")).unwrap_err();
        match err {
            ConfigurationError::Malformed { detail, .. } => assert!(detail.contains("line 2"), "{detail}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let dir = write_env("GROQ_API_KEY=gsk\nGROQ_TIMEOUT_SECONDS=0\n");
        let config = Config::load(dir.path().join(".env")).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));

        let dir = write_env("GROQ_API_KEY=gsk\nGROQ_TIMEOUT_SECONDS=45 # seconds\n");
        let config = Config::load(dir.path().join(".env")).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(45));
    }

    #[test]
    fn missing_credential_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CredentialStore::load(dir.path().join(".env")).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCredentialFile { .. }));
        let message = err.to_string();
        assert!(message.contains(".env"), "{message}");
        assert!(message.contains("Please create"), "{message}");
    }

    #[test]
    fn missing_api_key_is_a_precondition_error() {
        let dir = write_env("LOG_LEVEL=debug\n");
        let err = Config::load(dir.path().join(".env")).unwrap_err();
        match err {
            CaptionError::Precondition(message) => assert!(message.contains(API_KEY_VAR)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let dir = write_env("GROQ_API_KEY=gsk_test\nGROQ_TIMEOUT_SECONDS=soon\n");
        let config = Config::load(dir.path().join(".env")).unwrap();
        assert_eq!(config.api_key, "gsk_test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.describe_model, DEFAULT_DESCRIBE_MODEL);
        assert_eq!(config.recaption_model, DEFAULT_RECAPTION_MODEL);
        assert_eq!(config.rules_path, PathBuf::from(DEFAULT_RULES_PATH));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn recaption_template_has_a_single_placeholder() {
        assert_eq!(
            RECAPTION_SYSTEM_TEMPLATE
                .matches(REPLACEMENT_RULES_PLACEHOLDER)
                .count(),
            1
        );
    }
}
