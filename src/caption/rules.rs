use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ConfigurationError;

/// Reads the materials replacement rules verbatim. The text is never parsed
/// here; the text model interprets it.
pub fn load_material_rules(path: impl AsRef<Path>) -> Result<String, ConfigurationError> {
    let path = path.as_ref();
    let rules = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ConfigurationError::MissingRuleFile {
                path: path.to_path_buf(),
            }
        } else {
            ConfigurationError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if rules.trim().is_empty() {
        warn!("Material rule file {} is empty", path.display());
    }
    debug!(
        "Loaded {} line(s) of material rules from {}",
        rules.lines().count(),
        path.display()
    );
    Ok(rules)
}
