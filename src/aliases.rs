//! Structure alias registry.
//!
//! Maps each canonical template ROI name to the clinician-entered names
//! that have been accepted for it. Persisted as delimited text, one line
//! per template: `<templateRoi>,<alias1>,<alias2>,...`. Both the template
//! list and each alias list are re-sorted on load, so round-tripping
//! preserves the set of (template, alias-set) pairs but not line order.
//!
//! The registry also maintains a reverse index from every known name
//! (template or alias) to its owning template, rebuilt on each mutation,
//! so resolution is a lookup rather than a scan.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::ParseError;

#[derive(Debug, Default)]
pub struct AliasRegistry {
    path: PathBuf,
    rois: BTreeMap<String, Vec<String>>,
    owners: HashMap<String, String>,
}

impl AliasRegistry {
    /// Load the registry from its persistence file. A missing file is an
    /// error, not an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias file {}", path.display()))?;

        let mut registry = Self {
            path: path.to_path_buf(),
            ..Default::default()
        };

        for (idx, line) in content.lines().enumerate() {
            let mut fields = line.split(',');
            let template = fields.next().unwrap_or("").trim();
            if template.is_empty() {
                return Err(ParseError::BadAliasLine { line: idx + 1 })
                    .with_context(|| format!("Malformed alias file {}", path.display()));
            }

            let mut aliases: Vec<String> = fields
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            aliases.sort();
            registry.rois.insert(template.to_string(), aliases);
        }

        registry.rebuild_owners();
        Ok(registry)
    }

    /// Persist the registry back to the file it was loaded from, via a
    /// temp file and rename.
    pub fn save(&self) -> Result<()> {
        let lines: Vec<String> = self
            .rois
            .iter()
            .map(|(template, aliases)| {
                let mut fields = vec![template.clone()];
                fields.extend(aliases.iter().cloned());
                fields.join(",")
            })
            .collect();

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("Failed to create temp file for alias registry")?;
        tmp.write_all(lines.join("\n").as_bytes())?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write alias file {}", self.path.display()))?;
        Ok(())
    }

    /// Sorted template ROI names.
    pub fn template_rois(&self) -> Vec<String> {
        self.rois.keys().cloned().collect()
    }

    /// Sorted aliases for one template, empty if none are known.
    pub fn aliases(&self, template_roi: &str) -> &[String] {
        self.rois.get(template_roi).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_aliases(&self, template_roi: &str) -> bool {
        !self.aliases(template_roi).is_empty()
    }

    /// Every known name: each template followed by its aliases,
    /// template-major. This is the full matching vocabulary.
    pub fn all_roi_strings(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (template, aliases) in &self.rois {
            names.push(template.clone());
            names.extend(aliases.iter().cloned());
        }
        names
    }

    /// The template that owns a name. A template owns itself and each of
    /// its aliases.
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.owners.get(name).map(String::as_str)
    }

    /// Register a new template ROI. No-op if the template already exists.
    pub fn add_template(&mut self, template_roi: &str, aliases: Vec<String>) {
        if self.rois.contains_key(template_roi) {
            return;
        }
        let mut aliases = aliases;
        aliases.sort();
        self.rois.insert(template_roi.to_string(), aliases);
        self.rebuild_owners();
    }

    pub fn remove_template(&mut self, template_roi: &str) {
        self.rois.remove(template_roi);
        self.rebuild_owners();
    }

    fn rebuild_owners(&mut self) {
        self.owners.clear();
        for (template, aliases) in &self.rois {
            self.owners.insert(template.clone(), template.clone());
            for alias in aliases {
                self.owners.insert(alias.clone(), template.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_registry(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structure_aliases.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_sorts_templates_and_aliases() {
        let (_dir, path) = write_registry("Parotid_L,Lt Parotid,L Parotid\nBrainStem\n");
        let registry = AliasRegistry::load(&path).unwrap();

        assert_eq!(registry.template_rois(), vec!["BrainStem", "Parotid_L"]);
        assert_eq!(registry.aliases("Parotid_L"), ["L Parotid", "Lt Parotid"]);
        assert!(registry.aliases("BrainStem").is_empty());
        assert!(!registry.has_aliases("BrainStem"));
        assert!(registry.has_aliases("Parotid_L"));
    }

    #[test]
    fn test_fields_are_trimmed_and_empties_dropped() {
        let (_dir, path) = write_registry(" Lungs , Lung Total ,, Both Lungs \n");
        let registry = AliasRegistry::load(&path).unwrap();
        assert_eq!(registry.aliases("Lungs"), ["Both Lungs", "Lung Total"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AliasRegistry::load(&dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn test_blank_template_field_is_an_error() {
        let (_dir, path) = write_registry("Lungs,Both Lungs\n,orphan\n");
        assert!(AliasRegistry::load(&path).is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, path) = write_registry("Parotid_L,Lt Parotid\nBrainStem,BS\n");
        let mut registry = AliasRegistry::load(&path).unwrap();
        registry.add_template("Lungs", vec!["Lung Total".to_string()]);
        registry.save().unwrap();

        let reloaded = AliasRegistry::load(&path).unwrap();
        assert_eq!(reloaded.template_rois(), registry.template_rois());
        for roi in reloaded.template_rois() {
            assert_eq!(reloaded.aliases(&roi), registry.aliases(&roi));
        }
    }

    #[test]
    fn test_all_roi_strings_is_template_major() {
        let (_dir, path) = write_registry("Parotid_L,Lt Parotid\nBrainStem,BS\n");
        let registry = AliasRegistry::load(&path).unwrap();
        assert_eq!(
            registry.all_roi_strings(),
            vec!["BrainStem", "BS", "Parotid_L", "Lt Parotid"]
        );
    }

    #[test]
    fn test_owner_lookup_covers_templates_and_aliases() {
        let (_dir, path) = write_registry("Parotid_L,Lt Parotid\n");
        let registry = AliasRegistry::load(&path).unwrap();
        assert_eq!(registry.owner_of("Parotid_L"), Some("Parotid_L"));
        assert_eq!(registry.owner_of("Lt Parotid"), Some("Parotid_L"));
        assert_eq!(registry.owner_of("Cochlea"), None);
    }

    #[test]
    fn test_add_template_is_noop_on_duplicate() {
        let (_dir, path) = write_registry("Lungs,Both Lungs\n");
        let mut registry = AliasRegistry::load(&path).unwrap();
        registry.add_template("Lungs", vec![]);
        assert_eq!(registry.aliases("Lungs"), ["Both Lungs"]);
    }

    #[test]
    fn test_remove_template_drops_owner_entries() {
        let (_dir, path) = write_registry("Lungs,Both Lungs\n");
        let mut registry = AliasRegistry::load(&path).unwrap();
        registry.remove_template("Lungs");
        assert!(registry.template_rois().is_empty());
        assert_eq!(registry.owner_of("Both Lungs"), None);
    }
}
