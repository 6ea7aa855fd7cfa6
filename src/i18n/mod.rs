//! Internationalization (i18n) support
//!
//! UI labels ship built in for `pt-BR` and `en`. A site can override or add
//! languages with `languages/<lang>.yml` files holding flat `key: label` maps.

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

const BUILTIN: &[(&str, &str)] = &[
    (
        "pt-BR",
        r#"
load_more: Carregar mais posts
loading: Carregando...
retry: Falha ao carregar. Tentar novamente
not_found: Post não encontrado
back_home: Voltar para o início
reading_time: Tempo de leitura
"#,
    ),
    (
        "en",
        r#"
load_more: Load more posts
loading: Loading...
retry: Failed to load. Try again
not_found: Post not found
back_home: Back to home
reading_time: Reading time
"#,
    ),
];

/// Internationalization handler
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18n {
    /// Create a handler with the built-in labels loaded
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, yaml) in BUILTIN {
            match serde_yaml::from_str::<HashMap<String, String>>(yaml) {
                Ok(data) => {
                    translations.insert(lang.to_string(), data);
                }
                Err(e) => tracing::error!("Broken built-in labels for {}: {}", lang, e),
            }
        }

        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Load language files from a directory, merging over the built-in labels
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }

            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<HashMap<String, String>>(&content) {
                Ok(data) => {
                    self.translations
                        .entry(lang.to_string())
                        .or_default()
                        .extend(data);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => {
                    tracing::warn!("Failed to parse language file {:?}: {}", path, e);
                }
            }
        }

        Ok(())
    }

    /// Label for a key in the current language, falling back to English
    /// and then to the key itself
    pub fn get(&self, key: &str) -> String {
        [self.language.as_str(), "en"]
            .iter()
            .filter_map(|l| self.translations.get(*l))
            .find_map(|data| data.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// All labels for the current language, as handed to the templates
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let keys: HashSet<&String> = [self.language.as_str(), "en"]
            .iter()
            .filter_map(|l| self.translations.get(*l))
            .flat_map(|data| data.keys())
            .collect();

        keys.into_iter().map(|key| (key.clone(), self.get(key))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_labels() {
        let i18n = I18n::new("pt-BR");
        assert_eq!(i18n.get("load_more"), "Carregar mais posts");
        assert_eq!(i18n.get("loading"), "Carregando...");

        let i18n = I18n::new("en");
        assert_eq!(i18n.get("load_more"), "Load more posts");
    }

    #[test]
    fn test_template_labels_fill_gaps_from_english() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("de.yml"), "load_more: Mehr laden\n").unwrap();

        let mut i18n = I18n::new("de");
        i18n.load_languages(dir.path()).unwrap();

        let all = i18n.get_all_translations();
        assert_eq!(all.get("load_more").map(String::as_str), Some("Mehr laden"));
        assert_eq!(all.get("loading").map(String::as_str), Some("Loading..."));
        assert_eq!(all.len(), I18n::new("en").get_all_translations().len());
    }

    #[test]
    fn test_fallbacks() {
        let i18n = I18n::new("de");
        assert_eq!(i18n.get("loading"), "Loading...");
        assert_eq!(i18n.get("unknown"), "unknown");
    }

    #[test]
    fn test_override_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pt-BR.yml"), "load_more: Mais posts\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut i18n = I18n::new("pt-BR");
        i18n.load_languages(dir.path()).unwrap();

        assert_eq!(i18n.get("load_more"), "Mais posts");
        // untouched keys keep the built-in label
        assert_eq!(i18n.get("loading"), "Carregando...");

        let all = i18n.get_all_translations();
        assert_eq!(all.get("load_more").map(String::as_str), Some("Mais posts"));
        assert_eq!(all.get("back_home").map(String::as_str), Some("Voltar para o início"));
    }
}
