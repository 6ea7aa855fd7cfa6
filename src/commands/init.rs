//! Initialize a new blog site

use anyhow::Result;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# Blog configuration

# Site
title: spacetraveling
language: pt-BR
timezone: ''
date_format: DD MMM YYYY

# URL
root: /

# Directory
public_dir: public

# Content repository
cms:
  endpoint: https://spacetraveling.cdn.prismic.io/api/v2
  # access_token: set here or through PRISMIC_ACCESS_TOKEN
  document_type: posts
  page_size: 2
  timeout_secs: 10

# Post pages older than this are rebuilt on request by the preview server
revalidate_secs: 3600
reading_time: 4 min
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("languages"))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }
    fs::write(&config_path, DEFAULT_CONFIG)?;

    let gitignore = target_dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, "public/\n.blog-cache/\n")?;
    }

    Ok(())
}
