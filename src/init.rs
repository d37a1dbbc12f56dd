//! Site initialization module.
//!
//! Creates a starter site: source directories, one page, one component,
//! one stylesheet and the default configuration.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Files to write ignore patterns to
const IGNORE_FILES: &[&str] = &[".gitignore", ".ignore"];

const STARTER_CSS: &str = "\
body {
  font-family: system-ui, sans-serif;
  margin: 0 auto;
  max-width: 42rem;
  padding: 2rem 1rem;
}
";

const STARTER_CARD_CSS: &str = "\
.card {
  border: 1px solid #ddd;
  border-radius: 0.5rem;
  padding: 1rem;
}
";

const STARTER_COMPONENT: &str = r#"<template>
  <div class="card">
    <h2>{{ title }}</h2>
    <slot>Nothing here yet.</slot>
  </div>
</template>

<script>
export default {
  css: ["assets/card.css"],
  props: { title: "Untitled" },
}
</script>
"#;

const STARTER_PAGE: &str = r#"<template>
  <main>
    <h1>{{ title }}</h1>
    <Card title="Getting started">
      Edit this page under pages/ and the card under components/.
    </Card>
  </main>
</template>

<script>
export default {
  css: ["assets/site.css"],
  props: { title: "Hello, vela" },
}
</script>
"#;

/// Create a new site with default structure
pub fn new_site(config: &SiteConfig, has_name: bool) -> Result<()> {
    let root = config.get_root();

    // Without a name the site goes into the current directory, which must be empty
    if !has_name && !is_dir_empty(root)? {
        bail!(
            "Current directory is not empty. Use `vela init <SITE_NAME>` to create in a subdirectory."
        );
    }

    init_site_structure(config)?;
    init_starter_files(config)?;
    init_default_config(&config.config_path)?;
    init_ignored_files(root, &config.build.output)?;

    log!("init"; "created site at {}", root.display());
    Ok(())
}

/// Check if a directory is completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Write default configuration file
fn init_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Create site directory structure
fn init_site_structure(config: &SiteConfig) -> Result<()> {
    let build = &config.build;
    for path in [&build.pages, &build.components, &build.assets] {
        if path.exists() {
            bail!(
                "Path `{}` already exists. Try `vela init <SITE_NAME>` instead.",
                path.display()
            );
        }
        fs::create_dir_all(path).with_context(|| format!("Failed to create {}", path.display()))?;
    }
    Ok(())
}

fn init_starter_files(config: &SiteConfig) -> Result<()> {
    let build = &config.build;
    let ext = &build.extension;
    let files = [
        (build.pages.join(format!("index.{ext}")), STARTER_PAGE),
        (build.components.join(format!("Card.{ext}")), STARTER_COMPONENT),
        (build.assets.join("site.css"), STARTER_CSS),
        (build.assets.join("card.css"), STARTER_CARD_CSS),
    ];
    for (path, content) in files {
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Ignore the output directory in `.gitignore` and `.ignore`, unless present.
fn init_ignored_files(root: &Path, output: &Path) -> Result<()> {
    let output = output.strip_prefix(root).unwrap_or(output);
    let content = format!("/{}/\n", output.display());

    for filename in IGNORE_FILES {
        let path = root.join(filename);
        if !path.exists() {
            fs::write(&path, &content)?;
        }
    }

    Ok(())
}
