//! Operator edits applied to a wizard between search and publish.

use anyhow::{anyhow, Result};
use domain::wizard::Wizard;
use domain::{PlatformId, Template, TrackingIds};

/// Edits collected from the command line, applied in the order an operator
/// walks the wizard: metadata, platforms, customization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub add: Vec<(PlatformId, String)>,
    pub disable: Vec<PlatformId>,
    /// Platforms to put first, in this order; the rest keep their order.
    pub order: Vec<PlatformId>,
    pub slug: Option<String>,
    pub template: Option<Template>,
    pub color: Option<String>,
    pub ga4: Option<String>,
    pub meta_pixel: Option<String>,
}

impl EditPlan {
    /// Walk a wizard whose search succeeded from `Search` to `Preview`.
    pub fn apply(&self, wizard: &mut Wizard) -> Result<()> {
        wizard.next()?;
        if let Some(artist) = &self.artist {
            wizard.set_artist_name(artist)?;
        }
        if let Some(title) = &self.title {
            wizard.set_title(title)?;
        }

        wizard.next()?;
        for (platform, url) in &self.add {
            wizard.add_manual(platform.clone(), url)?;
        }
        for platform in &self.disable {
            let index = wizard
                .find_row(platform)
                .ok_or_else(|| anyhow!("no {} link to disable", platform.display_name()))?;
            wizard.set_enabled(index, false)?;
        }
        for (position, platform) in self.order.iter().enumerate() {
            let from = wizard
                .find_row(platform)
                .ok_or_else(|| anyhow!("no {} link to reorder", platform.display_name()))?;
            wizard.move_row(from, position)?;
        }

        wizard.next()?;
        if let Some(template) = self.template {
            wizard.set_template(template)?;
        }
        if self.color.is_some() {
            wizard.set_primary_color(self.color.as_deref())?;
        }
        if self.slug.is_some() {
            wizard.set_custom_slug(self.slug.as_deref())?;
        }
        if self.ga4.is_some() || self.meta_pixel.is_some() {
            wizard.set_tracking(TrackingIds {
                ga4_id: self.ga4.clone(),
                meta_pixel_id: self.meta_pixel.clone(),
                ..TrackingIds::default()
            })?;
        }

        wizard.next()?;
        Ok(())
    }
}

/// `spotify`, `apple-music`, `appleMusic`...
pub fn parse_platform(s: &str) -> Result<PlatformId, String> {
    let key = s.trim();
    if key.is_empty() {
        return Err("platform name is empty".into());
    }
    Ok(PlatformId::from_key(key))
}

/// `platform=url`
pub fn parse_platform_link(s: &str) -> Result<(PlatformId, String), String> {
    let (key, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected platform=url, got '{}'", s))?;
    let url = url.trim();
    if url.is_empty() {
        return Err(format!("missing url for {}", key.trim()));
    }
    Ok((parse_platform(key)?, url.to_string()))
}

pub fn parse_template(s: &str) -> Result<Template, String> {
    Template::parse(s.trim())
        .ok_or_else(|| format!("unknown template '{}' (standard, dark, minimal, vinyl)", s))
}
