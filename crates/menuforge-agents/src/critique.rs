//! Critique agent: checklist review of a built artifact
//!
//! The checklist runs in fixed precedence order per locator; the first
//! violated category wins for that locator, while independent locators each
//! contribute their own defect. A bad artifact is never an error — only a
//! failing verdict. [`MenuCritic`] is a pure function of its inputs, so
//! reviewing an unchanged artifact always yields the identical verdict.

use crate::builder::escape_html;
use crate::error::CritiqueError;
use crate::retrieval::GroundingContext;
use crate::services::CritiqueService;
use menuforge_model::{
    Affordance, Artifact, Defect, DefectCategory, Locator, MenuItem, Price, Verdict,
};
use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£]\s*\d+(?:\.\d{1,2})?").expect("static regex"));

/// Deterministic checklist reviewer
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuCritic;

impl MenuCritic {
    /// Create a new critic
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// First violated category for one item, if any
    fn review_item(
        artifact: &Artifact,
        grounding: &GroundingContext,
        position: usize,
        item: &MenuItem,
    ) -> Option<Defect> {
        let locator = Locator::Item {
            position,
            name: item.name.clone(),
        };
        let content = artifact.content();

        // 1. Completeness: the entry must appear at all.
        if !content.contains(&escape_html(&item.name)) {
            return Some(Defect::blocking(
                DefectCategory::MissingField,
                locator,
                format!("menu entry {:?} is missing from the artifact", item.name),
            ));
        }

        // 1b. Known fields must be rendered.
        if let Some(price) = item.price {
            if !content.contains(&price.to_string()) {
                return Some(Defect::blocking(
                    DefectCategory::MissingField,
                    locator,
                    format!("price {price} for {:?} is not rendered", item.name),
                ));
            }
        }

        // 3. Grounding consistency.
        match grounding.passage_for(&item.name) {
            Some(passage) => {
                if let Some(price) = item.price {
                    let stated: Vec<Price> = PRICE_TOKEN
                        .find_iter(&passage.text)
                        .filter_map(|m| Price::parse(&m.as_str().replace(' ', "")).ok())
                        .collect();
                    if !stated.is_empty() && !stated.contains(&price) {
                        return Some(Defect::blocking(
                            DefectCategory::Inconsistent,
                            locator,
                            format!(
                                "artifact price {price} for {:?} contradicts grounding ({})",
                                item.name, passage.source
                            ),
                        ));
                    }
                }
            }
            None => {
                return Some(Defect::advisory(
                    DefectCategory::Ungrounded,
                    locator,
                    format!("no grounding passage supports {:?}", item.name),
                ));
            }
        }

        // 4. Cosmetic/structural nits.
        if item.image.as_ref().is_some_and(|img| img.is_placeholder()) {
            return Some(Defect::advisory(
                DefectCategory::Other,
                locator,
                format!("image description for {:?} is a placeholder", item.name),
            ));
        }
        if item.description.trim().is_empty() {
            return Some(Defect::advisory(
                DefectCategory::Other,
                locator,
                format!("{:?} has no customer-facing description", item.name),
            ));
        }

        None
    }
}

#[async_trait::async_trait]
impl CritiqueService for MenuCritic {
    async fn review(
        &self,
        artifact: &Artifact,
        items: &[MenuItem],
        grounding: &GroundingContext,
    ) -> Result<Verdict, CritiqueError> {
        let mut defects = Vec::new();

        // Structural entry-list check: duplication or omission shows up as a
        // manifest mismatch before per-item review.
        let expected: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        let declared: Vec<&str> = artifact
            .manifest()
            .item_names
            .iter()
            .map(String::as_str)
            .collect();
        if expected != declared {
            defects.push(Defect::blocking(
                DefectCategory::MissingField,
                Locator::Manifest,
                format!(
                    "artifact declares {} entries, expected {}",
                    declared.len(),
                    expected.len()
                ),
            ));
        }

        for (position, item) in items.iter().enumerate() {
            if let Some(defect) = Self::review_item(artifact, grounding, position, item) {
                defects.push(defect);
            }
        }

        // 2. Affordance presence: each missing marker is its own defect.
        for affordance in Affordance::ALL {
            if !artifact.declares_affordance(affordance) {
                defects.push(Defect::blocking(
                    DefectCategory::AffordanceMissing,
                    Locator::Manifest,
                    format!("required {} marker is absent", affordance.label()),
                ));
            }
        }

        // Run-level degradations surface as advisory notes on the document.
        for topic in &grounding.degraded_topics {
            defects.push(Defect::advisory(
                DefectCategory::Ungrounded,
                Locator::Document,
                format!("retrieval degraded for {}; claims unverified", topic.label()),
            ));
        }

        let verdict = Verdict::from_defects(defects);
        tracing::debug!(
            version = artifact.version(),
            pass = verdict.pass(),
            defects = verdict.defects().len(),
            "review complete"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MenuBuilder;
    use crate::services::{BuilderService, Passage};
    use menuforge_model::{Currency, Manifest, Severity};

    fn item(name: &str, cents: u64) -> MenuItem {
        MenuItem {
            name: name.to_string(),
            description: format!("{name} description"),
            price: Some(Price::new(cents, Currency::Usd)),
            category: None,
            image: None,
        }
    }

    fn grounding_for(items: &[MenuItem]) -> GroundingContext {
        GroundingContext {
            menu_passages: items
                .iter()
                .map(|i| {
                    Passage::new(
                        format!(
                            "{}. {} Price {}",
                            i.name,
                            i.description,
                            i.price.expect("test items have prices")
                        ),
                        1.0,
                        "menu item",
                    )
                })
                .collect(),
            style_passages: Vec::new(),
            degraded_topics: Vec::new(),
        }
    }

    async fn built(items: &[MenuItem], grounding: &GroundingContext) -> Artifact {
        MenuBuilder::new().build(items, grounding, None, 1).await.unwrap()
    }

    #[tokio::test]
    async fn complete_grounded_artifact_passes() {
        let items = vec![item("Calamari", 1250), item("Salad", 800)];
        let grounding = grounding_for(&items);
        let artifact = built(&items, &grounding).await;

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(verdict.pass(), "unexpected defects: {:?}", verdict.defects());
    }

    #[tokio::test]
    async fn missing_entry_is_blocking() {
        let items = vec![item("Calamari", 1250), item("Ghost Dish", 900)];
        let grounding = grounding_for(&items);
        // Build from a shorter list, review against the full one.
        let artifact = built(&items[..1], &grounding).await;

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(!verdict.pass());
        assert!(verdict.blocking().any(|d| {
            d.category == DefectCategory::MissingField && d.note.contains("Ghost Dish")
        }));
    }

    #[tokio::test]
    async fn unrendered_price_is_blocking_missing_field() {
        let items = vec![item("Calamari", 1250)];
        let grounding = grounding_for(&items);
        let rendered = built(&items, &grounding).await;
        // Strip the price paragraph but keep the declared manifest.
        let stripped = rendered
            .content()
            .replace("<p class=\"price\" data-affordance=\"edit\">$12.50</p>", "");
        let artifact = Artifact::new(1, stripped, rendered.manifest().clone()).unwrap();

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(verdict.blocking().any(|d| {
            d.category == DefectCategory::MissingField && d.note.contains("$12.50")
        }));
    }

    #[tokio::test]
    async fn missing_affordance_is_always_blocking() {
        let items = vec![item("Calamari", 1250)];
        let grounding = grounding_for(&items);
        let rendered = built(&items, &grounding).await;
        // Remove the export marker from content; manifest still declares it.
        let content = rendered
            .content()
            .replace("data-affordance=\"export\"", "data-x=\"none\"");
        let artifact = Artifact::new(1, content, rendered.manifest().clone()).unwrap();

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(verdict.blocking().any(|d| {
            d.category == DefectCategory::AffordanceMissing && d.note.contains("save/export")
        }));
    }

    #[tokio::test]
    async fn contradicting_price_is_blocking_inconsistent() {
        let items = vec![item("Calamari", 1250)];
        let grounding = GroundingContext {
            menu_passages: vec![Passage::new("Calamari. Price $14.00", 1.0, "menu item")],
            ..GroundingContext::empty()
        };
        let artifact = built(&items, &grounding).await;

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(verdict
            .blocking()
            .any(|d| d.category == DefectCategory::Inconsistent));
    }

    #[tokio::test]
    async fn ungrounded_claims_are_advisory_only() {
        let items = vec![item("Calamari", 1250)];
        let grounding = GroundingContext::empty();
        let artifact = built(&items, &grounding).await;

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(verdict.pass());
        assert!(verdict
            .defects()
            .iter()
            .any(|d| d.category == DefectCategory::Ungrounded && d.severity == Severity::Advisory));
    }

    #[tokio::test]
    async fn placeholder_image_is_advisory_never_blocking() {
        let mut items = vec![item("Calamari", 1250)];
        items[0].image = Some(menuforge_model::ImageDescription::placeholder(
            menuforge_model::AnchorId::new("img-1"),
        ));
        let grounding = grounding_for(&items);
        let artifact = built(&items, &grounding).await;

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(verdict.pass());
        assert!(verdict.defects().iter().any(|d| {
            d.severity == Severity::Advisory && d.note.contains("placeholder")
        }));
    }

    #[tokio::test]
    async fn review_is_deterministic_for_unchanged_artifact() {
        let items = vec![item("Calamari", 1250), item("Salad", 800)];
        let grounding = GroundingContext::empty();
        let artifact = built(&items, &grounding).await;

        let critic = MenuCritic::new();
        let first = critic.review(&artifact, &items, &grounding).await.unwrap();
        let second = critic.review(&artifact, &items, &grounding).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn manifest_entry_mismatch_is_blocking() {
        let items = vec![item("Calamari", 1250)];
        let grounding = grounding_for(&items);
        let rendered = built(&items, &grounding).await;
        let mut manifest: Manifest = rendered.manifest().clone();
        manifest.item_names.push("Duplicate".to_string());
        let artifact = Artifact::new(1, rendered.content().to_string(), manifest).unwrap();

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        assert!(verdict
            .blocking()
            .any(|d| d.locator == Locator::Manifest && d.category == DefectCategory::MissingField));
    }

    #[tokio::test]
    async fn defects_ordered_blocking_first_then_position() {
        let items = vec![item("First", 100), item("Second", 200)];
        let grounding = GroundingContext::empty();
        // Artifact built from only the second item: First missing (blocking),
        // Second ungrounded (advisory), manifest mismatch (blocking).
        let artifact = built(&items[1..], &grounding).await;

        let verdict = MenuCritic::new()
            .review(&artifact, &items, &grounding)
            .await
            .unwrap();
        let severities: Vec<Severity> = verdict.defects().iter().map(|d| d.severity).collect();
        let first_advisory = severities
            .iter()
            .position(|s| *s == Severity::Advisory)
            .unwrap_or(severities.len());
        assert!(severities[..first_advisory]
            .iter()
            .all(|s| *s == Severity::Blocking));
        assert!(severities[first_advisory..]
            .iter()
            .all(|s| *s == Severity::Advisory));
    }
}
