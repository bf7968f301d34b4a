//! Builder agent: synthesizes the interactive menu artifact
//!
//! [`MenuBuilder`] is a deterministic renderer: the artifact is a pure
//! function of the menu items, the grounding context, and the feedback it
//! was handed. Revision does not patch the previous artifact; every version
//! is re-rendered from the items so resolved defects cannot linger.

use crate::error::BuildError;
use crate::retrieval::GroundingContext;
use crate::services::BuilderService;
use menuforge_model::{Affordance, Artifact, Defect, Manifest, MenuItem};
use std::fmt::Write as _;

const STYLE: &str = "\
body{font-family:Georgia,serif;margin:0;background:#faf7f2;color:#222}\
header{display:flex;justify-content:space-between;align-items:center;padding:1rem 2rem;background:#1d3557;color:#fff}\
main{display:grid;grid-template-columns:repeat(auto-fill,minmax(280px,1fr));gap:1rem;padding:2rem}\
.menu-card{background:#fff;border-radius:8px;padding:1rem;box-shadow:0 1px 4px rgba(0,0,0,.15)}\
.menu-card .price{font-weight:bold}\
.control{cursor:pointer}\
.feedback{padding:2rem}";

/// Escape text for HTML element content and attribute values
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Deterministic menu artifact builder
#[derive(Debug, Clone)]
pub struct MenuBuilder {
    title: String,
}

impl MenuBuilder {
    /// Create a builder with the default document title
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "Menu".to_string(),
        }
    }

    /// With a document title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn render_card(html: &mut String, position: usize, item: &MenuItem) {
        let name = escape_html(&item.name);
        let _ = write!(html, "<article class=\"menu-card\" data-item=\"{position}\"");
        if let Some(category) = &item.category {
            let _ = write!(html, " data-category=\"{}\"", escape_html(category));
        }
        html.push('>');

        if let Some(image) = &item.image {
            let caption = escape_html(&image.caption);
            let anchor = escape_html(image.anchor.as_str());
            let class = if image.is_placeholder() {
                " class=\"placeholder\""
            } else {
                ""
            };
            let _ = write!(
                html,
                "<figure{class} data-anchor=\"{anchor}\"><img src=\"{anchor}\" alt=\"{caption}\">\
                 <figcaption data-affordance=\"edit\">{caption}</figcaption></figure>"
            );
        }

        let _ = write!(html, "<h2 data-affordance=\"edit\">{name}</h2>");
        if let Some(price) = item.price {
            let _ = write!(
                html,
                "<p class=\"price\" data-affordance=\"edit\">{price}</p>"
            );
        }
        if !item.description.is_empty() {
            let _ = write!(
                html,
                "<p class=\"description\" data-affordance=\"edit\">{}</p>",
                escape_html(&item.description)
            );
        }
        let _ = write!(
            html,
            "<button class=\"control\" data-affordance=\"speak\">Read aloud</button>\
             <div class=\"rating\" data-rating=\"0\">&#9734;&#9734;&#9734;&#9734;&#9734;</div>"
        );
        html.push_str("</article>");
    }
}

impl Default for MenuBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BuilderService for MenuBuilder {
    async fn build(
        &self,
        items: &[MenuItem],
        grounding: &GroundingContext,
        prior_feedback: Option<&[Defect]>,
        version: u64,
    ) -> Result<Artifact, BuildError> {
        if items.is_empty() {
            return Err(BuildError::NoItems);
        }

        if let Some(feedback) = prior_feedback {
            tracing::debug!(
                version,
                defects = feedback.len(),
                "re-rendering with prior feedback"
            );
        }

        let title = escape_html(&self.title);
        let low_confidence = grounding.is_degraded() || grounding.is_empty();

        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
             <title>{title}</title><style>{STYLE}</style></head>"
        );
        let _ = write!(
            html,
            "<body{}>",
            if low_confidence {
                " data-confidence=\"low\""
            } else {
                ""
            }
        );
        let _ = write!(
            html,
            "<header><h1 data-affordance=\"edit\">{title}</h1>\
             <button class=\"control\" data-affordance=\"export\">Save / Export</button></header><main>"
        );

        for (position, item) in items.iter().enumerate() {
            Self::render_card(&mut html, position, item);
        }

        html.push_str(
            "</main><section class=\"feedback\" data-feedback>\
             <h2>General Feedback</h2><textarea></textarea>\
             <button class=\"control\" data-feedback-submit>Submit</button></section>\
             </body></html>",
        );

        let manifest = Manifest {
            assets: items
                .iter()
                .filter_map(|i| i.image.as_ref().map(|img| img.anchor.clone()))
                .collect(),
            affordances: Affordance::ALL.into_iter().collect(),
            item_names: items.iter().map(|i| i.name.clone()).collect(),
            acknowledged_defects: prior_feedback.map_or(0, <[Defect]>::len),
        };

        Ok(Artifact::new(version, html, manifest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use menuforge_model::{
        AnchorId, Currency, DefectCategory, ImageDescription, Locator, Price,
    };

    fn item(name: &str, cents: u64) -> MenuItem {
        MenuItem {
            name: name.to_string(),
            description: format!("{name} description"),
            price: Some(Price::new(cents, Currency::Usd)),
            category: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn renders_every_item_exactly_once() {
        let items = vec![item("Calamari", 1250), item("Salad", 800), item("Ribeye", 3800)];
        let artifact = MenuBuilder::new()
            .build(&items, &GroundingContext::empty(), None, 1)
            .await
            .unwrap();

        for (name, position) in [("Calamari", 0), ("Salad", 1), ("Ribeye", 2)] {
            assert_eq!(artifact.content().matches(&format!("<h2 data-affordance=\"edit\">{name}</h2>")).count(), 1);
            assert!(artifact
                .content()
                .contains(&format!("data-item=\"{position}\"")));
        }
        assert_eq!(artifact.manifest().item_names.len(), 3);
    }

    #[tokio::test]
    async fn declares_all_required_affordances() {
        let artifact = MenuBuilder::new()
            .build(&[item("Calamari", 1250)], &GroundingContext::empty(), None, 1)
            .await
            .unwrap();

        for affordance in Affordance::ALL {
            assert!(artifact.declares_affordance(affordance), "{affordance:?}");
        }
    }

    #[tokio::test]
    async fn empty_item_list_is_fatal() {
        let result = MenuBuilder::new()
            .build(&[], &GroundingContext::empty(), None, 1)
            .await;
        assert!(matches!(result, Err(BuildError::NoItems)));
    }

    #[tokio::test]
    async fn version_and_feedback_acknowledgement_flow_through() {
        let feedback = vec![Defect::blocking(
            DefectCategory::MissingField,
            Locator::Item {
                position: 0,
                name: "Calamari".to_string(),
            },
            "price not rendered",
        )];
        let artifact = MenuBuilder::new()
            .build(
                &[item("Calamari", 1250)],
                &GroundingContext::empty(),
                Some(&feedback),
                2,
            )
            .await
            .unwrap();

        assert_eq!(artifact.version(), 2);
        assert_eq!(artifact.manifest().acknowledged_defects, 1);
    }

    #[tokio::test]
    async fn empty_grounding_marks_low_confidence() {
        let artifact = MenuBuilder::new()
            .build(&[item("Calamari", 1250)], &GroundingContext::empty(), None, 1)
            .await
            .unwrap();
        assert!(artifact.content().contains("data-confidence=\"low\""));
    }

    #[tokio::test]
    async fn escapes_html_in_item_fields() {
        let mut spicy = item("Mac & Cheese <deluxe>", 900);
        spicy.description = "with \"extra\" cheddar".to_string();
        let artifact = MenuBuilder::new()
            .build(&[spicy], &GroundingContext::empty(), None, 1)
            .await
            .unwrap();

        assert!(artifact.content().contains("Mac &amp; Cheese &lt;deluxe&gt;"));
        assert!(!artifact.content().contains("<deluxe>"));
    }

    #[tokio::test]
    async fn placeholder_image_rendered_with_placeholder_class() {
        let mut with_image = item("Calamari", 1250);
        with_image.image = Some(ImageDescription::placeholder(AnchorId::new("img-1")));
        let artifact = MenuBuilder::new()
            .build(
                &[with_image],
                &GroundingContext::empty(),
                None,
                1,
            )
            .await
            .unwrap();

        assert!(artifact.content().contains("<figure class=\"placeholder\""));
        assert_eq!(artifact.manifest().assets, vec![AnchorId::new("img-1")]);
    }

    #[test]
    fn escape_html_covers_specials() {
        assert_eq!(
            escape_html(r#"<a href="x">&"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;"
        );
    }
}
