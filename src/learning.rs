//! Learning resources catalog
//!
//! Static, read-only content. Also the source of activity suggestions made
//! by the intake classifier.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningResource {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub time_to_read: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Lowercase words that make this resource the suggested activity
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LearningCatalog {
    resources: Vec<LearningResource>,
}

impl LearningCatalog {
    pub fn new(resources: Vec<LearningResource>) -> Self {
        Self { resources }
    }

    /// The catalog shipped with the service
    pub fn builtin() -> Self {
        Self::new(vec![
            resource(
                "box-breathing",
                "Box Breathing",
                "A four-count breathing pattern used by first responders to settle the body after a stressful call.",
                "Stress",
                "4 minutes",
                "Breathe in for four counts, hold for four, breathe out for four, hold for four. Repeat for four rounds.",
                Some("https://www.youtube.com/watch?v=tEmt1Znux58"),
                &["breathing", "breath", "panic", "calm"],
            ),
            resource(
                "body-scan",
                "Body Scan Meditation",
                "A guided scan from head to toe to notice and release tension.",
                "Mindfulness",
                "10 minutes",
                "Lie down or sit comfortably. Move your attention slowly through each part of the body, noticing tension without judging it.",
                None,
                &["meditation", "tension", "relax"],
            ),
            resource(
                "grounding-54321",
                "5-4-3-2-1 Grounding",
                "Use your senses to come back to the present moment.",
                "Stress",
                "5 minutes",
                "Name five things you can see, four you can touch, three you can hear, two you can smell and one you can taste.",
                None,
                &["anxious", "anxiety", "grounding", "overwhelmed"],
            ),
            resource(
                "shift-wind-down",
                "Winding Down After a Shift",
                "A short routine to separate work from home after a long or night shift.",
                "Sleep",
                "7 minutes",
                "Change out of uniform, take a short walk or stretch, write down anything still on your mind and dim the lights an hour before sleep.",
                None,
                &["sleep", "shift", "tired", "insomnia"],
            ),
            resource(
                "gratitude-journal",
                "Three Good Things",
                "A brief journaling exercise that builds resilience over time.",
                "Resilience",
                "5 minutes",
                "Before bed, write down three things that went well today and why they happened.",
                None,
                &["journal", "gratitude", "resilience"],
            ),
        ])
    }

    pub fn all(&self) -> &[LearningResource] {
        &self.resources
    }

    pub fn get(&self, id: &str) -> Option<&LearningResource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Resources in a category (case-insensitive); `all` returns everything
    pub fn by_category(&self, category: &str) -> Vec<&LearningResource> {
        if category.eq_ignore_ascii_case("all") {
            return self.all().iter().collect();
        }
        self.resources
            .iter()
            .filter(|r| r.category.eq_ignore_ascii_case(category))
            .collect()
    }

    /// Case-insensitive search over title, description and content
    pub fn search(&self, query: &str) -> Vec<&LearningResource> {
        let query = query.to_lowercase();
        self.resources
            .iter()
            .filter(|r| {
                r.title.to_lowercase().contains(&query)
                    || r.description.to_lowercase().contains(&query)
                    || r.content.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// First resource with a tag occurring in the lowercased message, else the
    /// first resource. `None` only for an empty catalog.
    pub fn suggest_for(&self, message_lower: &str) -> Option<&LearningResource> {
        self.resources
            .iter()
            .find(|r| r.tags.iter().any(|t| message_lower.contains(t.as_str())))
            .or_else(|| self.resources.first())
    }
}

#[allow(clippy::too_many_arguments)]
fn resource(
    id: &str,
    title: &str,
    description: &str,
    category: &str,
    time_to_read: &str,
    content: &str,
    video_url: Option<&str>,
    tags: &[&str],
) -> LearningResource {
    LearningResource {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        time_to_read: time_to_read.to_string(),
        content: content.to_string(),
        video_url: video_url.map(String::from),
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_are_unique() {
        let catalog = LearningCatalog::builtin();
        let mut ids: Vec<_> = catalog.all().iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.all().len());
    }

    #[test]
    fn test_by_category_is_case_insensitive() {
        let catalog = LearningCatalog::builtin();
        let stress = catalog.by_category("stress");
        assert_eq!(stress.len(), 2);
        assert!(stress.iter().all(|r| r.category == "Stress"));
        assert_eq!(catalog.by_category("ALL").len(), catalog.all().len());
        assert!(catalog.by_category("finance").is_empty());
    }

    #[test]
    fn test_search_matches_content() {
        let catalog = LearningCatalog::builtin();
        let hits = catalog.search("UNIFORM");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "shift-wind-down");
    }

    #[test]
    fn test_suggest_for_prefers_tag_match() {
        let catalog = LearningCatalog::builtin();
        let pick = catalog.suggest_for("any exercise for sleep?").unwrap();
        assert_eq!(pick.id, "shift-wind-down");
        let fallback = catalog.suggest_for("an activity please").unwrap();
        assert_eq!(fallback.id, "box-breathing");
    }

    #[test]
    fn test_suggest_for_empty_catalog() {
        assert!(LearningCatalog::default().suggest_for("activity").is_none());
    }
}
