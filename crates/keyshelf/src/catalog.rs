//! Well-known services offered when adding a key

/// A preset service and the category its keys default to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetService {
    pub name: &'static str,
    pub category: &'static str,
}

const fn service(name: &'static str, category: &'static str) -> PresetService {
    PresetService { name, category }
}

pub const PRESET_SERVICES: &[PresetService] = &[
    service("ElevenLabs", "Text-to-Speech"),
    service("Operative", "Web Evaluation Agent"),
    service("OpenAI", "Image Generation"),
    service("Everart Forge", "Image Generation"),
    service("Brave Search", "Web Search"),
    service("Figma", "Design Tool Integration"),
    service("Perplexity", "AI Search & Research"),
    service("Firecrawl", "Web Scraping"),
    service("Resend", "Email Sending"),
];

/// Look up a preset by name, ignoring case
pub fn preset(service: &str) -> Option<&'static PresetService> {
    PRESET_SERVICES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(service.trim()))
}

/// Split a comma separated category list, e.g. "work, ai,,billing"
pub fn parse_categories(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Use the preset category when none were given for a preset service
pub fn default_categories(service: &str, given: Vec<String>) -> Vec<String> {
    if !given.is_empty() {
        return given;
    }
    match preset(service) {
        Some(p) => vec![p.category.to_string()],
        None => given,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup() {
        assert_eq!(preset("openai").unwrap().category, "Image Generation");
        assert_eq!(preset(" Brave Search ").unwrap().name, "Brave Search");
        assert!(preset("Unknown").is_none());
    }

    #[test]
    fn test_parse_categories() {
        assert_eq!(
            parse_categories("work, ai,,  billing ,"),
            vec!["work", "ai", "billing"]
        );
        assert!(parse_categories("").is_empty());
        assert!(parse_categories(" , ").is_empty());
        // Duplicates are kept as given
        assert_eq!(parse_categories("a,a"), vec!["a", "a"]);
    }

    #[test]
    fn test_default_categories() {
        assert_eq!(default_categories("Resend", vec![]), vec!["Email Sending"]);
        assert_eq!(
            default_categories("Resend", vec!["mail".to_string()]),
            vec!["mail"]
        );
        assert!(default_categories("Custom Thing", vec![]).is_empty());
    }
}
