//! Prompt templates.
//!
//! Templates use `{name}` placeholders. Only known placeholders are
//! substituted, so literal braces in JSON examples are left alone.

use serde::{Deserialize, Serialize};

use crate::record::User;

const DEFAULT_USER_PROMPT: &str = r#"Generate {count} realistic, diverse professional user profiles for a calendar application.
Use varied names, professions and timezones. Every email must be unique.

Return ONLY a JSON array with exactly {count} objects of this shape:
[
  {
    "name": "Full Name",
    "email": "first.last@example.com",
    "timezone": "America/New_York",
    "profession": "Software Engineer",
    "preferences": {
      "working_hours": {"start": "09:00", "end": "17:00"},
      "meeting_duration": "30 minutes",
      "calendar_view": "week"
    }
  }
]"#;

const DEFAULT_EVENT_PROMPT: &str = r#"Generate {count} realistic calendar events for {user_name}, a {profession} in the {timezone} timezone who works {working_hours}.
Events should fit the profession and mostly fall within working hours.

Return ONLY a JSON array with exactly {count} objects of this shape:
[
  {
    "title": "Event title",
    "description": "Short description",
    "start_time": "2025-01-15T10:00:00Z",
    "end_time": "2025-01-15T11:00:00Z",
    "location": "Conference Room A",
    "attendees": ["colleague@example.com"],
    "category": "meeting",
    "priority": "medium",
    "recurrence": null
  }
]
category is one of meeting, appointment, personal, work. priority is one of high, medium, low."#;

fn default_user_prompt() -> String {
    DEFAULT_USER_PROMPT.to_string()
}

fn default_event_prompt() -> String {
    DEFAULT_EVENT_PROMPT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompts {
    /// Placeholders: `{count}`
    #[serde(default = "default_user_prompt")]
    pub user_generation: String,
    /// Placeholders: `{count}`, `{user_name}`, `{profession}`, `{timezone}`, `{working_hours}`
    #[serde(default = "default_event_prompt")]
    pub event_generation: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Prompts {
            user_generation: default_user_prompt(),
            event_generation: default_event_prompt(),
        }
    }
}

impl Prompts {
    pub fn users(&self, count: u32) -> String {
        render(&self.user_generation, &[("count", count.to_string())])
    }

    pub fn events(&self, user: &User, count: u32) -> String {
        render(
            &self.event_generation,
            &[
                ("count", count.to_string()),
                ("user_name", user.name.clone()),
                ("profession", user.profession.clone()),
                ("timezone", user.timezone.clone()),
                ("working_hours", user.preferences.working_hours.to_string()),
            ],
        )
    }
}

/// Substitute `{key}` placeholders in one pass over the template, so
/// substituted values are never expanded again.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let found = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (value, close))
        });

        match found {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_leaves_json_braces_alone() {
        let out = render("{count} of {\"a\": 1} {unknown}", &[("count", "3".to_string())]);
        assert_eq!(out, "3 of {\"a\": 1} {unknown}");
    }

    #[test]
    fn test_render_does_not_expand_substituted_values() {
        let out = render(
            "{user_name} in {timezone}",
            &[
                ("user_name", "{timezone}".to_string()),
                ("timezone", "UTC".to_string()),
            ],
        );
        assert_eq!(out, "{timezone} in UTC");
    }

    #[test]
    fn test_render_handles_nested_braces() {
        let out = render("{{count}} {", &[("count", "2".to_string())]);
        assert_eq!(out, "{2} {");
    }

    #[test]
    fn test_user_prompt_substitutes_count() {
        let prompt = Prompts::default().users(7);
        assert!(prompt.contains("Generate 7 realistic"));
        assert!(!prompt.contains("{count}"));
    }

    #[test]
    fn test_event_prompt_embeds_user_context() {
        let user = User::from_raw(&json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "timezone": "Europe/London",
            "profession": "Mathematician",
            "preferences": {"working_hours": {"start": "10:00", "end": "18:00"}}
        }))
        .unwrap();

        let prompt = Prompts::default().events(&user, 3);
        assert!(prompt.contains("Generate 3 realistic calendar events for Ada Lovelace"));
        assert!(prompt.contains("a Mathematician in the Europe/London timezone"));
        assert!(prompt.contains("works 10:00 - 18:00"));
    }
}
