//! Prompts for trip and packing generation, and parsing of the model's
//! JSON replies.

use super::generation::PackingRequest;
use super::model::{TripPlan, UserProfile, format_date_range};

const TRIP_SYSTEM_PROMPT: &str = "\
You are Vibe Booking, a travel planner that matches trips to a traveller's mood.

Recommend one trip for the traveller described below.
Guidelines:
- If no destination is given, choose one that fits their preferred destination type and vibes.
- Respect the departure location, dates, and travel companions.
- Keep descriptions short and concrete.

Respond with a single JSON object:
{
  \"destination\": \"City, Country\",
  \"summary\": \"one or two sentences\",
  \"highlights\": [\"string\"],
  \"itinerary\": [{\"day\": 1, \"title\": \"string\", \"activities\": [\"string\"]}],
  \"accommodation\": \"string\",
  \"gettingThere\": \"string\",
  \"estimatedBudget\": \"string\"
}

ONLY output the JSON object. No other text.";

const PACKING_SYSTEM_PROMPT: &str = "\
You are VibePack, a packing assistant that tailors lists to a trip's vibe.

Build a packing list for the trip described below.
Guidelines:
- Account for the destination's likely weather on the given dates.
- Group clothing by category (for example tops, bottoms, outerwear, footwear).
- Every item gets a short, practical tip.
- Suggest a few products under shopTheLook that suit the primary vibe.

Respond with a single JSON object:
{
  \"clothing\": {\"category\": [{\"item\": \"string\", \"tip\": \"string\"}]},
  \"essentials\": [{\"item\": \"string\", \"tip\": \"string\"}],
  \"shopTheLook\": [{\"name\": \"string\", \"description\": \"string\", \"price\": \"string\"}]
}

ONLY output the JSON object. No other text.";

/// System prompt for trip recommendation.
pub fn trip_system_prompt() -> &'static str {
    TRIP_SYSTEM_PROMPT
}

/// System prompt for packing recommendation.
pub fn packing_system_prompt() -> &'static str {
    PACKING_SYSTEM_PROMPT
}

/// User prompt for trip recommendation, built only from the two records.
pub fn trip_user_prompt(profile: &UserProfile, trip_plan: &TripPlan) -> String {
    format!(
        "{}\n\n{}",
        profile.to_prompt_section(),
        trip_plan.to_prompt_section()
    )
}

/// User prompt for packing recommendation.
pub fn packing_user_prompt(request: &PackingRequest) -> String {
    let destination = if request.destination.is_empty() {
        "the recommended destination"
    } else {
        request.destination.as_str()
    };
    format!(
        "{profile}\n\n# Trip\n\
         - **Destination:** {destination}\n\
         - **Departing from:** {from}\n\
         - **Dates:** {dates}\n\
         - **Primary vibe:** {vibe}",
        profile = request.profile.to_prompt_section(),
        from = request.from_location,
        dates = format_date_range(request.start_date, request.end_date),
        vibe = request.primary_vibe,
    )
}

/// Locate the recommendation object in a model reply.
///
/// Replies sometimes wrap the object in a fenced block or add prose around
/// it. Returns `None` when the reply holds no `{...}` span at all.
pub fn find_json_object(reply: &str) -> Option<&str> {
    fenced_block(reply)
        .and_then(object_span)
        .or_else(|| object_span(reply))
}

/// Body of the first ``` fence, minus an optional `json` tag.
fn fenced_block(reply: &str) -> Option<&str> {
    let (_, rest) = reply.split_once("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let (body, _) = rest.split_once("```")?;
    Some(body)
}

fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::wizard::model::Persona;

    fn profile() -> UserProfile {
        UserProfile {
            age: 34,
            gender: "other".into(),
            preferred_destination_type: "mountains".into(),
            persona: Some(Persona::Adventurer),
        }
    }

    #[test]
    fn trip_prompt_includes_profile_and_plan() {
        let mut plan = TripPlan::new("Seattle, WA");
        plan.destination = "Banff".into();
        plan.vibes = vec!["adventure".into(), "nature".into()];

        let prompt = trip_user_prompt(&profile(), &plan);
        assert!(prompt.contains("34"));
        assert!(prompt.contains("mountains"));
        assert!(prompt.contains("adventurer"));
        assert!(prompt.contains("Banff"));
        assert!(prompt.contains("Seattle, WA"));
        assert!(prompt.contains("adventure, nature"));
    }

    #[test]
    fn packing_prompt_names_primary_vibe_and_dates() {
        let request = PackingRequest {
            destination: "Reykjavik".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 9),
            primary_vibe: "relax".into(),
            profile: profile(),
            from_location: "Boston, MA".into(),
        };
        let prompt = packing_user_prompt(&request);
        assert!(prompt.contains("Reykjavik"));
        assert!(prompt.contains("Boston, MA"));
        assert!(prompt.contains("Jan 5, 2025 - Jan 9, 2025"));
        assert!(prompt.contains("**Primary vibe:** relax"));
    }

    #[test]
    fn packing_prompt_without_destination() {
        let request = PackingRequest {
            destination: String::new(),
            start_date: None,
            end_date: None,
            primary_vibe: "adventure".into(),
            profile: profile(),
            from_location: "Home".into(),
        };
        let prompt = packing_user_prompt(&request);
        assert!(prompt.contains("the recommended destination"));
        assert!(prompt.contains("Date TBD - Date TBD"));
    }

    #[test]
    fn system_prompts_demand_json() {
        assert!(trip_system_prompt().contains("ONLY output the JSON object"));
        assert!(packing_system_prompt().contains("shopTheLook"));
    }

    #[test]
    fn finds_bare_object() {
        let reply = r#"{"destination": "Bali"}"#;
        assert_eq!(find_json_object(reply), Some(reply));
    }

    #[test]
    fn finds_object_in_fenced_block() {
        let reply = "Here you go:\n```json\n{\"essentials\": []}\n```\nHave fun {or not}";
        assert_eq!(find_json_object(reply), Some("{\"essentials\": []}"));
    }

    #[test]
    fn finds_object_in_prose() {
        let reply = "Here is your trip: {\"destination\": \"Oaxaca\"} enjoy!";
        assert_eq!(find_json_object(reply), Some("{\"destination\": \"Oaxaca\"}"));
    }

    #[test]
    fn fence_without_object_falls_back_to_reply() {
        let reply = "```\nno luck\n``` but {\"destination\": \"Lima\"}";
        assert_eq!(find_json_object(reply), Some("{\"destination\": \"Lima\"}"));
    }

    #[test]
    fn reply_without_object() {
        assert_eq!(find_json_object("I cannot help with that."), None);
        assert_eq!(find_json_object("[1, 2, 3]"), None);
        assert_eq!(find_json_object("} backwards {"), None);
    }
}
