//! Splits a production plan into scenes.
//!
//! The plan is free text where each shot carries a `Narration:` line and,
//! somewhere after it, a `Prompt:` line. Everything else (shot headers,
//! `Visual:` notes, blank lines) is ignored.

use crate::types::Scene;

pub const NARRATION_LABEL: &str = "Narration:";
pub const PROMPT_LABEL: &str = "Prompt:";

#[derive(Default)]
struct PartialScene {
    narration: Option<String>,
    visual_prompt: Option<String>,
}

impl PartialScene {
    fn seal(&mut self) -> Option<Scene> {
        if self.narration.is_none() || self.visual_prompt.is_none() {
            return None;
        }

        let partial = std::mem::take(self);
        Some(Scene {
            narration: partial.narration?,
            visual_prompt: partial.visual_prompt?,
        })
    }
}

fn label_value(line: &str, label: &str) -> Option<Option<String>> {
    let value = line.strip_prefix(label)?.trim();
    Some((!value.is_empty()).then(|| value.to_string()))
}

/// Parse scenes in plan order.
///
/// A `Narration:` line replaces any narration not yet sealed into a scene, so
/// two narrations before one prompt keep only the second. A label with nothing
/// after it clears the pending value. Returns an empty vector when no complete
/// pair is found; callers treat that as a failed run.
pub fn parse_scenes(text: &str) -> Vec<Scene> {
    let mut scenes = Vec::new();
    let mut partial = PartialScene::default();

    for line in text.lines() {
        let line = line.trim();

        if let Some(narration) = label_value(line, NARRATION_LABEL) {
            partial.narration = narration;
        } else if let Some(prompt) = label_value(line, PROMPT_LABEL) {
            partial.visual_prompt = prompt;
            if let Some(scene) = partial.seal() {
                scenes.push(scene);
            }
        }
    }

    scenes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(narration: &str, visual_prompt: &str) -> Scene {
        Scene {
            narration: narration.to_string(),
            visual_prompt: visual_prompt.to_string(),
        }
    }

    #[test]
    fn test_parses_pairs_in_order() {
        let text = "Narration: Wake up.\nPrompt: sunrise\nNarration: Drink coffee.\nPrompt: coffee cup";

        assert_eq!(
            parse_scenes(text),
            vec![
                scene("Wake up.", "sunrise"),
                scene("Drink coffee.", "coffee cup")
            ]
        );
    }

    #[test]
    fn test_ignores_shot_headers_and_visual_notes() {
        let plan = "Shot 1:
Narration: Each day, greatness GETS UP before sunrise.
Visual: Alarm clock ringing at 5 AM
Prompt: Vintage alarm clock ringing, early morning light

Shot 2:
   Narration: Morning rituals? They're not just habits.
Visual: Entrepreneur making coffee
   Prompt: Professional person making coffee, modern kitchen   ";

        let scenes = parse_scenes(plan);
        assert_eq!(scenes.len(), 2);
        assert_eq!(
            scenes[1],
            scene(
                "Morning rituals? They're not just habits.",
                "Professional person making coffee, modern kitchen"
            )
        );
    }

    #[test]
    fn test_no_pairs_yields_empty() {
        assert!(parse_scenes("").is_empty());
        assert!(parse_scenes("Shot 1:\nVisual: a lake\n").is_empty());
        assert!(parse_scenes("Narration: dangling, never prompted").is_empty());
    }

    #[test]
    fn test_second_narration_wins() {
        let text = "Narration: first\nNarration: second\nPrompt: a field";
        assert_eq!(parse_scenes(text), vec![scene("second", "a field")]);
    }

    #[test]
    fn test_prompt_before_narration_is_held() {
        // The prompt stays pending until a later prompt line seals the pair.
        let text = "Prompt: early\nNarration: hello\nPrompt: late";
        assert_eq!(parse_scenes(text), vec![scene("hello", "late")]);
    }

    #[test]
    fn test_empty_label_values_never_seal() {
        let text = "Narration:   \nPrompt: mountains\nNarration: real line\nPrompt:\nPrompt: river";
        assert_eq!(parse_scenes(text), vec![scene("real line", "river")]);
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        assert!(parse_scenes("narration: hi\nprompt: there").is_empty());
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let text = "Narration: a\nPrompt: b\nNarration: c\nPrompt: d\nNarration: e\nPrompt: f";
        let first = parse_scenes(text);
        assert_eq!(first.len(), 3);
        assert_eq!(first, parse_scenes(text));
    }

    #[test]
    fn test_every_scene_is_non_empty() {
        let text = "Narration: x\nPrompt: \nPrompt: y\nNarration:\nPrompt: z";
        for s in parse_scenes(text) {
            assert!(!s.narration.trim().is_empty());
            assert!(!s.visual_prompt.trim().is_empty());
        }
    }
}
