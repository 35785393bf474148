//! Prompt assembly. Pitch and speed are delivered by instructing the
//! model, not by local signal processing.

use super::TtsMode;

/// A supported synthesis language with its sample text.
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub default_text: &'static str,
}

pub const LANGUAGES: [Language; 6] = [
    Language {
        code: "bn-BD",
        name: "Bangla (BD)",
        default_text: "ক্যাফে ঝটপট — আপনার প্রিয় টেস্ট, সবসময় ফ্রেশ!",
    },
    Language {
        code: "en-US",
        name: "English",
        default_text: "Experience fresh and natural text-to-speech with Zotpot.",
    },
    Language {
        code: "es-ES",
        name: "Spanish",
        default_text: "La inteligencia artificial generativa está transformando el mundo.",
    },
    Language {
        code: "fr-FR",
        name: "French",
        default_text: "L'intelligence artificielle générative transforme le monde.",
    },
    Language {
        code: "hi-IN",
        name: "Hindi",
        default_text: "जनरेटिव एआई दुनिया को बदल रहा है।",
    },
    Language {
        code: "ja-JP",
        name: "Japanese",
        default_text: "生成AIは世界を変えています。",
    },
];

pub fn language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}

/// Build the final model prompt from the text and delivery selections.
/// Pitch and speed are steps in -2..=2, 0 meaning default delivery.
/// Instruction clauses join with commas, get a "Speak" prefix unless
/// already verb-led, and attach to the text with ": ".
pub fn build_prompt(text: &str, mode: TtsMode, pitch: i8, speed: i8, language_code: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    let mode_instruction = mode.instruction();
    if !mode_instruction.is_empty() {
        parts.push(mode_instruction);
    }

    match pitch {
        -2 => parts.push("with a very deep and low pitch"),
        -1 => parts.push("with a deep pitch"),
        1 => parts.push("with a high pitch"),
        2 => parts.push("with a very high pitch"),
        _ => {}
    }

    match speed {
        -2 => parts.push("speaking very slowly"),
        -1 => parts.push("speaking slowly"),
        1 => parts.push("speaking fast"),
        2 => parts.push("speaking very fast"),
        _ => {}
    }

    // Bangla gets a natural Bangladeshi accent.
    if language_code == "bn-BD" {
        parts.push("in a natural Bangladeshi accent");
    }

    let mut instruction = parts.join(", ");
    if !instruction.is_empty() {
        let lower = instruction.to_lowercase();
        let verb_led = ["speak", "narrate", "read", "recite"]
            .iter()
            .any(|verb| lower.starts_with(verb));
        if !verb_led {
            instruction = format!("Speak {instruction}");
        }
    }

    if instruction.is_empty() {
        text.to_string()
    } else {
        format!("{instruction}: {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(build_prompt("Hello", TtsMode::Normal, 0, 0, "en-US"), "Hello");
    }

    #[test]
    fn mode_instruction_leads() {
        assert_eq!(
            build_prompt("Once upon a time", TtsMode::Story, 0, 0, "en-US"),
            "Narrate this story with deep emotion: Once upon a time"
        );
    }

    #[test]
    fn pitch_and_speed_get_a_speak_prefix() {
        assert_eq!(
            build_prompt("Hello", TtsMode::Normal, 2, -1, "en-US"),
            "Speak with a very high pitch, speaking slowly: Hello"
        );
    }

    #[test]
    fn verb_led_instructions_keep_their_verb() {
        assert_eq!(
            build_prompt("Buy now", TtsMode::Ad, 1, 0, "en-US"),
            "Read this advertisement energetically and persuasively, with a high pitch: Buy now"
        );
    }

    #[test]
    fn bangla_adds_the_accent_clause() {
        assert_eq!(
            build_prompt("শুভ সকাল", TtsMode::Normal, 0, 0, "bn-BD"),
            "Speak in a natural Bangladeshi accent: শুভ সকাল"
        );
    }

    #[test]
    fn language_lookup_is_case_insensitive() {
        assert_eq!(language("EN-us").map(|l| l.name), Some("English"));
        assert!(language("xx-XX").is_none());
    }
}
