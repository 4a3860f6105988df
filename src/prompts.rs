//! Fixed instruction texts and final-prompt composition.

pub const NEGATIVE_PROMPT: &str = "Avoid: cartoon, 3d render, anime, painting, watermark, text, \
signature, low quality, blurry, deformed, disfigured, ugly, noise.";

pub const PHOTOREALISM_DIRECTIVE: &str = "A photorealistic, highly detailed image of:";

pub const CINEMATIC_STYLE: &str = "Style: cinematic, professional photography.";

/// Standalone "analyze an image to create a prompt".
pub const FORENSIC_ANALYSIS_INSTRUCTION: &str = "You are a professional photographic analyst. \
Your task is to perform a forensic-level analysis of the provided image and generate a highly \
precise, detailed, and structured description. This description must be so accurate that an AI \
image generator can replicate the image with 100% fidelity.

Break down your analysis into the following strict components:
- Subject Description: Meticulously detail every facial feature, expression, eye color, hair \
style/color/texture, age, and body type.
- Clothing & Attire: Describe every item of clothing, including its material, texture, color, \
pattern, and fit. Detail all accessories like jewelry, watches, or glasses.
- Pose & Composition: Precisely describe the pose, the angle of the head, position of limbs, and \
body language. Detail the shot type, camera angle, and the compositional rules applied.
- Lighting & Atmosphere: Analyze the lighting setup. Identify the key light, fill light, and \
backlight. Describe the color temperature of the light and the mood it creates.
- Environment/Setting: Describe the background and foreground in detail: location, objects, \
colors, and textures.
- Artistic Style: Specify the overall style and the camera settings that likely produced this \
look.

Synthesize these structured points into a single, comprehensive, and highly descriptive \
paragraph. This is the final and only output you should provide.";

/// Reference images analysed ahead of a generation.
pub const REFERENCE_ANALYSIS_INSTRUCTION: &str = "Analyze the following image(s) with extreme \
detail to create a precise description for an image generator. Extract the most important \
details. Combine this into a concise, single paragraph.";

/// Re-analysis of a generated image picked for editing.
pub const EDIT_ANALYSIS_INSTRUCTION: &str = "Analyze this image in detail. Describe the subject, \
clothing, setting, lighting, and artistic style. Create a descriptive paragraph that could be \
used to generate a similar image.";

pub const EDIT_NO_DESCRIPTION_PROMPT: &str =
    "Could not generate a prompt. Please describe the image manually.";

pub const EDIT_FAILED_PROMPT: &str =
    "Analysis failed. Please describe the image and your desired changes.";

/// Master prompt before summarization: the user request, merged with the
/// reference description when there is one.
pub fn master_prompt(user_prompt: &str, reference_description: Option<&str>) -> String {
    match reference_description {
        Some(description) => format!(
            "Based on this detailed scene: \"{}\", create an image that incorporates the \
             following request: {}",
            description, user_prompt
        ),
        None => user_prompt.to_string(),
    }
}

pub fn summarizer_instruction(master: &str) -> String {
    format!(
        "You are an expert prompt engineer. Summarize the following user request into a concise, \
         highly descriptive paragraph suitable for an AI image generator. Focus on the key visual \
         elements: subject, action, clothing, setting, and style. The user's request is: \"{}\"",
        master
    )
}

/// Final prompt after summarization (or its fallback).
pub fn compose_distilled(distilled: &str) -> String {
    format!(
        "{} {}. {}",
        PHOTOREALISM_DIRECTIVE,
        distilled.trim(),
        NEGATIVE_PROMPT
    )
}

/// Final prompt without a summarization round trip.
pub fn compose_direct(user_prompt: &str, reference_description: Option<&str>) -> String {
    match reference_description {
        Some(description) => format!(
            "Based on this detailed scene: \"{}\", create a new photorealistic image that applies \
             the following specific change: \"{}\". All other details from the scene should \
             remain as described. {}",
            description, user_prompt, NEGATIVE_PROMPT
        ),
        None => format!(
            "{} {}. {} {}",
            PHOTOREALISM_DIRECTIVE, user_prompt, CINEMATIC_STYLE, NEGATIVE_PROMPT
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_prompt_without_references_is_the_user_prompt() {
        assert_eq!(master_prompt("a red bicycle", None), "a red bicycle");
        let merged = master_prompt("make it red", Some("a bicycle by a wall"));
        assert!(merged.contains("\"a bicycle by a wall\""));
        assert!(merged.ends_with("make it red"));
    }

    #[test]
    fn composed_prompts_end_with_negative_suffix() {
        let distilled = compose_distilled("  a red bicycle  ");
        assert_eq!(
            distilled,
            format!("A photorealistic, highly detailed image of: a red bicycle. {}", NEGATIVE_PROMPT)
        );
        assert!(compose_direct("a cat", None).ends_with(NEGATIVE_PROMPT));
        assert!(compose_direct("a cat", Some("a dog")).ends_with(NEGATIVE_PROMPT));
        assert!(compose_direct("a cat", None).contains(CINEMATIC_STYLE));
    }
}
