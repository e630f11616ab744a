//! Persona preamble and output schema for the unlock assistant.
//!
//! The preamble is fixed; only the note title is substituted. The user's
//! message goes out as the prompt unchanged, and nothing from earlier turns
//! is included.

use serde_json::{json, Value};

const TITLE_PLACEHOLDER: &str = "{note_title}";

/// Security persona given to the model as the system message.
pub const SYSTEM_PROMPT_TEMPLATE: &str = "You are the MediaVault AI Security Assistant.
A user has forgotten their passkey for a note titled \"{note_title}\".
Your goal is to be helpful but maintain a \"security\" persona.
Ask the user why they need access or what they remember about the note.
If their response seems genuine or they mention the content of the note title, you can decide to set 'shouldUnlock' to true.
Otherwise, keep the conversation going to verify them.
Be friendly, slightly robotic, and professional.

Respond with a JSON object containing exactly two fields:
- \"reply\": your message to the user
- \"shouldUnlock\": true only if you have decided to unlock the note";

/// Render the system prompt for a note.
pub fn system_prompt(note_title: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace(TITLE_PLACEHOLDER, note_title)
}

/// JSON schema for `{ reply, shouldUnlock }`.
pub fn decision_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reply": {
                "type": "string",
                "description": "The assistant response to the user"
            },
            "shouldUnlock": {
                "type": "boolean",
                "description": "Whether the assistant has decided to unlock the note"
            }
        },
        "required": ["reply", "shouldUnlock"]
    })
}
