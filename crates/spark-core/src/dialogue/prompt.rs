//! Prompt text and role vocabulary

use crate::chat::ChatRole;

/// Persona instruction sent ahead of a user's first-ever question
pub const SYSTEM_PROMPT: &str = "\
You are Professor Spark, a friendly, enthusiastic, and knowledgeable AI mentor.
Your mission is to make science exciting and easy to understand for high school students.
You specialize in General Science concepts. Address the student by their name if provided.

When a student asks a question:
1. Respond in English.
2. Explain the concept clearly and simply.
3. Use analogies or simple examples if helpful.
4. Maintain a positive and encouraging tone.
5. If the question is not related to science, politely state that your expertise is in science.
   For example: \"That's interesting, [User's Name]! However, my expertise is science. Any science questions for me?\"
6. Keep answers concise but helpful. Structure well.";

/// Shown to the user when the model could not answer
pub const APOLOGY_MESSAGE: &str = "Sorry, I couldn't process that right now. Please try again.";

/// Mapping from stored roles to a provider's role labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleLabels {
    pub user: &'static str,
    pub assistant: &'static str,
}

impl RoleLabels {
    /// Gemini calls the assistant "model"
    pub const GEMINI: RoleLabels = RoleLabels {
        user: "user",
        assistant: "model",
    };

    pub fn label(&self, role: ChatRole) -> &'static str {
        match role {
            ChatRole::User => self.user,
            ChatRole::Assistant => self.assistant,
        }
    }
}

impl Default for RoleLabels {
    fn default() -> Self {
        Self::GEMINI
    }
}

/// The question as sent to the model, annotated with who is asking
pub fn question_prompt(display_name: Option<&str>, question: &str) -> String {
    let intro = match display_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("My name is {}.", name),
        None => "I haven't provided my name.".to_string(),
    };
    format!("{} My question is: {}", intro, question)
}

/// Prefix the persona instruction onto a prompt
pub fn with_system_prompt(prompt: &str) -> String {
    format!("{}\n\n{}", SYSTEM_PROMPT, prompt)
}
