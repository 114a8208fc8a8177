//! Prompts for the LLM-backed planner

use super::types::PageContext;

/// Page text beyond this many characters is cut from the prompt
const PAGE_TEXT_PREVIEW_CHARS: usize = 2000;

/// System prompt for turning a goal into browser steps
pub const GOAL_PLANNING_PROMPT: &str = r#"You are an intelligent browser automation assistant. Parse the user's goal into executable browser commands.

CRITICAL: Return ONLY ONE JSON object. Put ALL steps in a single "steps" array. Do NOT return multiple JSON objects.

Return ONLY this SINGLE JSON structure (no markdown, no explanations):
{
  "intent": "multi_step",
  "steps": [
    {"action": "navigate", "url": "https://example.com"},
    {"action": "input", "selector": "input[name='q']", "text": "search term"},
    {"action": "click", "selector": "button[type='submit']"}
  ],
  "confidence": 0.95
}

For goals like "find X on Y.com" or "search for X on Y.com", put every step in the same steps array:
navigate to the site, input the search term, click the search button.

Available actions:
- "navigate": Navigate to a URL (requires "url")
- "input": Type text into an input field (requires "selector" and "text")
- "click": Click an element (requires "selector")
- "get_content": Extract page content (no additional fields)

Rules:
- For "find X", "search for X" or "look for X" with no site: navigate to google.com, input X, click the search button
- For "look for X on Y.com": navigate to Y.com, input X in its search box, click its search button
- For navigation goals, extract the URL or use the common site name (google.com, github.com, amazon.com)
- Use input[name='q'] or textarea[name='q'] for the Google search box
- Use input[name='field-keywords'] for the Amazon search box
- Use button[name='btnK'] or input[type='submit'] for the Google search button
- NEVER use "find", "search" or "locate" actions, they do not exist
- ONLY use: "navigate", "input", "click", "get_content"

When page context is provided, use it to pick selectors that exist on the current page.
"#;

/// Build the user message for a goal, grounding it in the current page if known
pub fn build_goal_message(goal: &str, context: Option<&PageContext>) -> String {
    let mut message = String::new();

    if let Some(ctx) = context.filter(|c| !c.url.is_empty()) {
        message.push_str("CURRENT PAGE CONTEXT (you are on this page):\n");
        message.push_str(&format!("- URL: {}\n", ctx.url));
        message.push_str(&format!("- Title: {}\n", ctx.title));
        message.push_str(&format!("- Content Type: {}\n", ctx.content_type));

        if !ctx.text.is_empty() {
            message.push_str(&format!(
                "- Page Content Preview: {}\n",
                preview(&ctx.text, PAGE_TEXT_PREVIEW_CHARS)
            ));
        }

        message.push_str(
            "\nUse this context to find items mentioned in the goal and to generate selectors \
             that match the actual page structure.\n\n",
        );
    }

    message.push_str(&format!("User Goal: {}\n\nReturn JSON:", goal));
    message
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
