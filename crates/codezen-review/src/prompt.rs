//! Prompt construction for reviews and follow-up questions.
//!
//! Both builders are pure functions of their inputs. The review prompt pins
//! the model to a strict JSON contract; [`crate::effort`] copes with models
//! that ignore it.

use std::fmt::Write;

use codezen_core::{Comment, CommentRole};

const REVIEW_PREAMBLE: &str = "\
You are a senior software engineer performing a professional code review.
Analyze the following code and provide structured feedback.
";

const GUIDELINES_HEADER: &str = "IMPORTANT PROJECT-SPECIFIC GUIDELINES:";

const OUTPUT_CONTRACT: &str = "\
CRITICAL INSTRUCTION: You MUST respond with ONLY valid JSON. No text before or after the JSON object.

REQUIRED JSON STRUCTURE (copy this format exactly):
{
  \"summary\": \"A brief one-sentence overview identifying the main issues\",
  \"findings\": [
    {\"line\": 3, \"type\": \"type-error\", \"message\": \"Function add() returns number but result is typed as string\", \"suggestion\": \"Change 'const result: string = add(5, 10);' to 'const result: number = add(5, 10);'\"},
    {\"line\": 15, \"type\": \"bug\", \"message\": \"Description of the bug\", \"suggestion\": \"Fixed code: 'corrected code here'\"},
    {\"line\": 42, \"type\": \"performance\", \"message\": \"Performance concern\", \"suggestion\": \"Optimization with example code if applicable\"}
  ],
  \"effort_estimation\": \"X/10\"
}
";

const REVIEW_CRITERIA: &str = "\
REVIEW CRITERIA (analyze for):
  1. Type errors (type mismatches, incorrect type annotations)
  2. Syntax errors and compilation issues
  3. Logic errors and bugs
  4. Code quality and best practices
  5. Performance optimizations
  6. Security vulnerabilities
  7. Style consistency and maintainability
  8. Potential edge cases

For EACH finding, provide:
  1. The exact line number where the issue occurs
  2. The type of issue (bug, type-error, security, performance, style)
  3. A clear description of the problem
  4. A COMPLETE code fix or improvement in the 'suggestion' field.
     For bugs and type errors the suggestion MUST contain the corrected code.
";

const EFFORT_RUBRIC: &str = "\
EFFORT ESTIMATION GUIDE:
  1-3/10: Minor style issues, very easy to fix
  4-6/10: Some bugs or refactoring needed, moderate effort
  7-9/10: Multiple issues, significant refactoring required
  10/10: Major rewrite needed
";

const REVIEW_CLOSING: &str = "\
IMPORTANT: Start your response directly with { and end with }. \
No markdown code blocks, no explanations, ONLY the JSON object.";

const CHAT_PREAMBLE: &str = "\
You are an AI code review assistant. The user is asking a question about a code review you previously performed.
";

const CHAT_CLOSING: &str = "\
Please provide a helpful, clear, and concise answer to the user's question. \
Base your response on the code and review above. \
If the question asks for code examples or fixes, provide them in a clear format. \
Keep your response focused and relevant to the code review context.";

/// Build the prompt for an initial review of `code`.
///
/// The guideline block is emitted only when `guidelines` is non-empty, one
/// `- <text>` line per guideline in the order given.
///
/// # Examples
///
/// ```
/// use codezen_review::prompt::build_review_prompt;
///
/// let prompt = build_review_prompt("let x: number = 'a';", "typescript", &["No any types"]);
/// assert!(prompt.contains("```typescript\nlet x: number = 'a';\n```"));
/// assert!(prompt.contains("- No any types\n"));
/// assert!(prompt.ends_with("ONLY the JSON object."));
/// ```
pub fn build_review_prompt<S: AsRef<str>>(code: &str, language: &str, guidelines: &[S]) -> String {
    let mut prompt = String::with_capacity(code.len() + 2048);
    prompt.push_str(REVIEW_PREAMBLE);
    prompt.push('\n');

    if !guidelines.is_empty() {
        prompt.push_str(GUIDELINES_HEADER);
        prompt.push('\n');
        for guideline in guidelines {
            let _ = writeln!(prompt, "- {}", guideline.as_ref());
        }
        prompt.push('\n');
    }

    let _ = write!(prompt, "CODE TO REVIEW:\n```{language}\n{code}\n```\n\n");
    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push('\n');
    prompt.push_str(REVIEW_CRITERIA);
    prompt.push('\n');
    prompt.push_str(EFFORT_RUBRIC);
    prompt.push('\n');
    prompt.push_str(REVIEW_CLOSING);
    prompt
}

/// Build the prompt for a follow-up question about an earlier review.
///
/// `history` is rendered in the order given, `User: ` for
/// [`CommentRole::User`] entries and `You: ` for [`CommentRole::Ai`].
///
/// # Examples
///
/// ```
/// use codezen_review::prompt::build_chat_prompt;
///
/// let prompt = build_chat_prompt("fn f() {}", "{\"summary\":\"fine\"}", &[], "Why fine?");
/// assert!(prompt.contains("YOUR PREVIOUS REVIEW:\n{\"summary\":\"fine\"}"));
/// assert!(prompt.contains("USER'S QUESTION:\nWhy fine?"));
/// assert!(!prompt.contains("CONVERSATION HISTORY"));
/// ```
pub fn build_chat_prompt(
    code: &str,
    previous_review: &str,
    history: &[Comment],
    question: &str,
) -> String {
    let mut prompt = String::with_capacity(code.len() + previous_review.len() + 1024);
    prompt.push_str(CHAT_PREAMBLE);
    prompt.push('\n');

    let _ = write!(prompt, "ORIGINAL CODE THAT WAS REVIEWED:\n```\n{code}\n```\n\n");
    let _ = write!(prompt, "YOUR PREVIOUS REVIEW:\n{previous_review}\n\n");

    if !history.is_empty() {
        prompt.push_str("CONVERSATION HISTORY:\n");
        for comment in history {
            let speaker = match comment.role {
                CommentRole::User => "User",
                CommentRole::Ai => "You",
            };
            let _ = writeln!(prompt, "{speaker}: {}", comment.message);
        }
        prompt.push('\n');
    }

    let _ = write!(prompt, "USER'S QUESTION:\n{question}\n\n");
    prompt.push_str(CHAT_CLOSING);
    prompt
}
