use codezen_core::{CodezenError, Comment, CommentRole, Guideline, Project, Review, User};
use codezen_store::Store;
use serde::Serialize;

use crate::effort::extract_effort;
use crate::llm::LlmClient;
use crate::prompt;

/// Model output for one code snapshot plus the effort pulled out of it.
///
/// # Examples
///
/// ```
/// use codezen_review::pipeline::ReviewOutcome;
///
/// let outcome = ReviewOutcome {
///     response: "{\"effort_estimation\": \"3/10\"}".into(),
///     effort_estimation: Some("3/10".into()),
/// };
/// assert_eq!(outcome.effort_estimation.as_deref(), Some("3/10"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// Raw model text, or the client's fallback text.
    pub response: String,
    /// Extracted effort, if any rule matched.
    pub effort_estimation: Option<String>,
}

/// Review `code` without touching storage.
///
/// Shared by [`ReviewService::create_review`] and the one-shot CLI command.
pub async fn review_code<S: AsRef<str>>(
    llm: &LlmClient,
    code: &str,
    language: &str,
    guidelines: &[S],
) -> ReviewOutcome {
    let prompt = prompt::build_review_prompt(code, language, guidelines);
    let response = llm.review(&prompt).await;
    let effort_estimation = extract_effort(&response);
    ReviewOutcome {
        response,
        effort_estimation,
    }
}

/// Sequences persistence and generation for projects, reviews, guidelines,
/// and follow-up comments.
///
/// Every operation is scoped to the calling [`User`]: records owned by
/// someone else behave exactly like records that do not exist.
///
/// Store calls are single short SQLite statements that take the connection
/// lock only for their own duration, so they run inline on the calling task.
/// No store call is made while a generation request is awaited.
pub struct ReviewService {
    store: Store,
    llm: LlmClient,
}

impl ReviewService {
    /// Create a service over an opened store and a configured client.
    pub fn new(store: Store, llm: LlmClient) -> Self {
        Self { store, llm }
    }

    /// The generation client in use.
    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    /// Resolve the request principal to a user, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::InvalidInput`] for a blank email, or
    /// [`CodezenError::Database`] on storage failure.
    pub fn resolve_user(&self, email: &str) -> Result<User, CodezenError> {
        let email = required("email", email)?;
        self.store.find_or_create_user(email)
    }

    // --- Projects ---

    /// Create a project owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::InvalidInput`] for a blank name or language.
    pub fn create_project(
        &self,
        user: &User,
        name: &str,
        language: &str,
    ) -> Result<Project, CodezenError> {
        let name = required("name", name)?;
        let language = required("language", language)?;
        let project = self.store.insert_project(user, name, language)?;
        tracing::info!(project_id = project.id, user = %user.email, "project created");
        Ok(project)
    }

    /// Projects of `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on storage failure.
    pub fn list_projects(&self, user: &User) -> Result<Vec<Project>, CodezenError> {
        self.store.list_projects(user.id)
    }

    /// One project of `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] if it does not exist or is not owned by `user`.
    pub fn get_project(&self, user: &User, project_id: i64) -> Result<Project, CodezenError> {
        self.store
            .find_project(user.id, project_id)?
            .ok_or_else(|| CodezenError::not_found("Project"))
    }

    /// Delete a project with its guidelines, reviews, and comments.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] if it does not exist or is not owned by `user`.
    pub fn delete_project(&self, user: &User, project_id: i64) -> Result<(), CodezenError> {
        if !self.store.delete_project(user.id, project_id)? {
            return Err(CodezenError::not_found("Project"));
        }
        tracing::info!(project_id, user = %user.email, "project deleted");
        Ok(())
    }

    // --- Guidelines ---

    /// Add a guideline to a project.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] for an unknown project and
    /// [`CodezenError::InvalidInput`] for blank text.
    pub fn add_guideline(
        &self,
        user: &User,
        project_id: i64,
        rule_text: &str,
    ) -> Result<Guideline, CodezenError> {
        let project = self.get_project(user, project_id)?;
        let rule_text = required("ruleText", rule_text)?;
        self.store.insert_guideline(project.id, rule_text)
    }

    /// Guidelines of a project in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] for an unknown project.
    pub fn list_guidelines(
        &self,
        user: &User,
        project_id: i64,
    ) -> Result<Vec<Guideline>, CodezenError> {
        let project = self.get_project(user, project_id)?;
        self.store.list_guidelines(project.id)
    }

    /// Remove a guideline from a project.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] if either the project or the
    /// guideline is unknown.
    pub fn delete_guideline(
        &self,
        user: &User,
        project_id: i64,
        guideline_id: i64,
    ) -> Result<(), CodezenError> {
        let project = self.get_project(user, project_id)?;
        if !self.store.delete_guideline(project.id, guideline_id)? {
            return Err(CodezenError::not_found("Guideline"));
        }
        Ok(())
    }

    // --- Reviews ---

    /// Store a code snapshot, run it through the model, and record the
    /// response with its extracted effort.
    ///
    /// The snapshot is persisted before the model is called, so a review
    /// exists even while generation is in flight. Generation failures are
    /// recorded as fallback text rather than returned.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] for an unknown project,
    /// [`CodezenError::InvalidInput`] for blank code, or
    /// [`CodezenError::Database`] on storage failure.
    pub async fn create_review(
        &self,
        user: &User,
        project_id: i64,
        code: &str,
    ) -> Result<Review, CodezenError> {
        let project = self.get_project(user, project_id)?;
        required("code", code)?;

        let guidelines: Vec<String> = self
            .store
            .list_guidelines(project.id)?
            .into_iter()
            .map(|g| g.rule_text)
            .collect();

        let mut review = self.store.insert_review(project.id, user.id, code)?;
        tracing::info!(
            review_id = review.id,
            project_id = project.id,
            guidelines = guidelines.len(),
            "review submitted"
        );

        let outcome = review_code(&self.llm, code, &project.language, guidelines.as_slice()).await;

        self.store.update_review_response(
            review.id,
            &outcome.response,
            outcome.effort_estimation.as_deref(),
        )?;
        tracing::info!(
            review_id = review.id,
            effort = outcome.effort_estimation.as_deref().unwrap_or("-"),
            "review completed"
        );

        review.llm_response = Some(outcome.response);
        review.effort_estimation = outcome.effort_estimation;
        Ok(review)
    }

    /// Reviews of a project, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] for an unknown project.
    pub fn list_reviews(&self, user: &User, project_id: i64) -> Result<Vec<Review>, CodezenError> {
        let project = self.get_project(user, project_id)?;
        self.store.list_reviews(project.id)
    }

    /// One review of a project.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] if either the project or the review
    /// is unknown.
    pub fn get_review(
        &self,
        user: &User,
        project_id: i64,
        review_id: i64,
    ) -> Result<Review, CodezenError> {
        let project = self.get_project(user, project_id)?;
        self.store
            .find_review(project.id, review_id)?
            .ok_or_else(|| CodezenError::not_found("Review"))
    }

    // --- Comments ---

    /// Ask a follow-up question about a review and return the model's answer.
    ///
    /// The question is stored as a `USER` comment first, so the history
    /// handed to the model ends with it. The answer is stored as an `AI`
    /// comment.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] for an unknown project or review,
    /// [`CodezenError::InvalidInput`] for a blank message, or
    /// [`CodezenError::Database`] on storage failure.
    pub async fn post_comment(
        &self,
        user: &User,
        project_id: i64,
        review_id: i64,
        message: &str,
    ) -> Result<Comment, CodezenError> {
        let review = self.get_review(user, project_id, review_id)?;
        required("message", message)?;

        self.store
            .insert_comment(review.id, user.id, CommentRole::User, message)?;
        let history = self.store.list_comments(review.id)?;

        let prompt = prompt::build_chat_prompt(
            &review.code_snapshot,
            review.llm_response.as_deref().unwrap_or_default(),
            &history,
            message,
        );
        tracing::info!(review_id = review.id, history = history.len(), "follow-up question");
        let answer = self.llm.answer(&prompt).await;

        self.store
            .insert_comment(review.id, user.id, CommentRole::Ai, &answer)
    }

    /// The conversation on a review, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] for an unknown project or review.
    pub fn list_comments(
        &self,
        user: &User,
        project_id: i64,
        review_id: i64,
    ) -> Result<Vec<Comment>, CodezenError> {
        let review = self.get_review(user, project_id, review_id)?;
        self.store.list_comments(review.id)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, CodezenError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CodezenError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(trimmed)
}
