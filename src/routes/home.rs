//! The question form served at `/`.

use crate::errors::AppError;
use crate::services::AppState;
use axum::extract::State;
use axum::response::Html;
use axum::Form;
use serde::Deserialize;
use tracing::instrument;

#[derive(Deserialize)]
pub struct QuestionForm {
    question: String,
}

/// GET `/` renders the empty form.
pub async fn show_page() -> Html<String> {
    Html(render_page(""))
}

/// POST `/` answers the submitted question and re-renders the form.
#[instrument(skip(state, form))]
pub async fn submit_question(
    State(state): State<AppState>,
    Form(form): Form<QuestionForm>,
) -> Result<Html<String>, AppError> {
    let answer = state.answer_service.answer(&form.question).await?;
    Ok(Html(render_page(&answer)))
}

fn render_page(answer: &str) -> String {
    let answer_block = if answer.is_empty() {
        String::new()
    } else {
        format!(
            "    <h2>Answer</h2>\n    <p>{}</p>\n",
            html_escape::encode_text(answer)
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>McCall v. Microsoft Q&amp;A</title>
</head>
<body>
    <h1>Ask about McCall v. Microsoft</h1>
    <form method="post" action="/">
        <label for="question">Question</label>
        <input type="text" id="question" name="question" size="80">
        <button type="submit">Ask</button>
    </form>
{}</body>
</html>
"#,
        answer_block
    )
}
