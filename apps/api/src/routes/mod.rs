pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resume_match",
            post(handlers::handle_resume_match),
        )
        .route(
            "/api/v1/candidates/:id/summarize_chat",
            post(handlers::handle_summarize_chat),
        )
        .route(
            "/api/v1/interviews/:id/bias_check",
            post(handlers::handle_bias_check),
        )
        .route("/api/v1/ai/probe", post(handlers::handle_probe))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::{LlmProvider, ModelGateway, ProviderError};
    use crate::pipeline::orchestrator::Pipeline;
    use crate::testing::{ScriptedProvider, Utf8Extractor};

    const BOUNDARY: &str = "kazehire-test-boundary";
    const MAX_UPLOAD: usize = 1024 * 1024;

    fn app(provider: Arc<ScriptedProvider>) -> Router {
        let gateway = ModelGateway::new(vec![provider as Arc<dyn LlmProvider>]);
        let state = AppState {
            pipeline: Arc::new(Pipeline::new(Arc::new(Utf8Extractor), gateway)),
        };
        build_router(state, MAX_UPLOAD)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Builds a multipart body from text fields and (file name, content) resume parts.
    fn multipart_request(fields: &[(&str, &str)], resumes: &[(&str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        for (file_name, content) in resumes {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/api/v1/resume_match")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(ScriptedProvider::new("p")))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_resume_match_returns_real_file_ids() {
        let reply = json!({
            "top_candidates": [{
                "candidate_id": "candidate_1",
                "candidate_name": "Alan Turing",
                "fit_score": 9,
                "strengths": ["Algorithms"],
                "concerns": ["No cloud experience"],
                "technical_skills": ["Rust"],
                "reasoning": "Strong fundamentals."
            }]
        });
        let provider = Arc::new(ScriptedProvider::new("primary").reply(&reply.to_string()));
        let request = multipart_request(
            &[("job_title", "Backend Engineer"), ("job_description", "Build Rust services.")],
            &[
                ("ada.pdf", "CORRUPT bytes"),
                ("alan.pdf", "Alan Turing\nalan@example.com\nEngineer with deep experience in algorithms and systems."),
            ],
        );

        let response = app(provider).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["top_candidates"][0]["candidate_id"], "file_2");
        assert_eq!(body["top_candidates"][0]["candidate_name"], "Alan Turing");
        assert_eq!(body["skipped_documents"][0]["source_id"], "file_1");
        assert_eq!(body["provider"], "primary");
    }

    #[tokio::test]
    async fn test_skipped_documents_report_kind_without_parser_detail() {
        let reply = json!({
            "top_candidates": [{
                "candidate_id": "candidate_1",
                "candidate_name": "Alan Turing",
                "fit_score": 7,
                "concerns": ["Short tenure"],
                "reasoning": "Solid."
            }]
        });
        let provider = Arc::new(ScriptedProvider::new("primary").reply(&reply.to_string()));
        let request = multipart_request(
            &[("job_description", "Build Rust services.")],
            &[
                ("broken.pdf", "CORRUPT %PDF-1.4 garbage"),
                ("alan.pdf", "Alan Turing\nalan@example.com\nEngineer with deep experience in algorithms and systems."),
            ],
        );

        let response = app(provider).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let skipped = &body["skipped_documents"][0];
        assert_eq!(skipped["file_name"], "broken.pdf");
        assert_eq!(skipped["kind"], "CORRUPT");
        assert!(skipped.get("detail").is_none());
        assert!(skipped.get("error").is_none());
        assert!(!body.to_string().contains("unreadable test document"));
    }

    #[tokio::test]
    async fn test_resume_match_requires_job_description() {
        let provider = Arc::new(ScriptedProvider::new("primary").reply("{}"));
        let request = multipart_request(&[("job_description", "   ")], &[("a.pdf", "text")]);

        let response = app(Arc::clone(&provider)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_resume_match_with_only_unreadable_files_is_422() {
        let provider = Arc::new(ScriptedProvider::new("primary").reply("{}"));
        let request = multipart_request(
            &[("job_description", "Build Rust services.")],
            &[("a.pdf", "CORRUPT"), ("b.pdf", "short")],
        );

        let response = app(provider).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"]["code"], "NO_USABLE_DOCUMENTS");
    }

    #[tokio::test]
    async fn test_summarize_chat() {
        let provider = Arc::new(ScriptedProvider::new("primary").reply(
            r#"{"start_date": null, "end_date": null, "min_salary": 100000, "max_salary": 120000,
                "interest_level": 5, "summary_text": "Very keen."}"#,
        ));

        let response = app(provider)
            .oneshot(json_request(
                "/api/v1/candidates/7/summarize_chat",
                json!({ "transcript": "Candidate: I'm looking for 100-120k and I'm very keen." }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["candidate_id"], "7");
        assert_eq!(body["interest_level"], 5);
        assert_eq!(body["start_date"], Value::Null);
    }

    #[tokio::test]
    async fn test_bias_check_blank_feedback_is_rejected() {
        let response = app(Arc::new(ScriptedProvider::new("primary").reply("{}")))
            .oneshot(json_request(
                "/api/v1/interviews/3/bias_check",
                json!({ "feedback": "" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bias_check_provider_auth_failure_is_502() {
        let provider = Arc::new(
            ScriptedProvider::new("primary").fail(ProviderError::Auth("invalid key".to_string())),
        );

        let response = app(provider)
            .oneshot(json_request(
                "/api/v1/interviews/3/bias_check",
                json!({ "feedback": "Seemed too old for a startup." }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "AI_PROVIDER_AUTH");
        assert!(!body["error"]["message"].as_str().unwrap().contains("invalid key"));
    }

    #[tokio::test]
    async fn test_bias_check_returns_flags() {
        let provider = Arc::new(ScriptedProvider::new("primary").reply(
            r#"{"flags": [{"term": "too old", "justification": "References age."}]}"#,
        ));

        let response = app(provider)
            .oneshot(json_request(
                "/api/v1/interviews/3/bias_check",
                json!({ "feedback": "Seemed too old for a startup." }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["interview_id"], "3");
        assert_eq!(body["flags"][0]["term"], "too old");
    }

    #[tokio::test]
    async fn test_probe_lists_providers() {
        let response = app(Arc::new(ScriptedProvider::new("primary").reply("{\"status\":\"ok\"}")))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/ai/probe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["providers"][0]["provider_id"], "primary");
        assert_eq!(body["providers"][0]["ok"], true);
        assert_eq!(body["providers"][0]["kind"], Value::Null);
    }

    #[tokio::test]
    async fn test_provider_check_hides_provider_error_text() {
        let provider = Arc::new(ScriptedProvider::new("primary").fail(ProviderError::Auth(
            "401 Unauthorized: Incorrect API key provided: sk-abc***xyz".to_string(),
        )));

        let response = app(provider)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/ai/probe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let entry = &body["providers"][0];
        assert_eq!(entry["ok"], false);
        assert_eq!(entry["kind"], "AUTH");
        assert!(entry.get("raw_text").is_none());
        assert!(!body.to_string().contains("sk-abc"));
        assert!(!body.to_string().contains("Incorrect API key"));
    }
}
