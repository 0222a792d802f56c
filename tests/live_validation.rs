use std::{env, sync::Once};

use docsum::{config, processing::SummaryService};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        set_default_env("SUMMARIZATION_PROVIDER", "ollama");
        set_default_env("SUMMARIZATION_MODELS", "default=llama3.2");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        set_default_env("CHUNKING_UNIT", "words");
        set_default_env("CHUNK_SIZE", "200");
        config::init_config();
    });
}

#[tokio::test]
#[ignore = "Requires live Ollama summarization model"]
async fn live_ollama_summary_roundtrip() {
    init_config_once();
    let service =
        SummaryService::from_config(config::get_config()).expect("service from live config");
    let text = "Rust is a systems programming language focused on safety and performance. \
                It prevents data races at compile time through ownership and borrowing. "
        .repeat(30);

    let outcome = service
        .summarize(&text, None)
        .await
        .expect("failed to summarize with live provider");
    assert!(outcome.chunk_count > 1, "expected multiple chunks: {outcome:?}");
    assert!(!outcome.summary.trim().is_empty(), "summary must not be empty");
    assert_eq!(service.metrics_snapshot().documents_summarized, 1);
}

#[tokio::test]
#[ignore = "Requires live Ollama summarization model"]
async fn live_unknown_selector_is_rejected_without_provider_call() {
    init_config_once();
    let service =
        SummaryService::from_config(config::get_config()).expect("service from live config");
    let error = service
        .summarize("Some text worth summarizing.", Some("not-configured"))
        .await
        .unwrap_err();
    assert!(error.to_string().contains("not-configured"));
}
