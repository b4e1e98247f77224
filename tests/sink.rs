//! Summarization sink tests: placeholder recovery and retries.

use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use vidsum::{
    RetryPolicy, RetryingSink, SummarySink, VideoReport, VidsumError, build_report,
    sink::summarize_or_placeholder,
};

fn empty_report() -> VideoReport {
    build_report("empty.mp4", Vec::new(), Vec::new())
}

/// Fails the first `failures` calls, then succeeds.
struct FlakySink {
    failures: u32,
    calls: AtomicU32,
}

impl FlakySink {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SummarySink for FlakySink {
    fn summarize(&self, report: &VideoReport) -> Result<String, VidsumError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(VidsumError::SinkFailure(format!("attempt {call} failed")))
        } else {
            Ok(format!("summary of {}", report.filename))
        }
    }
}

#[test]
fn successful_sink_text_is_returned() {
    let sink = |report: &VideoReport| -> Result<String, VidsumError> {
        Ok(format!("{} frames", report.frames_processed))
    };
    assert_eq!(summarize_or_placeholder(&sink, &empty_report()), "0 frames");
}

#[test]
fn sink_failure_becomes_placeholder() {
    let sink = |_: &VideoReport| -> Result<String, VidsumError> {
        Err(VidsumError::SinkFailure("network unreachable".to_string()))
    };
    assert_eq!(
        summarize_or_placeholder(&sink, &empty_report()),
        "Summary generation failed: network unreachable"
    );
}

#[test]
fn other_errors_are_wrapped_in_placeholder() {
    let sink = |_: &VideoReport| -> Result<String, VidsumError> { Err(VidsumError::Cancelled) };
    assert_eq!(
        summarize_or_placeholder(&sink, &empty_report()),
        "Summary generation failed: Operation cancelled"
    );
}

#[test]
fn panicking_sink_becomes_placeholder() {
    let sink = |_: &VideoReport| -> Result<String, VidsumError> { panic!("sink exploded") };
    let text = summarize_or_placeholder(&sink, &empty_report());
    assert!(text.starts_with("Summary generation failed:"), "{text}");
}

#[test]
fn retrying_sink_recovers_from_transient_failures() {
    let sink = RetryingSink::new(FlakySink::new(2), RetryPolicy::new(3, Duration::ZERO));
    let text = sink.summarize(&empty_report()).unwrap();
    assert_eq!(text, "summary of empty.mp4");
    assert_eq!(sink.inner().calls(), 3);
}

#[test]
fn retrying_sink_gives_up_after_max_attempts() {
    let sink = RetryingSink::new(FlakySink::new(10), RetryPolicy::new(3, Duration::ZERO));
    match sink.summarize(&empty_report()) {
        Err(VidsumError::SinkFailure(message)) => assert_eq!(message, "attempt 3 failed"),
        other => panic!("Expected SinkFailure, got: {other:?}"),
    }
    assert_eq!(sink.inner().calls(), 3);
}

#[test]
fn no_retry_policy_calls_once() {
    let sink = RetryingSink::new(FlakySink::new(1), RetryPolicy::none());
    assert!(sink.summarize(&empty_report()).is_err());
    assert_eq!(sink.inner().calls(), 1);
}

#[test]
fn rejected_request_is_not_retried() {
    let calls = AtomicU32::new(0);
    let rejecting = |_: &VideoReport| -> Result<String, VidsumError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(VidsumError::SinkRejected("403 Forbidden".to_string()))
    };
    let sink = RetryingSink::new(rejecting, RetryPolicy::new(5, Duration::from_secs(30)));

    let error = sink.summarize(&empty_report()).unwrap_err();
    assert!(matches!(error, VidsumError::SinkRejected(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        summarize_or_placeholder(&sink, &empty_report()),
        "Summary generation failed: 403 Forbidden"
    );
}

#[test]
fn retryable_classification() {
    assert!(VidsumError::SinkFailure("timeout".to_string()).is_retryable());
    assert!(!VidsumError::SinkRejected("400".to_string()).is_retryable());
}

#[test]
fn backoff_doubles_and_is_capped() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
    assert_eq!(policy.backoff_for(2), Duration::from_millis(1000));
    assert_eq!(policy.backoff_for(3), Duration::from_millis(2000));
    assert_eq!(policy.backoff_for(20), policy.max_backoff);
}

#[test]
fn policy_requires_one_attempt() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
}

#[cfg(feature = "gemini")]
mod gemini {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering},
        },
        thread,
        time::Duration,
    };

    use vidsum::{
        GeminiConfig, GeminiSink, PromptStyle, RetryPolicy, SummarySink, VidsumError,
        build_report,
    };

    /// Serve every request on a local port with the given status line and
    /// JSON body. Returns the base URL and a request counter.
    fn canned_server(status: &'static str, body: &'static str) -> (String, Arc<AtomicU32>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
        let address = listener.local_addr().expect("local address");
        let requests = Arc::new(AtomicU32::new(0));
        let counter = requests.clone();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);

                // Read headers, then the declared body.
                let mut received = Vec::new();
                let mut buffer = [0u8; 4096];
                let header_end = loop {
                    let Ok(read) = stream.read(&mut buffer) else { break None };
                    if read == 0 {
                        break None;
                    }
                    received.extend_from_slice(&buffer[..read]);
                    if let Some(end) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                        break Some(end + 4);
                    }
                };
                if let Some(header_end) = header_end {
                    let headers = String::from_utf8_lossy(&received[..header_end]).to_lowercase();
                    let length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    while received.len() < header_end + length {
                        match stream.read(&mut buffer) {
                            Ok(0) | Err(_) => break,
                            Ok(read) => received.extend_from_slice(&buffer[..read]),
                        }
                    }
                }

                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (format!("http://{address}"), requests)
    }

    fn local_sink(base_url: &str, attempts: u32) -> vidsum::RetryingSink<GeminiSink> {
        let config = GeminiConfig::new("k")
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::new(attempts, Duration::ZERO));
        GeminiSink::new(config).unwrap().with_retries()
    }

    #[test]
    fn config_defaults_and_builders() {
        let config = GeminiConfig::new("secret-key")
            .with_model("gemini-1.5-pro")
            .with_base_url("http://localhost:9/v1beta/")
            .with_prompt_style(PromptStyle::Notes)
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::none());

        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.base_url, "http://localhost:9/v1beta");
        assert_eq!(config.prompt_style, PromptStyle::Notes);
        assert_eq!(config.retry.max_attempts, 1);

        let defaults = GeminiConfig::new("k");
        assert_eq!(defaults.model, GeminiConfig::DEFAULT_MODEL);
        assert_eq!(defaults.prompt_style, PromptStyle::Summary);
    }

    #[test]
    fn debug_hides_api_key() {
        let debug = format!("{:?}", GeminiConfig::new("super-secret"));
        assert!(debug.contains("GeminiConfig"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn unreachable_service_is_sink_failure() {
        // Port 9 (discard) is not an HTTP server on any sane test host.
        let config = GeminiConfig::new("k")
            .with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2));
        let sink = GeminiSink::new(config).unwrap();
        let report = build_report("offline.mp4", Vec::new(), Vec::new());

        let error = sink.summarize(&report).unwrap_err();
        assert!(error.to_string().starts_with("Summary generation failed:"));
    }

    #[test]
    fn successful_response_text_is_returned() {
        let (base_url, requests) = canned_server(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Three scenes about borrowing."}]}}]}"#,
        );
        let report = build_report("talk.mp4", Vec::new(), Vec::new());

        let text = local_sink(&base_url, 3).summarize(&report).unwrap();
        assert_eq!(text, "Three scenes about borrowing.");
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn client_error_is_rejected_without_retry() {
        let (base_url, requests) = canned_server(
            "403 Forbidden",
            r#"{"error":{"message":"API key not valid"}}"#,
        );
        let report = build_report("talk.mp4", Vec::new(), Vec::new());

        let error = local_sink(&base_url, 3).summarize(&report).unwrap_err();
        match error {
            VidsumError::SinkRejected(message) => {
                assert!(message.contains("403"), "{message}");
                assert!(message.contains("API key not valid"), "{message}");
            }
            other => panic!("Expected SinkRejected, got: {other:?}"),
        }
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rate_limit_and_server_errors_are_retried() {
        for status in ["429 Too Many Requests", "503 Service Unavailable"] {
            let (base_url, requests) = canned_server(status, r#"{"error":{}}"#);
            let report = build_report("talk.mp4", Vec::new(), Vec::new());

            let error = local_sink(&base_url, 3).summarize(&report).unwrap_err();
            assert!(matches!(error, VidsumError::SinkFailure(_)), "{status}: {error:?}");
            assert_eq!(requests.load(Ordering::SeqCst), 3, "{status}");
        }
    }
}
