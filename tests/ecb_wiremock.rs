mod support;

use std::time::Duration;

use anyhow::Result;
use ecbrates::source::{EcbRateSource, FetchError, RateSource, RetryPolicy};
use support::{code, date, sdmx_body};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        max_elapsed: Duration::from_secs(5),
        multiplier: 2.0,
    }
}

#[tokio::test]
async fn ecb_request_uses_series_key_and_period() -> Result<()> {
    let server = MockServer::start().await;
    let body = sdmx_body(&[(date(2024, 1, 12), 1.0942), (date(2024, 1, 15), 1.0945)]);

    Mock::given(method("GET"))
        .and(path("/D.USD.EUR.SP00.A"))
        .and(query_param("startPeriod", "2024-01-12"))
        .and(query_param("endPeriod", "2024-01-15"))
        .and(query_param("detail", "dataonly"))
        .and(query_param("includeHistory", "false"))
        .and(query_param("format", "jsondata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let source = EcbRateSource::new()
        .with_base_url(server.uri())
        .with_retry_policy(RetryPolicy::none());
    let rates = source
        .fetch_rates(&code("usd"), date(2024, 1, 12), date(2024, 1, 15))
        .await?;

    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0].base_currency().as_str(), "EUR");
    assert_eq!(rates[0].target_currency().as_str(), "USD");
    assert_eq!(rates[1].date(), date(2024, 1, 15));
    assert!((rates[1].exchange_rate() - 1.0945).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn ecb_server_errors_are_retried() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/D.GBP.EUR.SP00.A"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/D.GBP.EUR.SP00.A"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(sdmx_body(&[(date(2024, 1, 2), 0.8671)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = EcbRateSource::new()
        .with_base_url(server.uri())
        .with_retry_policy(fast_retry(5));
    let rates = source
        .fetch_rates(&code("GBP"), date(2024, 1, 2), date(2024, 1, 2))
        .await?;

    assert_eq!(rates.len(), 1);
    assert!((rates[0].exchange_rate() - 0.8671).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn ecb_throttling_exhausts_retries() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let source = EcbRateSource::new()
        .with_base_url(server.uri())
        .with_retry_policy(fast_retry(3));
    let err = source
        .fetch_rates(&code("JPY"), date(2024, 1, 2), date(2024, 1, 3))
        .await
        .unwrap_err();

    match err {
        FetchError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FetchError::BadStatus { status: 429, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    Ok(())
}

#[tokio::test]
async fn ecb_client_errors_fail_without_retry() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    let source = EcbRateSource::new()
        .with_base_url(server.uri())
        .with_retry_policy(fast_retry(5));
    let err = source
        .fetch_rates(&code("XAU"), date(2024, 1, 2), date(2024, 1, 3))
        .await
        .unwrap_err();

    match err {
        FetchError::BadStatus { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "Invalid key");
        }
        other => panic!("unexpected error: {other}"),
    }

    Ok(())
}

#[tokio::test]
async fn ecb_not_found_means_no_observations() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No results found."))
        .expect(1)
        .mount(&server)
        .await;

    let source = EcbRateSource::new().with_base_url(server.uri());
    let rates = source
        .fetch_rates(&code("USD"), date(2024, 1, 6), date(2024, 1, 7))
        .await?;
    assert!(rates.is_empty());

    Ok(())
}

#[tokio::test]
async fn ecb_malformed_body_is_a_parse_error() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let source = EcbRateSource::new()
        .with_base_url(server.uri())
        .with_retry_policy(fast_retry(3));
    let err = source
        .fetch_rates(&code("USD"), date(2024, 1, 2), date(2024, 1, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));

    Ok(())
}
