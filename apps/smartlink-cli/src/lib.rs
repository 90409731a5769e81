//! Library half of the `smartlink` operator CLI.

pub mod api_client;
pub mod plan;

use api_client::ApiClient;
use domain::redirect::{RedirectState, ShortCodeResolver, ShortCodeTarget};

/// Follow a short code the way a visitor's browser would: one lookup, then
/// either the canonical route or a terminal error.
pub async fn follow_short_code(api: &ApiClient, code: Option<&str>) -> RedirectState {
    let mut resolver = ShortCodeResolver::from_route(code);
    if let Some(ticket) = resolver.take_lookup() {
        let outcome = api
            .lookup_short_code(ticket.code())
            .await
            .map(|found| found.as_ref().and_then(ShortCodeTarget::from_lookup));
        resolver.complete(ticket, outcome);
    }
    resolver.state().clone()
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays
/// machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::RedirectError;
    use std::time::Duration;

    fn api(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn found_code_navigates_to_canonical_route() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/short/a1B2")
            .with_status(200)
            .with_body(
                r#"{"success":true,"data":{"smartLink":{"_id":"1","shortId":"a1B2","slug":"night-song","trackTitle":"Night Song","platformLinks":[],"template":"standard","isPublished":true},"artist":{"name":"The Band","slug":"the-band"}}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let state = follow_short_code(&api(&server), Some("a1B2")).await;
        mock.assert_async().await;
        assert_eq!(
            state,
            RedirectState::Navigate("/smartlinks/the-band/night-song".into())
        );
    }

    #[tokio::test]
    async fn unknown_and_failing_lookups_are_terminal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/short/gone")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/api/short/boom")
            .with_status(500)
            .create_async()
            .await;

        let api = api(&server);
        assert_eq!(
            follow_short_code(&api, Some("gone")).await,
            RedirectState::Failed(RedirectError::NotFound)
        );
        match follow_short_code(&api, Some("boom")).await {
            RedirectState::Failed(err @ RedirectError::Lookup(_)) => {
                assert_eq!(err.user_message(), RedirectError::NotFound.user_message());
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_code_never_calls_backend() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let state = follow_short_code(&api(&server), Some("  ")).await;
        mock.assert_async().await;
        assert_eq!(state, RedirectState::Failed(RedirectError::MissingCode));
    }
}
