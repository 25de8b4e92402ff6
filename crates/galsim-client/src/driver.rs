use std::future::Future;
use std::time::Duration;

use galsim_core::{ClientResult, ThemeSelection, TransportError};

use crate::session::{ActiveSession, SessionClient};
use crate::transport::DialogueTransport;

/// Await a transport call, failing with [`TransportError::Timeout`] after `limit`.
pub async fn call_with_timeout<F, R>(limit: Duration, call: F) -> Result<R, TransportError>
where
    F: Future<Output = Result<R, TransportError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(outcome) => outcome,
        Err(_) => {
            log::warn!("Request timed out after {:?}", limit);
            Err(TransportError::Timeout(limit))
        }
    }
}

/// Runs each operation as begin -> bounded call -> complete.
///
/// Holding `&mut self` across the call means one driver never has two
/// requests outstanding.
pub struct SessionDriver<T> {
    transport: T,
    client: SessionClient,
    timeout: Duration,
}

impl<T: DialogueTransport> SessionDriver<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            client: SessionClient::new(),
            timeout,
        }
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn start(&mut self, selection: &ThemeSelection) -> ClientResult<&ActiveSession> {
        let request = self.client.begin_start(selection)?;
        let outcome = call_with_timeout(self.timeout, self.transport.start(&request)).await;
        self.client.complete_start(outcome)
    }

    pub async fn advance(&mut self, choice: &str) -> ClientResult<&ActiveSession> {
        let request = self.client.begin_turn(choice)?;
        let outcome = call_with_timeout(self.timeout, self.transport.advance(&request)).await;
        self.client.complete_turn(outcome)
    }

    /// Continue with the choice shown under `letter`.
    pub async fn choose(&mut self, letter: char) -> ClientResult<&ActiveSession> {
        let text = self.client.choose_letter(letter)?;
        self.advance(&text).await
    }

    pub fn abandon(&mut self) -> ClientResult<Option<ActiveSession>> {
        self.client.abandon()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Phase;
    use async_trait::async_trait;
    use galsim_core::{
        ClientError, DialogueRequest, DialogueResponse, StartRequest, StartResponse, StateError,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls; fails turns whose input is "fail" and hangs on "hang".
    #[derive(Default)]
    struct MockTransport {
        calls: AtomicUsize,
    }

    impl MockTransport {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DialogueTransport for MockTransport {
        async fn start(&self, request: &StartRequest) -> Result<StartResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let theme = request
                .custom_theme
                .clone()
                .unwrap_or_else(|| "Picked by the service".to_string());
            Ok(StartResponse {
                session_id: "mock-session".to_string(),
                theme,
                affection: 50,
                initial_dialogue: "Hello there.".to_string(),
                choices: vec!["Agree".into(), "".into(), "Disagree".into()],
            })
        }

        async fn advance(
            &self,
            request: &DialogueRequest,
        ) -> Result<DialogueResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.user_input.as_str() {
                "fail" => Err(TransportError::Status { status: 404 }),
                "hang" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
                said => Ok(DialogueResponse {
                    affection: 53,
                    character_response: format!("You said {}", said),
                    choices: vec!["fail".into(), "hang".into()],
                }),
            }
        }
    }

    fn driver() -> SessionDriver<MockTransport> {
        SessionDriver::new(MockTransport::default(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_blank_custom_theme_makes_no_call() {
        let mut driver = driver();
        let err = driver
            .start(&ThemeSelection::custom(" \t"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "ValidationError: empty custom theme");
        assert_eq!(driver.transport().calls(), 0);
        assert_eq!(driver.client().phase(), Phase::NoSession);
    }

    #[tokio::test]
    async fn test_continue_without_session_makes_no_call() {
        let mut driver = driver();
        let err = driver.advance("Agree").await.unwrap_err();
        assert_eq!(err, ClientError::State(StateError::NoActiveSession));
        assert_eq!(driver.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_start_and_choose_by_letter() {
        let mut driver = driver();
        let session = driver
            .start(&ThemeSelection::custom("Rainy bookshop"))
            .await
            .unwrap();
        assert_eq!(session.theme(), "Rainy bookshop");
        assert_eq!(session.history().len(), 1);

        let session = driver.choose('b').await.unwrap();
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history()[2].text, "You said Disagree");
        assert_eq!(session.affection(), 53);
        assert_eq!(driver.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_turn_surfaces_status() {
        let mut driver = driver();
        driver.start(&ThemeSelection::Auto).await.unwrap();
        driver.advance("Agree").await.unwrap();

        let err = driver.choose('A').await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 404");
        assert_eq!(driver.client().phase(), Phase::Active);
        let history = driver.client().session().unwrap().history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[3].text, "fail");
    }

    #[tokio::test]
    async fn test_hung_turn_times_out() {
        let mut driver = driver();
        driver.start(&ThemeSelection::Auto).await.unwrap();
        driver.advance("Agree").await.unwrap();

        let err = driver.advance("hang").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Transport(TransportError::Timeout(Duration::from_millis(50)))
        );
        assert_eq!(driver.client().phase(), Phase::Active);

        // the session is still usable afterwards
        tokio_test::assert_ok!(driver.advance("Agree").await);
    }
}
