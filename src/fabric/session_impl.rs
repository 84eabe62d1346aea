use super::*;
use crate::core::ErrorKind;
use crate::version::SessionTicket;
use std::future::Future;
use tracing::{Instrument, info_span};

/// Value produced inside a session bracket, plus the outcome of closing it.
#[derive(Debug)]
pub struct Released<T> {
    pub value: T,
    /// Set when the body succeeded but the session could not be closed.
    pub release_error: Option<FabricError>,
}

impl<T> Released<T> {
    pub fn is_clean(&self) -> bool {
        self.release_error.is_none()
    }

    /// Turns a failed release into an error, discarding the value.
    pub fn into_strict(self) -> Result<T> {
        match self.release_error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

impl FabricClient {
    /// Runs `body` inside an edit session on the client's version.
    ///
    /// The session is closed exactly once after `body` settles, whether it
    /// returned a value or an error. If the session cannot be opened, `body`
    /// is not run and no close is attempted.
    ///
    /// A close failure after a successful body does not undo the edit: the value
    /// is returned with `release_error` set. A close failure after a failed body
    /// is reported as `SessionNotReleased` carrying both errors.
    pub async fn with_session<F, Fut, T>(&self, body: F) -> Result<Released<T>>
    where
        F: FnOnce(SessionTicket) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mode = self.config.session_mode;
        let version_name = self.context.version_name();
        let span = info_span!(
            "fabric.session.bracket",
            version = %version_name,
            mode = mode.start_action()
        );

        async move {
            let session_id = self
                .context
                .start_session(mode)
                .await
                .map_err(|err| session_error(err, FabricError::SessionStart))?;
            event!(Level::DEBUG, session_id = %session_id, "edit session opened");

            let ticket = SessionTicket {
                session_id,
                version_name: version_name.clone(),
            };
            let outcome = body(ticket).await;

            let release = self
                .context
                .stop_session(mode)
                .await
                .map_err(|err| session_error(err, FabricError::SessionStop));

            match (outcome, release) {
                (Ok(value), Ok(())) => {
                    event!(Level::DEBUG, "edit session closed");
                    Ok(Released {
                        value,
                        release_error: None,
                    })
                }
                (Ok(value), Err(release_err)) => {
                    event!(Level::WARN, error = %release_err, "edit committed but session not closed");
                    self.notify(Notice::SessionLeaked {
                        version: version_name,
                        message: release_err.to_string(),
                    });
                    Ok(Released {
                        value,
                        release_error: Some(release_err),
                    })
                }
                (Err(err), Ok(())) => {
                    event!(Level::DEBUG, error = %err, "edit session closed after failure");
                    Err(err)
                }
                (Err(err), Err(release_err)) => {
                    event!(
                        Level::ERROR,
                        error = %err,
                        release_error = %release_err,
                        "edit failed and session not closed"
                    );
                    self.notify(Notice::SessionLeaked {
                        version: version_name,
                        message: release_err.to_string(),
                    });
                    Err(FabricError::SessionNotReleased {
                        error: Box::new(err),
                        release: Box::new(release_err),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Version context failures surface as session errors whatever their origin.
fn session_error(err: FabricError, wrap: fn(String) -> FabricError) -> FabricError {
    if err.kind() == ErrorKind::Session {
        err
    } else {
        wrap(err.to_string())
    }
}
