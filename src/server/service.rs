use super::request::parse_request;
use super::response::write_handler_response;
use crate::dispatcher::{Dispatcher, Envelope, HandlerResponse};
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// `may_minihttp` service exposing one [`Dispatcher`].
///
/// Cloned once per connection; clones share the dispatcher.
pub struct AppService<S> {
    dispatcher: Arc<Dispatcher<S>>,
}

impl<S> Clone for AppService<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<S: Send + Sync + 'static> AppService<S> {
    #[must_use]
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }
}

impl<S: Send + Sync + 'static> HttpService for AppService<S> {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let response = match parse_request(req) {
            Ok(request) => self.dispatcher.dispatch(&request),
            Err(e) => {
                warn!(error = %e, "Rejecting unreadable request");
                HandlerResponse::envelope(400, &Envelope::failure(e.to_string()))
            }
        };
        write_handler_response(res, response);
        Ok(())
    }
}
