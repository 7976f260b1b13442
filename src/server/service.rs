use super::request::parse_request;
use crate::gateway::Gateway;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;

/// `may_minihttp` service that hands every request to a [`Gateway`].
///
/// One clone is created per connection; clones share the gateway.
#[derive(Clone)]
pub struct AppService {
    pub gateway: Arc<Gateway>,
}

impl AppService {
    #[must_use]
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let raw = parse_request(req);
        self.gateway.dispatch(raw, res);
        Ok(())
    }
}
