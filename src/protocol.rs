//! Behaviour shared by every protocol session

use crate::config::User;
use crate::error::Result;
use crate::location::Location;

/// A session against one of the server's mail protocols.
#[allow(async_fn_in_trait)]
pub trait Protocol {
    /// Short protocol name used as the log prefix (`IMAP`, `SMTP`).
    fn name(&self) -> &'static str;

    async fn authenticate(&mut self, user: &User) -> Result<&mut Self>;

    async fn disconnect(&mut self) -> Result<&mut Self>;

    fn is_connected(&self) -> bool;

    fn location(&self) -> &Location;

    /// The current folder and last touched resource.
    fn current_location_paths(&self) -> [&str; 2] {
        self.location().paths()
    }
}
